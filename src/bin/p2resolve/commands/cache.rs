//! `p2resolve cache` command
//!
//! Inspect and maintain the descriptor cache.

use anyhow::Result;

use crate::cli::{CacheArgs, CacheCommands, ForgetArgs};
use crate::commands::open_cache;
use crate::GlobalOptions;
use p2resolver::ops::cache::{clean, forget};
use p2resolver::sources::Concern;
use p2resolver::util::fs::format_size;
use p2resolver::util::shell::Status;

pub fn execute(args: CacheArgs, global_opts: &GlobalOptions) -> Result<()> {
    match args.command {
        CacheCommands::Path => show_path(global_opts),
        CacheCommands::Clean => clean_cache(global_opts),
        CacheCommands::Forget(forget_args) => forget_url(forget_args, global_opts),
    }
}

fn show_path(global_opts: &GlobalOptions) -> Result<()> {
    let config = global_opts.ctx.load_config();
    global_opts
        .shell
        .println(global_opts.ctx.resolve_cache_dir(&config).display());
    Ok(())
}

fn clean_cache(global_opts: &GlobalOptions) -> Result<()> {
    let config = global_opts.ctx.load_config();
    let root = global_opts.ctx.resolve_cache_dir(&config);

    let summary = clean(&root)?;
    global_opts.shell.status(
        Status::Removed,
        format!(
            "{} ({} files, {})",
            root.display(),
            summary.files,
            format_size(summary.bytes)
        ),
    );
    Ok(())
}

fn forget_url(args: ForgetArgs, global_opts: &GlobalOptions) -> Result<()> {
    let config = global_opts.ctx.load_config();
    let cache = open_cache(global_opts, &config)?;

    let concerns: Vec<Concern> = match args.concern {
        Some(concern) => vec![concern],
        None => Concern::ALL.to_vec(),
    };
    forget(&cache, &args.url, &concerns)?;

    let names: Vec<_> = concerns.iter().map(|c| c.as_str()).collect();
    global_opts
        .shell
        .status(Status::Forgot, format!("{} layout of {}", names.join(" and "), args.url));
    Ok(())
}
