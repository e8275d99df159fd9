//! `p2resolve repos` command

use anyhow::Result;

use crate::cli::ReposArgs;
use crate::commands::open_cache;
use crate::GlobalOptions;
use p2resolver::ops::repos::{format_tree, repository_trees, trees_to_json};

pub fn execute(args: ReposArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let config = global_opts.ctx.load_config();
    let cache = open_cache(global_opts, &config)?;

    let trees = repository_trees(&cache, &args.url)?;

    if shell.is_json() {
        shell.json(&trees_to_json(&trees))?;
        return Ok(());
    }

    shell.println(&args.url);
    for tree in &trees {
        shell.println(format_tree(tree).trim_end());
    }

    if trees.iter().all(|tree| tree.nodes.is_empty()) {
        shell.warn(format!("{} does not look like a p2 repository", args.url));
    }

    Ok(())
}
