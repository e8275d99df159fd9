//! `p2resolve explain` command

use anyhow::{bail, Result};

use crate::cli::ExplainArgs;
use crate::commands::{preload, registry, resolve_options};
use crate::GlobalOptions;
use p2resolver::ops::explain::{explain, format_chain};

pub fn execute(args: ExplainArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let config = global_opts.ctx.load_config();
    let opts = resolve_options(args.resolution, &config)?;
    let registry = registry(global_opts, &config)?;

    preload(&registry, &opts.repositories, global_opts)?;

    let explanation = explain(&registry, &opts, &args.unit)?;
    let Some(chain) = explanation.chain else {
        bail!(
            "unit `{}` is not part of the resolution\n\
             help: run `p2resolve resolve` with the same seeds to see what is",
            args.unit
        );
    };

    shell.println(format_chain(&chain).trim_end());

    let parent = chain.len().checked_sub(2).map(|i| chain[i].unit.to_string());
    let others: Vec<_> = explanation
        .dependents
        .iter()
        .filter(|d| Some(*d) != parent.as_ref())
        .collect();
    if !others.is_empty() {
        shell.println("");
        shell.println("Also required by:");
        for dependent in others {
            shell.println(format!("  → {}", dependent));
        }
    }

    Ok(())
}
