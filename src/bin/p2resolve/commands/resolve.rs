//! `p2resolve resolve` command

use anyhow::Result;

use crate::cli::ResolveArgs;
use crate::commands::{preload, registry, resolve_options};
use crate::GlobalOptions;
use p2resolver::ops::resolve::resolve;
use p2resolver::resolver::{ResolveError, ResolveMode};
use p2resolver::util::diagnostic::emit;
use p2resolver::util::shell::Status;

pub fn execute(args: ResolveArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let config = global_opts.ctx.load_config();
    let opts = resolve_options(args.resolution, &config)?;
    let registry = registry(global_opts, &config)?;

    preload(&registry, &opts.repositories, global_opts)?;

    shell.status(
        Status::Resolving,
        format!("{} seed(s) in {} mode", opts.seeds.len(), opts.mode),
    );

    let resolution = match resolve(&registry, &opts) {
        Ok(resolution) => resolution,
        Err(e) => match e.downcast_ref::<ResolveError>() {
            Some(failure) => {
                shell.status(Status::Failed, "resolution");
                emit(&failure.to_diagnostic(), shell.use_color());
                std::process::exit(1);
            }
            None => return Err(e),
        },
    };
    let artifacts = resolution.artifacts();

    if shell.is_json() {
        shell.json(&serde_json::to_value(artifacts.to_report())?)?;
        return Ok(());
    }

    for location in artifacts.iter() {
        shell.println(format!(
            "{} {} {} {}",
            location.classifier(),
            location.id(),
            location.version(),
            location.location
        ));
    }

    shell.status(
        Status::Resolved,
        format!(
            "{} bundles, {} features",
            artifacts.bundles().len(),
            artifacts.features().len()
        ),
    );

    if opts.mode == ResolveMode::Slicer {
        for failure in artifacts.unresolved() {
            let kind = if failure.optional { "optional requirement" } else { "requirement" };
            shell.warn(format!("unresolved {} {}", kind, failure));
        }
    }

    Ok(())
}
