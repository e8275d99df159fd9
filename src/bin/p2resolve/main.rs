//! p2resolve CLI - resolve installable units against p2 repositories

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use p2resolver::sources::index::INDEX_FILE;
use p2resolver::sources::NavigatorError;
use p2resolver::util::diagnostic::RepositoryNotFoundReport;
use p2resolver::util::shell::ColorChoice;
use p2resolver::util::{GlobalContext, Shell};

/// Flags shared by every command.
pub struct GlobalOptions {
    pub shell: Arc<Shell>,
    pub ctx: GlobalContext,
    pub offline: bool,
    pub no_cache_fallback: bool,
}

fn main() {
    if let Err(e) = run() {
        report(&e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("p2resolver=debug")
    } else {
        EnvFilter::new("p2resolver=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let color = if cli.no_color { ColorChoice::Never } else { cli.color };
    let json = match &cli.command {
        Commands::Resolve(args) => args.json,
        Commands::Repos(args) => args.json,
        _ => false,
    };
    let shell = Arc::new(Shell::from_flags(cli.verbose, color, json));

    let mut ctx = GlobalContext::new()?;
    if let Some(home) = cli.home.clone() {
        ctx = ctx.with_home(home);
    }
    ctx.set_verbose(cli.verbose);
    ctx.set_color(shell.use_color());

    let global_opts = GlobalOptions {
        shell,
        ctx,
        offline: cli.offline,
        no_cache_fallback: cli.no_cache_fallback,
    };

    // Execute command
    match cli.command {
        Commands::Resolve(args) => commands::resolve::execute(args, &global_opts),
        Commands::Repos(args) => commands::repos::execute(args, &global_opts),
        Commands::Explain(args) => commands::explain::execute(args, &global_opts),
        Commands::Cache(args) => commands::cache::execute(args, &global_opts),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

/// Print a top-level error. Missing repositories get a rendered report.
fn report(e: &anyhow::Error) {
    let missing = e
        .chain()
        .filter_map(|cause| cause.downcast_ref::<NavigatorError>())
        .find_map(|nav| match nav.root_cause() {
            NavigatorError::RepositoryNotFound { url, concern, tried } => Some(RepositoryNotFoundReport {
                url: url.to_string(),
                tried: Some(format!(
                    "no {} descriptor among {}; check the URL or the repository's {}",
                    concern,
                    tried.join(", "),
                    INDEX_FILE
                )),
            }),
            _ => None,
        });

    match missing {
        Some(report) => eprintln!("{:?}", miette::Report::new(report)),
        None => eprintln!("error: {:#}", e),
    }
}
