//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell as CompletionShell;
use url::Url;

use p2resolver::resolver::{ResolveMode, SeedSpec};
use p2resolver::sources::Concern;
use p2resolver::util::shell::ColorChoice;

/// p2resolve - resolve installable units against p2 repositories
#[derive(Parser)]
#[command(name = "p2resolve")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// When to use colors (auto, always, never)
    #[arg(long, global = true, default_value = "auto", value_name = "WHEN")]
    pub color: ColorChoice,

    /// Serve only what is already cached
    #[arg(long, global = true)]
    pub offline: bool,

    /// Fail instead of serving a stale cached descriptor when revalidation fails
    #[arg(long, global = true)]
    pub no_cache_fallback: bool,

    /// Directory holding the cache and the global config
    #[arg(long, global = true, env = "P2RESOLVE_HOME", value_name = "DIR")]
    pub home: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve seed units into downloadable artifacts
    Resolve(ResolveArgs),

    /// Show the composite tree behind a repository URL
    Repos(ReposArgs),

    /// Explain why a unit is part of a resolution
    Explain(ExplainArgs),

    /// Manage the descriptor cache
    Cache(CacheArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Repositories, seeds and resolution settings shared by `resolve` and `explain`.
#[derive(Args)]
pub struct ResolutionArgs {
    /// Repository URL to resolve against (repeatable, searched in order)
    #[arg(long = "repo", short = 'r', value_name = "URL", required = true)]
    pub repos: Vec<Url>,

    /// Seed units, as `id` or `id/range`
    #[arg(required = true, value_name = "SEED")]
    pub seeds: Vec<SeedSpec>,

    /// Resolution mode (slicer, planner); defaults to the configured mode
    #[arg(long, value_name = "MODE")]
    pub mode: Option<ResolveMode>,

    /// Filter environment entry, e.g. `osgi.os=linux` (repeatable)
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Do not read feature jars to expand their plugins
    #[arg(long)]
    pub no_features: bool,
}

#[derive(Args)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub resolution: ResolutionArgs,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ReposArgs {
    /// Repository root URL
    pub url: Url,

    /// Print the trees as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ExplainArgs {
    #[command(flatten)]
    pub resolution: ResolutionArgs,

    /// Unit to explain
    #[arg(long, value_name = "ID")]
    pub unit: String,
}

#[derive(Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommands,
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Print the cache directory
    Path,

    /// Delete the cache directory
    Clean,

    /// Forget the remembered layout of a repository
    Forget(ForgetArgs),
}

#[derive(Args)]
pub struct ForgetArgs {
    /// Repository URL
    pub url: Url,

    /// Only forget one concern (metadata, artifacts)
    #[arg(long, value_name = "CONCERN")]
    pub concern: Option<Concern>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: CompletionShell,
}

fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.trim().to_string())),
        _ => Err(format!("invalid environment entry '{}'; expected KEY=VALUE", s)),
    }
}
