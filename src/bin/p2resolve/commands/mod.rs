//! Command implementations

pub mod cache;
pub mod completions;
pub mod explain;
pub mod repos;
pub mod resolve;

use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::{Context, Result};
use rayon::prelude::*;
use url::Url;

use crate::cli::ResolutionArgs;
use crate::GlobalOptions;
use p2resolver::ops::{RepositoryRegistry, ResolveOptions};
use p2resolver::resolver::ResolveMode;
use p2resolver::sources::{CacheConfig, DescriptorCache};
use p2resolver::util::shell::Status;
use p2resolver::util::Config;

/// Open the descriptor cache with config values overridden by flags.
pub fn open_cache(global_opts: &GlobalOptions, config: &Config) -> Result<DescriptorCache> {
    let ctx = &global_opts.ctx;
    let mut cache_config = CacheConfig::new(ctx.resolve_cache_dir(config));
    cache_config.allow_stale_on_error = config.cache.allow_stale_on_error() && !global_opts.no_cache_fallback;

    let mut net = config.net.clone();
    net.offline |= global_opts.offline;

    tracing::debug!("cache directory: {}", cache_config.root_dir.display());
    DescriptorCache::new(cache_config, &net).context("failed to set up the descriptor cache")
}

/// Turn resolution flags into options, falling back to the configured defaults.
pub fn resolve_options(args: ResolutionArgs, config: &Config) -> Result<ResolveOptions> {
    let mode = match (args.mode, config.resolve.mode.as_deref()) {
        (Some(mode), _) => mode,
        (None, Some(configured)) => configured
            .parse::<ResolveMode>()
            .map_err(anyhow::Error::msg)
            .context("invalid `resolve.mode` in config")?,
        (None, None) => ResolveMode::default(),
    };

    let mut environment: BTreeMap<String, String> = config.resolve.environment.clone();
    environment.extend(args.env);

    Ok(ResolveOptions {
        repositories: args.repos,
        seeds: args.seeds,
        mode,
        environment,
        expand_features: !args.no_features,
    })
}

/// Registry over a freshly opened cache.
pub fn registry(global_opts: &GlobalOptions, config: &Config) -> Result<RepositoryRegistry> {
    Ok(RepositoryRegistry::new(open_cache(global_opts, config)?))
}

/// Load every repository up front, with a progress bar.
pub fn preload(registry: &RepositoryRegistry, urls: &[Url], global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    shell.status(Status::Loading, format!("{} repositories", urls.len()));

    let progress = Mutex::new(shell.progress(urls.len() as u64, "Loading"));
    let loaded: Result<Vec<_>> = urls
        .par_iter()
        .map(|url| {
            let repo = registry.get(url);
            progress.lock().unwrap_or_else(|e| e.into_inner()).inc(1);
            repo
        })
        .collect();
    progress.into_inner().unwrap_or_else(|e| e.into_inner()).finish();

    for repo in loaded? {
        tracing::debug!("{}: {} units, {} artifacts", repo.id(), repo.units().len(), repo.artifacts().len());
    }
    Ok(())
}
