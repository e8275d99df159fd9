//! The resolution entry point.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use url::Url;

use crate::core::{ArtifactLocation, RepositoryRef};
use crate::ops::load::RepositoryRegistry;
use crate::parser::{read_feature, FeatureDescriptor};
use crate::resolver::{
    FeatureSource, ResolutionGraph, ResolutionState, ResolveMode, ResolvedArtifactSet, Resolver, SeedSpec,
};
use crate::sources::{DescriptorCache, FetchOutcome};

/// Options for a resolution.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Candidate repository roots, in search order.
    pub repositories: Vec<Url>,
    pub seeds: Vec<SeedSpec>,
    pub mode: ResolveMode,
    /// Filter environment (`osgi.os`, `osgi.ws`, `osgi.arch`, ...).
    pub environment: BTreeMap<String, String>,
    /// Read feature jars and expand their plugins and nested features.
    pub expand_features: bool,
}

/// Result of a resolution.
#[derive(Debug)]
pub struct Resolution {
    pub repositories: Vec<RepositoryRef>,
    state: ResolutionState,
}

impl Resolution {
    pub fn artifacts(&self) -> &ResolvedArtifactSet {
        self.state.artifacts()
    }

    pub fn graph(&self) -> &ResolutionGraph {
        self.state.graph()
    }

    pub fn into_artifacts(self) -> ResolvedArtifactSet {
        self.state.into_artifacts()
    }
}

/// Feature descriptors fetched through the descriptor cache.
pub struct CachedFeatureSource<'a> {
    cache: &'a DescriptorCache,
}

impl<'a> CachedFeatureSource<'a> {
    pub fn new(cache: &'a DescriptorCache) -> Self {
        CachedFeatureSource { cache }
    }
}

impl FeatureSource for CachedFeatureSource<'_> {
    fn feature(&self, location: &ArtifactLocation) -> Result<FeatureDescriptor> {
        let file = match self.cache.fetch(&location.location)? {
            FetchOutcome::Cached(file) => file,
            FetchOutcome::NotFound => bail!("feature jar {} not found", location.location),
        };
        tracing::debug!("reading feature {} ({})", location.artifact, file.origin());
        Ok(read_feature(file.path(), location.location.as_str())?)
    }
}

/// Load the candidate repositories and resolve the seeds against them.
///
/// Planner-mode failures are returned as [`crate::resolver::ResolveError`]
/// inside the `anyhow::Error`.
pub fn resolve(registry: &RepositoryRegistry, opts: &ResolveOptions) -> Result<Resolution> {
    let repositories = registry.get_all(&opts.repositories)?;
    let mut state = ResolutionState::new();
    resolve_into(registry, &repositories, opts, &mut state)?;
    Ok(Resolution { repositories, state })
}

/// Resolve into a caller-owned state, so partial results survive a
/// planner failure.
pub fn resolve_into(
    registry: &RepositoryRegistry,
    repositories: &[RepositoryRef],
    opts: &ResolveOptions,
    state: &mut ResolutionState,
) -> Result<()> {
    let features = CachedFeatureSource::new(registry.cache());
    let mut resolver = Resolver::new(opts.mode, repositories).with_environment(opts.environment.clone());
    if opts.expand_features {
        resolver = resolver.with_feature_source(&features);
    }

    tracing::info!(
        "resolving {} seed(s) in {} mode against {} repositories",
        opts.seeds.len(),
        opts.mode,
        repositories.len()
    );
    resolver.resolve_seeds(&opts.seeds, state)?;
    Ok(())
}
