//! Loading logical repositories from root URLs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use anyhow::{Context, Result};
use rayon::prelude::*;
use url::Url;

use crate::core::{ArtifactIndex, Repository, RepositoryRef, Unit};
use crate::parser::composite::directory_url;
use crate::parser::{parse_artifacts, parse_units};
use crate::sources::navigator::{Location, NavigatorError};
use crate::sources::{Concern, DescriptorCache, Navigator};

/// Load the logical repository behind `root`.
///
/// Every metadata leaf reachable from `root` contributes units, every
/// artifact leaf contributes download locations. A root without any
/// metadata repository is an error; a root without artifact repositories
/// yields an empty artifact index.
pub fn load_repository(cache: &DescriptorCache, root: &Url) -> Result<Repository> {
    let root = directory_url(root);

    let metadata = Navigator::new(cache, Concern::Metadata)
        .leaves(&root)
        .with_context(|| format!("failed to load metadata repository {}", root))?;

    let units: Vec<Vec<Unit>> = metadata
        .par_iter()
        .map(load_units)
        .collect::<Result<_>>()?;
    let units: Vec<Unit> = units.into_iter().flatten().collect();

    let artifacts = match Navigator::new(cache, Concern::Artifacts).leaves(&root) {
        Ok(leaves) => {
            let indices: Vec<ArtifactIndex> = leaves
                .par_iter()
                .map(load_artifacts)
                .collect::<Result<_>>()?;
            indices.into_iter().fold(ArtifactIndex::new(), |mut all, index| {
                all.extend(index);
                all
            })
        }
        Err(NavigatorError::RepositoryNotFound { .. }) => {
            tracing::warn!("{}: no artifact repository, units will have no download locations", root);
            ArtifactIndex::new()
        }
        Err(e) => {
            return Err(anyhow::Error::new(e).context(format!("failed to load artifact repository {}", root)))
        }
    };

    tracing::info!(
        "loaded {}: {} units from {} metadata leaves, {} artifacts",
        root,
        units.len(),
        metadata.len(),
        artifacts.len()
    );

    Ok(Repository::new(root.as_str(), units, artifacts))
}

fn load_units(leaf: &Location) -> Result<Vec<Unit>> {
    let location = leaf.descriptor().url().to_string();
    let document = leaf
        .descriptor()
        .parse()
        .with_context(|| format!("failed to read metadata leaf {}", leaf.url()))?;
    Ok(parse_units(&document, &location))
}

fn load_artifacts(leaf: &Location) -> Result<ArtifactIndex> {
    let location = leaf.descriptor().url().to_string();
    let document = leaf
        .descriptor()
        .parse()
        .with_context(|| format!("failed to read artifact leaf {}", leaf.url()))?;
    Ok(parse_artifacts(&document, leaf.url(), &location)?)
}

/// Loaded repositories shared across resolutions, keyed by root URL.
///
/// Concurrent requests for the same URL load it once; requests for
/// different URLs load in parallel.
pub struct RepositoryRegistry {
    cache: DescriptorCache,
    slots: Mutex<HashMap<Url, Arc<OnceLock<RepositoryRef>>>>,
}

impl RepositoryRegistry {
    pub fn new(cache: DescriptorCache) -> Self {
        RepositoryRegistry {
            cache,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache(&self) -> &DescriptorCache {
        &self.cache
    }

    /// The repository behind `url`, loading it on first use.
    pub fn get(&self, url: &Url) -> Result<RepositoryRef> {
        let url = directory_url(url);
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(slots.entry(url.clone()).or_default())
        };

        if let Some(repo) = slot.get() {
            return Ok(Arc::clone(repo));
        }

        // No lock is held while loading. Racing first loads of one URL may
        // both run; the first one stored is shared by every caller.
        let repo = Arc::new(load_repository(&self.cache, &url)?);
        Ok(Arc::clone(slot.get_or_init(|| repo)))
    }

    /// Load several roots in parallel, keeping the given order.
    pub fn get_all(&self, urls: &[Url]) -> Result<Vec<RepositoryRef>> {
        urls.par_iter().map(|url| self.get(url)).collect()
    }

    /// Drop a loaded repository so the next `get` reloads it.
    pub fn evict(&self, url: &Url) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.remove(&directory_url(url));
    }
}
