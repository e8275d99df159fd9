//! Test utilities for unit tests.
//!
//! `fixtures` writes p2 repositories to disk; this module builds in-memory
//! repositories and feature sources for resolver tests.
//!
//! # Example
//!
//! ```rust,ignore
//! let repo = MemoryRepo::new("main")
//!     .unit(bundle_unit("a", "1.0.0").requires(Requires::unit("b", VersionRange::any())))
//!     .build();
//! ```

pub mod fixtures;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use url::Url;

use crate::core::{
    Artifact, ArtifactIndex, ArtifactLocation, Classifier, Repository, RepositoryRef, Unit, UnitBuilder, Version,
};
use crate::parser::{FeatureDescriptor, FeatureEntry};
use crate::resolver::FeatureSource;

pub use fixtures::*;

/// Parse a version in tests.
pub fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
}

/// Builder for a unit with its self-capability and a bundle artifact of the
/// same id and version.
pub fn bundle_unit(id: &str, version: &str) -> UnitBuilder {
    Unit::builder(id, v(version))
        .provides_self()
        .artifact(Artifact::bundle(id, v(version)))
}

/// Builder for a feature group unit referencing a feature artifact.
pub fn feature_unit(id: &str, version: &str) -> UnitBuilder {
    Unit::builder(format!("{}.feature.group", id), v(version))
        .provides_self()
        .artifact(Artifact::feature(id, v(version)))
}

/// Conventional download URL of an artifact in an in-memory repository.
pub fn location_of(repo: &str, artifact: &Artifact) -> Url {
    let folder = match artifact.classifier {
        Classifier::Feature => "features",
        Classifier::Bundle => "plugins",
        _ => "binary",
    };
    Url::parse(&format!(
        "https://{}.example/{}/{}_{}.jar",
        repo, folder, artifact.id, artifact.version
    ))
    .unwrap()
}

/// In-memory repository builder.
///
/// Every artifact referenced by a unit is added to the artifact index unless
/// it was excluded with [`MemoryRepo::without_artifact`].
pub struct MemoryRepo {
    id: String,
    units: Vec<Unit>,
    extra: Vec<Artifact>,
    excluded: Vec<Artifact>,
}

impl MemoryRepo {
    pub fn new(id: &str) -> Self {
        MemoryRepo {
            id: id.to_string(),
            units: Vec::new(),
            extra: Vec::new(),
            excluded: Vec::new(),
        }
    }

    pub fn unit(mut self, unit: UnitBuilder) -> Self {
        self.units.push(unit.build());
        self
    }

    /// An artifact not referenced by any unit.
    pub fn artifact(mut self, artifact: Artifact) -> Self {
        self.extra.push(artifact);
        self
    }

    pub fn without_artifact(mut self, artifact: Artifact) -> Self {
        self.excluded.push(artifact);
        self
    }

    pub fn build(self) -> RepositoryRef {
        let mut index = ArtifactIndex::new();
        let referenced = self.units.iter().flat_map(|u| u.artifacts().iter().cloned());
        for artifact in referenced.chain(self.extra) {
            if self.excluded.contains(&artifact) {
                continue;
            }
            let url = location_of(&self.id, &artifact);
            index.insert(ArtifactLocation::new(artifact, url));
        }
        Arc::new(Repository::new(self.id, self.units, index))
    }
}

/// Feature descriptors served from memory, keyed by feature id and version.
#[derive(Default)]
pub struct MemoryFeatureSource {
    features: HashMap<(String, Version), FeatureDescriptor>,
    requests: Mutex<Vec<String>>,
}

impl MemoryFeatureSource {
    pub fn new() -> Self {
        MemoryFeatureSource::default()
    }

    /// Add a feature listing `plugins` and `includes` as `(id, version)`.
    pub fn feature(mut self, id: &str, version: &str, plugins: &[(&str, &str)], includes: &[(&str, &str)]) -> Self {
        let entry = |(id, version): &(&str, &str)| FeatureEntry {
            id: id.to_string(),
            version: v(version),
            optional: false,
            os: None,
            ws: None,
            arch: None,
        };
        let descriptor = FeatureDescriptor {
            id: id.to_string(),
            version: v(version),
            plugins: plugins.iter().map(entry).collect(),
            includes: includes.iter().map(entry).collect(),
        };
        self.features.insert((id.to_string(), v(version)), descriptor);
        self
    }

    /// Add a prepared descriptor.
    pub fn descriptor(mut self, descriptor: FeatureDescriptor) -> Self {
        self.features
            .insert((descriptor.id.clone(), descriptor.version.clone()), descriptor);
        self
    }

    /// Feature ids requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl FeatureSource for MemoryFeatureSource {
    fn feature(&self, location: &ArtifactLocation) -> Result<FeatureDescriptor> {
        self.requests.lock().unwrap().push(location.id().to_string());
        self.features
            .get(&(location.id().to_string(), location.version().clone()))
            .cloned()
            .ok_or_else(|| anyhow!("no feature.xml in {}", location.location))
    }
}
