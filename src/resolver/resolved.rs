//! The output of a resolution: downloadable artifacts plus failed requirements.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::core::{Artifact, ArtifactLocation, Classifier, VersionRange};

/// A requirement no candidate repository could satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedRequirement {
    pub namespace: String,
    pub name: String,
    pub range: VersionRange,
    /// `id version` of the requiring unit or feature; `None` for seeds.
    pub required_by: Option<String>,
    pub optional: bool,
}

impl fmt::Display for UnresolvedRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {}", self.namespace, self.name, self.range)?;
        if let Some(ref by) = self.required_by {
            write!(f, " (required by {})", by)?;
        }
        Ok(())
    }
}

/// Ordered, deduplicated set of resolved artifact locations.
///
/// Bundles and features keep the order in which resolution reached them.
#[derive(Debug, Clone, Default)]
pub struct ResolvedArtifactSet {
    bundles: Vec<ArtifactLocation>,
    features: Vec<ArtifactLocation>,
    others: Vec<ArtifactLocation>,
    seen: HashSet<Artifact>,
    unresolved: Vec<UnresolvedRequirement>,
}

impl ResolvedArtifactSet {
    pub fn new() -> Self {
        ResolvedArtifactSet::default()
    }

    /// Add a location unless the same artifact is already present.
    pub fn insert(&mut self, location: ArtifactLocation) -> bool {
        if !self.seen.insert(location.artifact.clone()) {
            return false;
        }
        match location.classifier() {
            Classifier::Bundle => self.bundles.push(location),
            Classifier::Feature => self.features.push(location),
            _ => self.others.push(location),
        }
        true
    }

    pub(crate) fn push_unresolved(&mut self, failure: UnresolvedRequirement) {
        self.unresolved.push(failure);
    }

    pub fn contains(&self, artifact: &Artifact) -> bool {
        self.seen.contains(artifact)
    }

    pub fn bundles(&self) -> &[ArtifactLocation] {
        &self.bundles
    }

    pub fn features(&self) -> &[ArtifactLocation] {
        &self.features
    }

    /// Artifacts with any other classifier (e.g. `binary`).
    pub fn others(&self) -> &[ArtifactLocation] {
        &self.others
    }

    /// Requirements recorded as failed (slicer mode).
    pub fn unresolved(&self) -> &[UnresolvedRequirement] {
        &self.unresolved
    }

    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }

    /// Bundles, then features, then the rest.
    pub fn iter(&self) -> impl Iterator<Item = &ArtifactLocation> {
        self.bundles.iter().chain(&self.features).chain(&self.others)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Serializable view for `--json` output.
    pub fn to_report(&self) -> ResolvedReport {
        let entry = |loc: &ArtifactLocation| ArtifactEntry {
            id: loc.id().to_string(),
            version: loc.version().to_string(),
            classifier: loc.classifier().to_string(),
            location: loc.location.to_string(),
        };

        ResolvedReport {
            bundles: self.bundles.iter().map(entry).collect(),
            features: self.features.iter().map(entry).collect(),
            others: self.others.iter().map(entry).collect(),
            unresolved: self
                .unresolved
                .iter()
                .map(|u| UnresolvedEntry {
                    namespace: u.namespace.clone(),
                    name: u.name.clone(),
                    range: u.range.to_string(),
                    required_by: u.required_by.clone(),
                    optional: u.optional,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResolvedReport {
    pub bundles: Vec<ArtifactEntry>,
    pub features: Vec<ArtifactEntry>,
    pub others: Vec<ArtifactEntry>,
    pub unresolved: Vec<UnresolvedEntry>,
}

#[derive(Debug, Serialize)]
pub struct ArtifactEntry {
    pub id: String,
    pub version: String,
    pub classifier: String,
    pub location: String,
}

#[derive(Debug, Serialize)]
pub struct UnresolvedEntry {
    pub namespace: String,
    pub name: String,
    pub range: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_by: Option<String>,
    pub optional: bool,
}
