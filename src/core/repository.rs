//! Read-only repository indices.
//!
//! A [`Repository`] is the logical repository behind one root URL: the union
//! of every metadata leaf (units) and every artifact leaf (download
//! locations) reachable from that root. It is built once and never mutated.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::core::artifact::{ArtifactLocation, Classifier};
use crate::core::unit::{Provides, Unit};
use crate::core::version::{Version, VersionRange};

/// Download locations keyed by classifier and id, each list sorted by
/// descending version.
#[derive(Debug, Clone, Default)]
pub struct ArtifactIndex {
    entries: HashMap<Classifier, HashMap<String, Vec<ArtifactLocation>>>,
    len: usize,
}

impl ArtifactIndex {
    pub fn new() -> Self {
        ArtifactIndex::default()
    }

    /// Insert a location. Returns `false` if the same classifier/id/version
    /// was already present (the first one wins).
    pub fn insert(&mut self, location: ArtifactLocation) -> bool {
        let by_id = self
            .entries
            .entry(location.classifier().clone())
            .or_default()
            .entry(location.id().to_string())
            .or_default();

        match by_id.binary_search_by(|entry| location.version().cmp(entry.version())) {
            Ok(_) => false,
            Err(pos) => {
                by_id.insert(pos, location);
                self.len += 1;
                true
            }
        }
    }

    /// Merge another index into this one; existing entries win.
    pub fn extend(&mut self, other: ArtifactIndex) {
        for by_id in other.entries.into_values() {
            for locations in by_id.into_values() {
                for location in locations {
                    self.insert(location);
                }
            }
        }
    }

    /// Exact lookup by classifier, id and version.
    pub fn get(&self, classifier: &Classifier, id: &str, version: &Version) -> Option<&ArtifactLocation> {
        self.find(classifier, id, &VersionRange::exact(version.clone()))
    }

    /// Highest version of `id` within `range`.
    pub fn find(&self, classifier: &Classifier, id: &str, range: &VersionRange) -> Option<&ArtifactLocation> {
        self.entries
            .get(classifier)?
            .get(id)?
            .iter()
            .find(|loc| range.includes(loc.version()))
    }

    /// All locations of a classifier, in no particular order.
    pub fn iter_classifier<'a>(&'a self, classifier: &Classifier) -> impl Iterator<Item = &'a ArtifactLocation> + 'a {
        self.entries
            .get(classifier)
            .into_iter()
            .flat_map(|by_id| by_id.values().flatten())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// The logical repository for one root URL.
pub struct Repository {
    /// Stable identity (the root URL as given by the caller).
    id: String,

    /// Units in discovery order.
    units: Vec<Unit>,

    /// Unit positions by id, sorted by descending version.
    by_id: HashMap<String, Vec<usize>>,

    /// Capability providers by (namespace, name), in discovery order.
    capabilities: HashMap<(String, String), Vec<(Version, usize)>>,

    artifacts: ArtifactIndex,
}

impl Repository {
    /// Build a repository from parsed units and artifacts.
    ///
    /// Units are kept in the given order; duplicates of an (id, version)
    /// already seen are dropped.
    pub fn new(id: impl Into<String>, units: impl IntoIterator<Item = Unit>, artifacts: ArtifactIndex) -> Self {
        let mut repo = Repository {
            id: id.into(),
            units: Vec::new(),
            by_id: HashMap::new(),
            capabilities: HashMap::new(),
            artifacts,
        };

        let mut seen: HashSet<(String, Version)> = HashSet::new();
        for unit in units {
            if !seen.insert((unit.id().to_string(), unit.version().clone())) {
                tracing::debug!("{}: dropping duplicate unit {}", repo.id, unit);
                continue;
            }

            let idx = repo.units.len();
            for cap in unit.provides() {
                repo.capabilities
                    .entry((cap.namespace.clone(), cap.name.clone()))
                    .or_default()
                    .push((cap.version.clone(), idx));
            }
            repo.by_id.entry(unit.id().to_string()).or_default().push(idx);
            repo.units.push(unit);
        }

        let units = &repo.units;
        for positions in repo.by_id.values_mut() {
            positions.sort_by(|a, b| units[*b].version().cmp(units[*a].version()));
        }

        repo
    }

    /// Convenience for an empty repository.
    pub fn empty(id: impl Into<String>) -> Self {
        Repository::new(id, Vec::new(), ArtifactIndex::new())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// All units in discovery order.
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn artifacts(&self) -> &ArtifactIndex {
        &self.artifacts
    }

    /// Highest version of unit `id` within `range` accepted by `accept`.
    pub fn find_unit<F>(&self, id: &str, range: &VersionRange, accept: F) -> Option<&Unit>
    where
        F: Fn(&Unit) -> bool,
    {
        self.by_id
            .get(id)?
            .iter()
            .map(|&idx| &self.units[idx])
            .find(|unit| range.includes(unit.version()) && accept(unit))
    }

    /// Exact unit lookup.
    pub fn get_unit(&self, id: &str, version: &Version) -> Option<&Unit> {
        self.find_unit(id, &VersionRange::exact(version.clone()), |_| true)
    }

    /// First unit in discovery order providing a capability in range.
    pub fn find_provider<F>(&self, namespace: &str, name: &str, range: &VersionRange, accept: F) -> Option<&Unit>
    where
        F: Fn(&Unit) -> bool,
    {
        self.capabilities
            .get(&(namespace.to_string(), name.to_string()))?
            .iter()
            .filter(|(version, _)| range.includes(version))
            .map(|&(_, idx)| &self.units[idx])
            .find(|unit| accept(unit))
    }

    /// Linear-scan equivalent of [`Repository::find_provider`].
    pub fn scan_provider<F>(&self, namespace: &str, name: &str, range: &VersionRange, accept: F) -> Option<&Unit>
    where
        F: Fn(&Unit) -> bool,
    {
        self.units.iter().find(|unit| {
            unit.provides().iter().any(|cap: &Provides| {
                cap.namespace == namespace && cap.name == name && range.includes(&cap.version)
            }) && accept(unit)
        })
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("id", &self.id)
            .field("units", &self.units.len())
            .field("artifacts", &self.artifacts.len())
            .finish()
    }
}

/// Shared handle to a repository.
pub type RepositoryRef = Arc<Repository>;
