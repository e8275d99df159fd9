//! Mutable bookkeeping of one top-level resolution.

use std::collections::{HashMap, HashSet};

use petgraph::graph::NodeIndex;

use crate::core::{ArtifactLocation, Provides, Requires, Unit, Version, VersionRange};
use crate::resolver::graph::{ResolutionGraph, UnitKey};
use crate::resolver::resolved::{ResolvedArtifactSet, UnresolvedRequirement};

/// Visited units, satisfied capabilities, failed requirements and the output.
///
/// Each top-level call owns one state. Resolving more seeds into the same
/// state never duplicates output entries.
///
/// Units are visited by id and version only. A unit published identically in
/// two repositories is entered once, from whichever repository reached it
/// first, and the graph records that repository as its origin.
#[derive(Debug, Default)]
pub struct ResolutionState {
    visited: HashSet<UnitKey>,
    satisfied: HashMap<(String, String), Vec<(Version, Option<NodeIndex>)>>,
    failed: HashSet<(String, String, VersionRange)>,
    graph: ResolutionGraph,
    artifacts: ResolvedArtifactSet,
}

impl ResolutionState {
    pub fn new() -> Self {
        ResolutionState::default()
    }

    pub fn is_visited(&self, unit: &Unit) -> bool {
        self.visited.contains(&UnitKey::of(unit))
    }

    /// Mark `unit` visited and register its capabilities.
    ///
    /// Returns the unit's graph node, or `None` if it was already visited.
    pub(crate) fn visit(&mut self, unit: &Unit, repository: &str) -> Option<NodeIndex> {
        let key = UnitKey::of(unit);
        if !self.visited.insert(key.clone()) {
            return None;
        }
        let node = self.graph.add_unit(key, repository);
        for capability in unit.provides() {
            self.register(capability, Some(node));
        }
        Some(node)
    }

    /// Node of an already visited unit.
    pub(crate) fn node_of(&self, unit: &Unit) -> Option<NodeIndex> {
        self.graph.node(&UnitKey::of(unit))
    }

    /// Register a capability; `provider` is `None` for capabilities satisfied
    /// directly by an artifact.
    pub(crate) fn register(&mut self, capability: &Provides, provider: Option<NodeIndex>) {
        self.satisfied
            .entry((capability.namespace.clone(), capability.name.clone()))
            .or_default()
            .push((capability.version.clone(), provider));
    }

    /// If `requirement` is already satisfied, the node that satisfied it.
    pub(crate) fn satisfied_by(&self, requirement: &Requires) -> Option<Option<NodeIndex>> {
        self.satisfied
            .get(&(requirement.namespace().to_string(), requirement.name().to_string()))?
            .iter()
            .find(|(version, _)| requirement.range().includes(version))
            .map(|(_, node)| *node)
    }

    pub fn is_satisfied(&self, requirement: &Requires) -> bool {
        self.satisfied_by(requirement).is_some()
    }

    pub fn has_failed(&self, namespace: &str, name: &str, range: &VersionRange) -> bool {
        self.failed
            .contains(&(namespace.to_string(), name.to_string(), range.clone()))
    }

    /// Record a failed requirement. Returns `false` if it was already recorded.
    pub(crate) fn record_failure(&mut self, failure: UnresolvedRequirement) -> bool {
        let key = (failure.namespace.clone(), failure.name.clone(), failure.range.clone());
        if !self.failed.insert(key) {
            return false;
        }
        self.artifacts.push_unresolved(failure);
        true
    }

    pub(crate) fn add_artifact(&mut self, location: ArtifactLocation) -> bool {
        self.artifacts.insert(location)
    }

    pub(crate) fn graph_mut(&mut self) -> &mut ResolutionGraph {
        &mut self.graph
    }

    pub fn graph(&self) -> &ResolutionGraph {
        &self.graph
    }

    pub fn artifacts(&self) -> &ResolvedArtifactSet {
        &self.artifacts
    }

    pub fn into_artifacts(self) -> ResolvedArtifactSet {
        self.artifacts
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}
