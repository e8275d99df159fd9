//! Unit resolution.
//!
//! Resolution walks unit requirements depth first over an explicit stack of
//! frames. A unit is entered once per [`ResolutionState`]: entering marks it
//! visited, registers its capabilities and resolves its artifacts; its
//! requirements are then taken one at a time, so the subtree of an earlier
//! requirement registers its capabilities before later requirements are
//! checked.
//!
//! Repository search order is the caller's order, with the requiring unit's
//! own repository moved to the front. Within a repository the highest version
//! in range wins. There is no backtracking.

pub mod errors;
pub mod graph;
pub mod resolved;
pub mod state;

pub use errors::ResolveError;
pub use graph::{ExplainStep, GraphNode, ResolutionGraph, UnitKey};
pub use resolved::{ResolvedArtifactSet, ResolvedReport, UnresolvedRequirement};
pub use state::ResolutionState;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use petgraph::graph::NodeIndex;

use crate::core::{
    ArtifactLocation, Classifier, Filter, Provides, RepositoryRef, RequirementKind, Requires, Unit, VersionRange,
    BUNDLE_NAMESPACE, UNIT_NAMESPACE,
};
use crate::parser::{FeatureDescriptor, FeatureEntry};

/// How unresolvable requirements are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveMode {
    /// Record the failure and keep going.
    #[default]
    Slicer,
    /// Abort on the first unresolvable requirement.
    Planner,
}

impl FromStr for ResolveMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "slicer" => Ok(ResolveMode::Slicer),
            "planner" => Ok(ResolveMode::Planner),
            _ => Err(format!("invalid resolve mode '{}'; expected 'slicer' or 'planner'", s)),
        }
    }
}

impl fmt::Display for ResolveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveMode::Slicer => write!(f, "slicer"),
            ResolveMode::Planner => write!(f, "planner"),
        }
    }
}

/// Supplies the `feature.xml` of a feature artifact.
pub trait FeatureSource {
    fn feature(&self, location: &ArtifactLocation) -> anyhow::Result<FeatureDescriptor>;
}

/// A requested unit: `id` or `id/range`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedSpec {
    pub id: String,
    pub range: VersionRange,
}

impl SeedSpec {
    pub fn new(id: impl Into<String>, range: VersionRange) -> Self {
        SeedSpec { id: id.into(), range }
    }
}

impl FromStr for SeedSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, range) = match s.split_once('/') {
            Some((id, range)) => (id.trim(), VersionRange::parse(range).map_err(|e| e.to_string())?),
            None => (s.trim(), VersionRange::any()),
        };
        if id.is_empty() {
            return Err(format!("invalid seed '{}': missing unit id", s));
        }
        Ok(SeedSpec::new(id, range))
    }
}

impl fmt::Display for SeedSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.id, self.range)
    }
}

/// A unit whose requirements are being walked.
struct Frame {
    unit: Unit,
    origin: usize,
    node: NodeIndex,
    next: usize,
}

/// Resolves units against an ordered list of repositories.
pub struct Resolver<'a> {
    mode: ResolveMode,
    repositories: &'a [RepositoryRef],
    features: Option<&'a dyn FeatureSource>,
    environment: Option<BTreeMap<String, String>>,
}

impl<'a> Resolver<'a> {
    pub fn new(mode: ResolveMode, repositories: &'a [RepositoryRef]) -> Self {
        Resolver {
            mode,
            repositories,
            features: None,
            environment: None,
        }
    }

    /// Expand feature artifacts through `source`. Without a source, feature
    /// artifacts are added but not expanded.
    pub fn with_feature_source(mut self, source: &'a dyn FeatureSource) -> Self {
        self.features = Some(source);
        self
    }

    /// Evaluate unit and requirement filters against `environment`.
    /// An empty environment leaves filters unevaluated.
    pub fn with_environment(mut self, environment: BTreeMap<String, String>) -> Self {
        self.environment = if environment.is_empty() { None } else { Some(environment) };
        self
    }

    pub fn mode(&self) -> ResolveMode {
        self.mode
    }

    pub fn repositories(&self) -> &[RepositoryRef] {
        self.repositories
    }

    /// Resolve seeds in order into `state`.
    pub fn resolve_seeds(&self, seeds: &[SeedSpec], state: &mut ResolutionState) -> Result<(), ResolveError> {
        for seed in seeds {
            self.resolve_seed(seed, state)?;
        }
        Ok(())
    }

    /// Look up a seed across all repositories in caller order and resolve it.
    pub fn resolve_seed(&self, seed: &SeedSpec, state: &mut ResolutionState) -> Result<(), ResolveError> {
        match self.find_unit(&seed.id, &seed.range, 0) {
            Some((unit, origin)) => self.resolve_from(unit, origin, state),
            None => self.unresolved(UNIT_NAMESPACE, &seed.id, &seed.range, None, false, state),
        }
    }

    /// Resolve `unit` and everything it transitively requires.
    ///
    /// The unit's origin is the first repository containing it.
    pub fn resolve_unit(&self, unit: &Unit, state: &mut ResolutionState) -> Result<(), ResolveError> {
        let origin = self
            .repositories
            .iter()
            .position(|repo| repo.get_unit(unit.id(), unit.version()).is_some())
            .unwrap_or(0);
        self.resolve_from(unit.clone(), origin, state)
    }

    fn resolve_from(&self, root: Unit, origin: usize, state: &mut ResolutionState) -> Result<(), ResolveError> {
        let mut stack = match self.enter(&root, origin, state)? {
            Some(frame) => {
                state.graph_mut().mark_root(frame.node);
                vec![frame]
            }
            None => {
                if let Some(node) = state.node_of(&root) {
                    state.graph_mut().mark_root(node);
                }
                return Ok(());
            }
        };

        while let Some(frame) = stack.last_mut() {
            let index = frame.next;
            frame.next += 1;
            let (unit, origin, node) = (frame.unit.clone(), frame.origin, frame.node);

            let Some(requirement) = unit.requires().get(index) else {
                stack.pop();
                continue;
            };

            let Some((found, found_origin)) = self.satisfy(requirement, &unit, origin, node, state)? else {
                continue;
            };

            match self.enter(&found, found_origin, state)? {
                Some(next) => {
                    state.graph_mut().add_edge(node, next.node, requirement.to_string());
                    stack.push(next);
                }
                None => {
                    if let Some(existing) = state.node_of(&found) {
                        state.graph_mut().add_edge(node, existing, requirement.to_string());
                    }
                }
            }
        }

        Ok(())
    }

    /// Visit a unit and resolve its artifacts. `None` if already visited.
    fn enter(&self, unit: &Unit, origin: usize, state: &mut ResolutionState) -> Result<Option<Frame>, ResolveError> {
        let repository = self.repositories.get(origin).map(|r| r.id()).unwrap_or_default();
        let Some(node) = state.visit(unit, repository) else {
            return Ok(None);
        };

        tracing::debug!("resolving {} from {}", unit, repository);
        self.resolve_artifacts(unit, origin, state)?;

        Ok(Some(Frame {
            unit: unit.clone(),
            origin,
            node,
            next: 0,
        }))
    }

    /// Find what satisfies `requirement`. Returns a unit to enter, or `None`
    /// when nothing more needs walking.
    fn satisfy(
        &self,
        requirement: &Requires,
        unit: &Unit,
        origin: usize,
        node: NodeIndex,
        state: &mut ResolutionState,
    ) -> Result<Option<(Unit, usize)>, ResolveError> {
        if requirement.is_expression_only() {
            tracing::debug!("{}: skipping match-expression requirement {}", unit, requirement.match_rule);
            return Ok(None);
        }

        if !self.filter_applies(requirement.filter.as_ref()) {
            tracing::debug!("{}: requirement {} filtered out", unit, requirement);
            return Ok(None);
        }

        if let Some(provider) = state.satisfied_by(requirement) {
            if let Some(provider) = provider {
                state.graph_mut().add_edge(node, provider, requirement.to_string());
            }
            return Ok(None);
        }

        let (namespace, name, range) = (requirement.namespace(), requirement.name(), requirement.range());
        if state.has_failed(namespace, name, range) {
            return Ok(None);
        }

        let found = match requirement.kind() {
            RequirementKind::Unit => self.find_unit(name, range, origin),
            RequirementKind::Bundle => {
                if let Some((location, _)) = self.find_artifact(&Classifier::Bundle, name, range, origin) {
                    tracing::debug!("{}: {} satisfied by artifact {}", unit, requirement, location.artifact);
                    let capability = Provides::new(BUNDLE_NAMESPACE, location.id(), location.version().clone());
                    state.register(&capability, None);
                    state.add_artifact(location);
                    return Ok(None);
                }
                None
            }
            RequirementKind::Generic(namespace) => self.find_provider(namespace, name, range, origin),
        };

        if found.is_none() {
            let required_by = unit.to_string();
            self.unresolved(namespace, name, range, Some(required_by), requirement.optional, state)?;
        }
        Ok(found)
    }

    fn resolve_artifacts(&self, unit: &Unit, origin: usize, state: &mut ResolutionState) -> Result<(), ResolveError> {
        for artifact in unit.artifacts() {
            let range = VersionRange::exact(artifact.version.clone());
            match self.find_artifact(&artifact.classifier, &artifact.id, &range, origin) {
                Some((location, found_in)) => {
                    let is_feature = *location.classifier() == Classifier::Feature;
                    if state.add_artifact(location.clone()) && is_feature {
                        self.expand_feature(location, found_in, state)?;
                    }
                }
                None => {
                    let required_by = unit.to_string();
                    self.unresolved(
                        artifact.classifier.as_str(),
                        &artifact.id,
                        &range,
                        Some(required_by),
                        false,
                        state,
                    )?;
                }
            }
        }
        Ok(())
    }

    /// Add the plugins and nested features listed by a feature's descriptor.
    fn expand_feature(
        &self,
        root: ArtifactLocation,
        origin: usize,
        state: &mut ResolutionState,
    ) -> Result<(), ResolveError> {
        let Some(source) = self.features else {
            tracing::debug!("no feature source, not expanding {}", root.artifact);
            return Ok(());
        };

        let mut pending = vec![(root, origin)];
        while let Some((feature, origin)) = pending.pop() {
            let descriptor = match source.feature(&feature) {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    let err = ResolveError::FeatureDescriptor {
                        artifact: feature.artifact.to_string(),
                        location: feature.location.to_string(),
                        reason: format!("{:#}", e),
                    };
                    match self.mode {
                        ResolveMode::Planner => return Err(err),
                        ResolveMode::Slicer => {
                            tracing::warn!("{}", err);
                            continue;
                        }
                    }
                }
            };

            let required_by = format!("{} {}", feature.id(), feature.version());

            for plugin in descriptor.plugins.iter().filter(|e| self.entry_applies(e)) {
                let range = plugin.range();
                match self.find_artifact(&Classifier::Bundle, &plugin.id, &range, origin) {
                    Some((location, _)) => {
                        state.add_artifact(location);
                    }
                    None if plugin.optional => {
                        tracing::debug!("{}: optional plugin {} not found", required_by, plugin.id);
                    }
                    None => {
                        self.unresolved(Classifier::BUNDLE, &plugin.id, &range, Some(required_by.clone()), false, state)?;
                    }
                }
            }

            for include in descriptor.includes.iter().filter(|e| self.entry_applies(e)) {
                let range = include.range();
                match self.find_artifact(&Classifier::Feature, &include.id, &range, origin) {
                    Some((location, found_in)) => {
                        if state.add_artifact(location.clone()) {
                            pending.push((location, found_in));
                        }
                    }
                    None if include.optional => {
                        tracing::debug!("{}: optional feature {} not found", required_by, include.id);
                    }
                    None => {
                        self.unresolved(
                            Classifier::FEATURE,
                            &include.id,
                            &range,
                            Some(required_by.clone()),
                            false,
                            state,
                        )?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Apply mode semantics to a requirement nothing satisfies.
    fn unresolved(
        &self,
        namespace: &str,
        name: &str,
        range: &VersionRange,
        required_by: Option<String>,
        optional: bool,
        state: &mut ResolutionState,
    ) -> Result<(), ResolveError> {
        let failure = UnresolvedRequirement {
            namespace: namespace.to_string(),
            name: name.to_string(),
            range: range.clone(),
            required_by,
            optional,
        };

        let first = state.record_failure(failure.clone());
        match self.mode {
            ResolveMode::Slicer => {
                if first {
                    tracing::debug!("unresolved requirement {}", failure);
                }
                Ok(())
            }
            ResolveMode::Planner => Err(ResolveError::UnresolvedRequirement(failure)),
        }
    }

    /// Repositories with `primary` first, then the rest in caller order.
    fn search_order(&self, primary: usize) -> impl Iterator<Item = (usize, &RepositoryRef)> + '_ {
        let first = self.repositories.get(primary).map(|repo| (primary, repo));
        first.into_iter().chain(
            self.repositories
                .iter()
                .enumerate()
                .filter(move |(idx, _)| *idx != primary),
        )
    }

    fn find_unit(&self, id: &str, range: &VersionRange, primary: usize) -> Option<(Unit, usize)> {
        self.search_order(primary).find_map(|(idx, repo)| {
            repo.find_unit(id, range, |unit| self.unit_applies(unit))
                .map(|unit| (unit.clone(), idx))
        })
    }

    fn find_provider(&self, namespace: &str, name: &str, range: &VersionRange, primary: usize) -> Option<(Unit, usize)> {
        self.search_order(primary).find_map(|(idx, repo)| {
            repo.find_provider(namespace, name, range, |unit| self.unit_applies(unit))
                .map(|unit| (unit.clone(), idx))
        })
    }

    fn find_artifact(
        &self,
        classifier: &Classifier,
        id: &str,
        range: &VersionRange,
        primary: usize,
    ) -> Option<(ArtifactLocation, usize)> {
        self.search_order(primary).find_map(|(idx, repo)| {
            repo.artifacts()
                .find(classifier, id, range)
                .map(|location| (location.clone(), idx))
        })
    }

    fn unit_applies(&self, unit: &Unit) -> bool {
        self.filter_applies(unit.filter())
    }

    fn filter_applies(&self, filter: Option<&Filter>) -> bool {
        match (&self.environment, filter) {
            (Some(environment), Some(filter)) => {
                let pairs: Vec<(&String, &String)> = environment.iter().collect();
                filter.matches_pairs(&pairs)
            }
            _ => true,
        }
    }

    fn entry_applies(&self, entry: &FeatureEntry) -> bool {
        match &self.environment {
            Some(environment) => entry.applies_to(environment),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Artifact, Version};
    use crate::test_support::{bundle_unit, feature_unit, v, MemoryFeatureSource, MemoryRepo};

    fn any() -> VersionRange {
        VersionRange::any()
    }

    fn range(s: &str) -> VersionRange {
        VersionRange::parse(s).unwrap()
    }

    fn seed(id: &str) -> SeedSpec {
        SeedSpec::new(id, any())
    }

    fn bundle_ids(set: &ResolvedArtifactSet) -> Vec<String> {
        set.bundles()
            .iter()
            .map(|l| format!("{}_{}", l.id(), l.version()))
            .collect()
    }

    fn resolve(mode: ResolveMode, repos: &[RepositoryRef], seeds: &[&str]) -> Result<ResolutionState, ResolveError> {
        let resolver = Resolver::new(mode, repos);
        let seeds: Vec<SeedSpec> = seeds.iter().map(|s| s.parse().unwrap()).collect();
        let mut state = ResolutionState::new();
        resolver.resolve_seeds(&seeds, &mut state)?;
        Ok(state)
    }

    #[test]
    fn test_seed_spec_parse() {
        let plain: SeedSpec = "org.example.app".parse().unwrap();
        assert_eq!(plain.range, any());

        let ranged: SeedSpec = "org.example.app/[1.0.0,2.0.0)".parse().unwrap();
        assert_eq!(ranged.id, "org.example.app");
        assert!(ranged.range.includes(&v("1.5.0")));
        assert!(!ranged.range.includes(&v("2.0.0")));

        assert!("/1.0.0".parse::<SeedSpec>().is_err());
        assert!("a/[2.0.0,1.0.0]".parse::<SeedSpec>().is_err());
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("PLANNER".parse::<ResolveMode>().unwrap(), ResolveMode::Planner);
        assert_eq!(ResolveMode::Slicer.to_string(), "slicer");
        assert!("strict".parse::<ResolveMode>().is_err());
    }

    #[test]
    fn test_transitive_unit_requirements() {
        let repo = MemoryRepo::new("main")
            .unit(bundle_unit("app", "1.0.0").requires(Requires::unit("lib", any())))
            .unit(bundle_unit("lib", "1.0.0").requires(Requires::unit("util", any())))
            .unit(bundle_unit("util", "1.0.0"))
            .unit(bundle_unit("unrelated", "1.0.0"))
            .build();

        let state = resolve(ResolveMode::Planner, &[repo], &["app"]).unwrap();
        assert_eq!(bundle_ids(state.artifacts()), vec!["app_1.0.0", "lib_1.0.0", "util_1.0.0"]);
        assert!(state.artifacts().is_complete());
        assert_eq!(state.visited_count(), 3);
    }

    #[test]
    fn test_resolving_twice_adds_nothing() {
        let repo = MemoryRepo::new("main")
            .unit(bundle_unit("app", "1.0.0").requires(Requires::unit("lib", any())))
            .unit(bundle_unit("lib", "1.0.0"))
            .build();
        let repos = [repo];
        let resolver = Resolver::new(ResolveMode::Slicer, &repos);

        let mut state = ResolutionState::new();
        resolver.resolve_seed(&seed("app"), &mut state).unwrap();
        let first = bundle_ids(state.artifacts());
        resolver.resolve_seed(&seed("app"), &mut state).unwrap();
        resolver.resolve_seed(&seed("lib"), &mut state).unwrap();

        assert_eq!(bundle_ids(state.artifacts()), first);
        assert_eq!(state.artifacts().len(), 2);
    }

    #[test]
    fn test_cycle_terminates() {
        let repo = MemoryRepo::new("main")
            .unit(bundle_unit("a", "1.0.0").requires(Requires::unit("b", any())))
            .unit(bundle_unit("b", "1.0.0").requires(Requires::unit("a", any())))
            .build();

        let state = resolve(ResolveMode::Planner, &[repo], &["a"]).unwrap();
        assert_eq!(bundle_ids(state.artifacts()), vec!["a_1.0.0", "b_1.0.0"]);

        let b = UnitKey {
            id: "b".to_string(),
            version: v("1.0.0"),
        };
        assert_eq!(state.graph().dependencies(&b)[0].key.id, "a");
    }

    #[test]
    fn test_highest_version_in_range() {
        let repo = MemoryRepo::new("main")
            .unit(bundle_unit("app", "1.0.0").requires(Requires::unit("lib", range("[1.0.0,2.0.0)"))))
            .unit(bundle_unit("lib", "1.0.0"))
            .unit(bundle_unit("lib", "2.0.0"))
            .unit(bundle_unit("lib", "1.2.0"))
            .build();

        let state = resolve(ResolveMode::Planner, &[repo], &["app"]).unwrap();
        assert_eq!(bundle_ids(state.artifacts()), vec!["app_1.0.0", "lib_1.2.0"]);
    }

    #[test]
    fn test_slicer_and_planner_diverge() {
        let repo = MemoryRepo::new("main")
            .unit(
                bundle_unit("app", "1.0.0")
                    .requires(Requires::unit("lib", any()))
                    .requires(Requires::unit("missing", range("[1.0.0,2.0.0)")))
                    .requires(Requires::unit("other", any())),
            )
            .unit(bundle_unit("lib", "1.0.0"))
            .unit(bundle_unit("other", "1.0.0"))
            .build();
        let repos = [repo];

        let sliced = resolve(ResolveMode::Slicer, &repos, &["app"]).unwrap().into_artifacts();
        assert_eq!(bundle_ids(&sliced), vec!["app_1.0.0", "lib_1.0.0", "other_1.0.0"]);
        assert_eq!(sliced.unresolved().len(), 1);
        let failure = &sliced.unresolved()[0];
        assert_eq!(failure.namespace, UNIT_NAMESPACE);
        assert_eq!(failure.name, "missing");
        assert_eq!(failure.required_by.as_deref(), Some("app 1.0.0"));

        let err = resolve(ResolveMode::Planner, &repos, &["app"]).unwrap_err();
        match err {
            ResolveError::UnresolvedRequirement(failure) => {
                assert_eq!(failure.name, "missing");
                assert_eq!(failure.range, range("[1.0.0,2.0.0)"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_optional_requirement_still_fails_in_planner() {
        let repo = MemoryRepo::new("main")
            .unit(bundle_unit("app", "1.0.0").requires(Requires::unit("extra", any()).optional(true)))
            .build();
        let repos = [repo];

        let sliced = resolve(ResolveMode::Slicer, &repos, &["app"]).unwrap().into_artifacts();
        assert!(sliced.unresolved()[0].optional);
        assert!(resolve(ResolveMode::Planner, &repos, &["app"]).is_err());
    }

    #[test]
    fn test_planner_keeps_earlier_seeds_in_state() {
        let repo = MemoryRepo::new("main")
            .unit(bundle_unit("good", "1.0.0"))
            .unit(bundle_unit("bad", "1.0.0").requires(Requires::unit("missing", any())))
            .build();
        let repos = [repo];
        let resolver = Resolver::new(ResolveMode::Planner, &repos);

        let mut state = ResolutionState::new();
        let result = resolver.resolve_seeds(&[seed("good"), seed("bad")], &mut state);
        assert!(result.is_err());
        assert!(bundle_ids(state.artifacts()).contains(&"good_1.0.0".to_string()));
    }

    #[test]
    fn test_missing_seed_follows_mode() {
        let repo = MemoryRepo::new("main").unit(bundle_unit("a", "1.0.0")).build();
        let repos = [repo];

        let sliced = resolve(ResolveMode::Slicer, &repos, &["a", "nothing/[1.0.0,1.0.0]"])
            .unwrap()
            .into_artifacts();
        assert_eq!(bundle_ids(&sliced), vec!["a_1.0.0"]);
        assert_eq!(sliced.unresolved()[0].name, "nothing");
        assert_eq!(sliced.unresolved()[0].required_by, None);

        assert!(resolve(ResolveMode::Planner, &repos, &["nothing"]).is_err());
    }

    #[test]
    fn test_origin_repository_is_searched_first() {
        let first = MemoryRepo::new("first").unit(bundle_unit("lib", "2.0.0")).build();
        let second = MemoryRepo::new("second")
            .unit(bundle_unit("app", "1.0.0").requires(Requires::unit("lib", any())))
            .unit(bundle_unit("lib", "1.0.0"))
            .build();

        let state = resolve(ResolveMode::Planner, &[first, second], &["app"]).unwrap();
        let lib = &state.artifacts().bundles()[1];
        assert_eq!(lib.id(), "lib");
        assert_eq!(lib.version(), &v("1.0.0"));
        assert!(lib.location.as_str().starts_with("https://second.example/"));
    }

    #[test]
    fn test_falls_back_to_other_repositories() {
        let main = MemoryRepo::new("main")
            .unit(bundle_unit("app", "1.0.0").requires(Requires::unit("lib", any())))
            .build();
        let deps = MemoryRepo::new("deps").unit(bundle_unit("lib", "3.0.0")).build();

        let state = resolve(ResolveMode::Planner, &[main, deps], &["app"]).unwrap();
        assert_eq!(bundle_ids(state.artifacts()), vec!["app_1.0.0", "lib_3.0.0"]);
    }

    #[test]
    fn test_bundle_requirement_resolves_artifact_only() {
        let repo = MemoryRepo::new("main")
            .unit(bundle_unit("app", "1.0.0").requires(Requires::bundle("org.example.lib", range("[1.0.0,2.0.0)"))))
            .artifact(Artifact::bundle("org.example.lib", v("1.5.0")))
            .artifact(Artifact::bundle("org.example.lib", v("2.1.0")))
            .build();

        let state = resolve(ResolveMode::Planner, &[repo], &["app"]).unwrap();
        assert_eq!(bundle_ids(state.artifacts()), vec!["app_1.0.0", "org.example.lib_1.5.0"]);
        assert_eq!(state.visited_count(), 1);
    }

    #[test]
    fn test_generic_requirement_uses_first_provider() {
        let repo = MemoryRepo::new("main")
            .unit(bundle_unit("app", "1.0.0").requires(Requires::new(
                "java.package",
                "org.example.api",
                range("[1.0.0,2.0.0)"),
            )))
            .unit(bundle_unit("impl.old", "1.0.0").provides(Provides::new(
                "java.package",
                "org.example.api",
                v("0.9.0"),
            )))
            .unit(bundle_unit("impl", "1.0.0").provides(Provides::new(
                "java.package",
                "org.example.api",
                v("1.1.0"),
            )))
            .unit(bundle_unit("impl.alt", "1.0.0").provides(Provides::new(
                "java.package",
                "org.example.api",
                v("1.9.0"),
            )))
            .build();

        let state = resolve(ResolveMode::Planner, &[repo], &["app"]).unwrap();
        assert_eq!(bundle_ids(state.artifacts()), vec!["app_1.0.0", "impl_1.0.0"]);
    }

    #[test]
    fn test_already_satisfied_requirement_is_skipped() {
        let repo = MemoryRepo::new("main")
            .unit(
                bundle_unit("app", "1.0.0")
                    .requires(Requires::unit("impl", any()))
                    .requires(Requires::new("java.package", "org.example.api", any())),
            )
            .unit(bundle_unit("impl", "1.0.0").provides(Provides::new("java.package", "org.example.api", v("1.0.0"))))
            .unit(bundle_unit("first.provider", "1.0.0").provides(Provides::new(
                "java.package",
                "org.example.api",
                v("1.0.0"),
            )))
            .build();

        let state = resolve(ResolveMode::Planner, &[repo], &["app"]).unwrap();
        assert_eq!(bundle_ids(state.artifacts()), vec!["app_1.0.0", "impl_1.0.0"]);
    }

    #[test]
    fn test_expression_only_requirement_is_skipped() {
        let repo = MemoryRepo::new("main")
            .unit(bundle_unit("app", "1.0.0").requires(Requires::new("", "", any()).with_match_rule("providedCapabilities.exists(x | x.name == 'a')")))
            .build();

        let state = resolve(ResolveMode::Planner, &[repo], &["app"]).unwrap();
        assert!(state.artifacts().is_complete());
    }

    #[test]
    fn test_missing_unit_artifact_uses_classifier_namespace() {
        let repo = MemoryRepo::new("main")
            .unit(bundle_unit("app", "1.0.0"))
            .without_artifact(Artifact::bundle("app", v("1.0.0")))
            .build();
        let repos = [repo];

        let sliced = resolve(ResolveMode::Slicer, &repos, &["app"]).unwrap().into_artifacts();
        assert!(sliced.bundles().is_empty());
        let failure = &sliced.unresolved()[0];
        assert_eq!(failure.namespace, "osgi.bundle");
        assert_eq!(failure.name, "app");
        assert_eq!(failure.range, VersionRange::exact(v("1.0.0")));

        assert!(resolve(ResolveMode::Planner, &repos, &["app"]).is_err());
    }

    #[test]
    fn test_unit_artifact_found_in_other_repository() {
        let metadata = MemoryRepo::new("metadata")
            .unit(bundle_unit("app", "1.0.0"))
            .without_artifact(Artifact::bundle("app", v("1.0.0")))
            .build();
        let mirror = MemoryRepo::new("mirror")
            .artifact(Artifact::bundle("app", v("1.0.0")))
            .build();

        let state = resolve(ResolveMode::Planner, &[metadata, mirror], &["app"]).unwrap();
        assert!(state.artifacts().bundles()[0]
            .location
            .as_str()
            .starts_with("https://mirror.example/"));
    }

    fn feature_repo() -> RepositoryRef {
        MemoryRepo::new("main")
            .unit(feature_unit("org.example.feature", "1.0.0"))
            .artifact(Artifact::bundle("p1", v("1.0.0")))
            .artifact(Artifact::bundle("p2", v("1.0.0")))
            .artifact(Artifact::bundle("p2", v("1.1.0")))
            .artifact(Artifact::bundle("p3", v("2.0.0")))
            .artifact(Artifact::feature("org.example.nested", v("1.0.0")))
            .build()
    }

    #[test]
    fn test_feature_expansion() {
        let features = MemoryFeatureSource::new()
            .feature(
                "org.example.feature",
                "1.0.0",
                &[("p1", "1.0.0"), ("p2", "0.0.0")],
                &[("org.example.nested", "1.0.0")],
            )
            .feature("org.example.nested", "1.0.0", &[("p3", "2.0.0"), ("p1", "1.0.0")], &[]);

        let repos = [feature_repo()];
        let resolver = Resolver::new(ResolveMode::Planner, &repos).with_feature_source(&features);
        let mut state = ResolutionState::new();
        resolver
            .resolve_seed(&seed("org.example.feature.feature.group"), &mut state)
            .unwrap();

        let set = state.artifacts();
        assert_eq!(bundle_ids(set), vec!["p1_1.0.0", "p2_1.1.0", "p3_2.0.0"]);
        let feature_ids: Vec<_> = set.features().iter().map(|l| l.id()).collect();
        assert_eq!(feature_ids, vec!["org.example.feature", "org.example.nested"]);
        assert_eq!(features.requests(), vec!["org.example.feature", "org.example.nested"]);
        assert_eq!(state.visited_count(), 1);
    }

    #[test]
    fn test_feature_without_source_is_not_expanded() {
        let repos = [feature_repo()];
        let state = resolve(ResolveMode::Planner, &repos, &["org.example.feature.feature.group"]).unwrap();
        assert_eq!(state.artifacts().features().len(), 1);
        assert!(state.artifacts().bundles().is_empty());
    }

    #[test]
    fn test_feature_missing_plugin_follows_mode() {
        let features = MemoryFeatureSource::new().feature(
            "org.example.feature",
            "1.0.0",
            &[("p1", "1.0.0"), ("absent", "1.0.0")],
            &[],
        );
        let repos = [feature_repo()];
        let seeds = [seed("org.example.feature.feature.group")];

        let slicer = Resolver::new(ResolveMode::Slicer, &repos).with_feature_source(&features);
        let mut state = ResolutionState::new();
        slicer.resolve_seeds(&seeds, &mut state).unwrap();
        let failure = &state.artifacts().unresolved()[0];
        assert_eq!(failure.namespace, Classifier::BUNDLE);
        assert_eq!(failure.name, "absent");
        assert_eq!(failure.required_by.as_deref(), Some("org.example.feature 1.0.0"));

        let planner = Resolver::new(ResolveMode::Planner, &repos).with_feature_source(&features);
        let mut state = ResolutionState::new();
        assert!(planner.resolve_seeds(&seeds, &mut state).is_err());
    }

    #[test]
    fn test_unreadable_feature_descriptor() {
        let features = MemoryFeatureSource::new();
        let repos = [feature_repo()];
        let seeds = [seed("org.example.feature.feature.group")];

        let slicer = Resolver::new(ResolveMode::Slicer, &repos).with_feature_source(&features);
        let mut state = ResolutionState::new();
        slicer.resolve_seeds(&seeds, &mut state).unwrap();
        assert_eq!(state.artifacts().features().len(), 1);

        let planner = Resolver::new(ResolveMode::Planner, &repos).with_feature_source(&features);
        let mut state = ResolutionState::new();
        let err = planner.resolve_seeds(&seeds, &mut state).unwrap_err();
        assert!(matches!(err, ResolveError::FeatureDescriptor { .. }));
    }

    #[test]
    fn test_environment_filters() {
        let repo = MemoryRepo::new("main")
            .unit(
                bundle_unit("app", "1.0.0")
                    .requires(Requires::unit("ui", any()))
                    .requires(
                        Requires::unit("win.only", any()).with_filter(Some(Filter::parse("(osgi.os=win32)").unwrap())),
                    ),
            )
            .unit(bundle_unit("ui", "2.0.0").filter(Some(Filter::parse("(osgi.ws=win32)").unwrap())))
            .unit(bundle_unit("ui", "1.0.0").filter(Some(Filter::parse("(&(osgi.os=linux)(osgi.ws=gtk))").unwrap())))
            .build();
        let repos = [repo];

        let mut linux = BTreeMap::new();
        linux.insert("osgi.os".to_string(), "linux".to_string());
        linux.insert("osgi.ws".to_string(), "gtk".to_string());

        let resolver = Resolver::new(ResolveMode::Planner, &repos).with_environment(linux);
        let mut state = ResolutionState::new();
        resolver.resolve_seed(&seed("app"), &mut state).unwrap();
        assert_eq!(bundle_ids(state.artifacts()), vec!["app_1.0.0", "ui_1.0.0"]);

        let unfiltered = Resolver::new(ResolveMode::Slicer, &repos);
        let mut state = ResolutionState::new();
        unfiltered.resolve_seed(&seed("app"), &mut state).unwrap();
        assert_eq!(bundle_ids(state.artifacts()), vec!["app_1.0.0", "ui_2.0.0"]);
        assert_eq!(state.artifacts().unresolved()[0].name, "win.only");
    }

    #[test]
    fn test_graph_explains_inclusion() {
        let repo = MemoryRepo::new("main")
            .unit(bundle_unit("app", "1.0.0").requires(Requires::unit("lib", any())))
            .unit(bundle_unit("lib", "1.0.0").requires(Requires::unit("util", any())))
            .unit(bundle_unit("util", "1.0.0"))
            .build();

        let state = resolve(ResolveMode::Planner, &[repo], &["app"]).unwrap();
        let chain = state.graph().explain("util").unwrap();
        let ids: Vec<_> = chain.iter().map(|s| s.unit.id.as_str()).collect();
        assert_eq!(ids, vec!["app", "lib", "util"]);
        assert!(chain[2].via.as_deref().unwrap().contains("util"));
        assert_eq!(state.graph().roots().next().unwrap().repository, "main");
    }

    #[test]
    fn test_resolve_unit_directly() {
        let repo = MemoryRepo::new("main")
            .unit(bundle_unit("app", "1.0.0").requires(Requires::unit("lib", any())))
            .unit(bundle_unit("lib", "1.0.0"))
            .build();
        let app = repo.get_unit("app", &Version::new(1, 0, 0)).unwrap().clone();
        let repos = [repo];

        let mut state = ResolutionState::new();
        Resolver::new(ResolveMode::Planner, &repos)
            .resolve_unit(&app, &mut state)
            .unwrap();
        assert_eq!(state.artifacts().len(), 2);
    }
}
