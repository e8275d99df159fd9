//! Installable units, their capabilities and requirements.
//!
//! Units are immutable once built and are shared through `Arc`, the same
//! way summaries are handed around during resolution.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::core::artifact::Artifact;
use crate::core::filter::Filter;
use crate::core::version::{Version, VersionRange};

/// Namespace of installable-unit capabilities.
pub const UNIT_NAMESPACE: &str = "org.eclipse.equinox.p2.iu";

/// Namespace of bundle capabilities.
pub const BUNDLE_NAMESPACE: &str = "osgi.bundle";

/// A capability offered by a unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Provides {
    pub namespace: String,
    pub name: String,
    pub version: Version,
}

impl Provides {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, version: Version) -> Self {
        Provides {
            namespace: namespace.into(),
            name: name.into(),
            version,
        }
    }
}

/// How a requirement is resolved, decided once from its namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequirementKind {
    Unit,
    Bundle,
    Generic(String),
}

impl RequirementKind {
    pub fn from_namespace(namespace: &str) -> Self {
        match namespace {
            UNIT_NAMESPACE => RequirementKind::Unit,
            BUNDLE_NAMESPACE => RequirementKind::Bundle,
            other => RequirementKind::Generic(other.to_string()),
        }
    }
}

/// A version-ranged need of a unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Requires {
    namespace: String,
    name: String,
    range: VersionRange,
    kind: RequirementKind,
    pub optional: bool,
    pub greedy: bool,
    pub match_rule: String,
    pub filter: Option<Filter>,
}

impl Requires {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, range: VersionRange) -> Self {
        let namespace = namespace.into();
        let kind = RequirementKind::from_namespace(&namespace);
        Requires {
            namespace,
            name: name.into(),
            range,
            kind,
            optional: false,
            greedy: true,
            match_rule: String::new(),
            filter: None,
        }
    }

    /// Requirement on a unit by id.
    pub fn unit(name: impl Into<String>, range: VersionRange) -> Self {
        Requires::new(UNIT_NAMESPACE, name, range)
    }

    /// Requirement on a bundle by symbolic name.
    pub fn bundle(name: impl Into<String>, range: VersionRange) -> Self {
        Requires::new(BUNDLE_NAMESPACE, name, range)
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn greedy(mut self, greedy: bool) -> Self {
        self.greedy = greedy;
        self
    }

    pub fn with_match_rule(mut self, rule: impl Into<String>) -> Self {
        self.match_rule = rule.into();
        self
    }

    pub fn with_filter(mut self, filter: Option<Filter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn range(&self) -> &VersionRange {
        &self.range
    }

    pub fn kind(&self) -> &RequirementKind {
        &self.kind
    }

    /// A requirement carrying only a match expression and no capability name.
    pub fn is_expression_only(&self) -> bool {
        self.namespace.is_empty() && self.name.is_empty()
    }

    /// Whether `capability` satisfies this requirement.
    pub fn is_satisfied_by(&self, capability: &Provides) -> bool {
        capability.namespace == self.namespace
            && capability.name == self.name
            && self.range.includes(&capability.version)
    }
}

impl fmt::Display for Requires {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {}", self.namespace, self.name, self.range)
    }
}

/// An installable unit.
#[derive(Debug, Clone)]
pub struct Unit {
    inner: Arc<UnitInner>,
}

#[derive(Debug)]
struct UnitInner {
    id: String,
    version: Version,
    properties: BTreeMap<String, String>,
    provides: Vec<Provides>,
    requires: Vec<Requires>,
    artifacts: Vec<Artifact>,
    filter: Option<Filter>,
}

impl Unit {
    /// Start building a unit.
    pub fn builder(id: impl Into<String>, version: Version) -> UnitBuilder {
        UnitBuilder {
            id: id.into(),
            version,
            properties: BTreeMap::new(),
            provides: Vec::new(),
            requires: Vec::new(),
            artifacts: Vec::new(),
            filter: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn version(&self) -> &Version {
        &self.inner.version
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.inner.properties
    }

    /// Get a property, or the empty string when absent.
    pub fn property(&self, name: &str) -> &str {
        self.inner
            .properties
            .get(name)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn provides(&self) -> &[Provides] {
        &self.inner.provides
    }

    pub fn requires(&self) -> &[Requires] {
        &self.inner.requires
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.inner.artifacts
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.inner.filter.as_ref()
    }

    /// Whether two handles point at the same parsed unit.
    pub fn ptr_eq(&self, other: &Unit) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.inner.id, self.inner.version)
    }
}

/// Builder for [`Unit`]; the unit is frozen by [`UnitBuilder::build`].
#[derive(Debug)]
pub struct UnitBuilder {
    id: String,
    version: Version,
    properties: BTreeMap<String, String>,
    provides: Vec<Provides>,
    requires: Vec<Requires>,
    artifacts: Vec<Artifact>,
    filter: Option<Filter>,
}

impl UnitBuilder {
    pub fn property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn provides(mut self, provides: Provides) -> Self {
        self.provides.push(provides);
        self
    }

    /// Add the conventional self-capability in the unit namespace.
    pub fn provides_self(mut self) -> Self {
        self.provides.push(Provides::new(
            UNIT_NAMESPACE,
            self.id.clone(),
            self.version.clone(),
        ));
        self
    }

    pub fn requires(mut self, requires: Requires) -> Self {
        self.requires.push(requires);
        self
    }

    pub fn artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    pub fn filter(mut self, filter: Option<Filter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn build(self) -> Unit {
        Unit {
            inner: Arc::new(UnitInner {
                id: self.id,
                version: self.version,
                properties: self.properties,
                provides: self.provides,
                requires: self.requires,
                artifacts: self.artifacts,
                filter: self.filter,
            }),
        }
    }
}
