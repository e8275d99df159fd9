//! Core data structures.
//!
//! This module contains the foundational types used throughout the crate:
//! - Versions and version ranges
//! - LDAP filters used by mapping rules and platform filters
//! - Units, capabilities, requirements and artifacts
//! - Read-only repository indices

pub mod artifact;
pub mod filter;
pub mod repository;
pub mod unit;
pub mod version;

pub use artifact::{Artifact, ArtifactLocation, Classifier};
pub use filter::{Filter, FilterError};
pub use repository::{ArtifactIndex, Repository, RepositoryRef};
pub use unit::{Provides, RequirementKind, Requires, Unit, UnitBuilder, BUNDLE_NAMESPACE, UNIT_NAMESPACE};
pub use version::{Bound, Version, VersionError, VersionRange};
