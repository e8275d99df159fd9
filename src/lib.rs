//! p2resolver - resolution of installable units against p2 repositories
//!
//! This crate navigates composite p2 repositories through a revalidating
//! disk cache, parses their unit and artifact descriptors, and resolves a
//! set of seed units into the bundles and features that must be downloaded.

pub mod core;
pub mod ops;
pub mod parser;
pub mod resolver;
pub mod sources;
pub mod util;

/// Test utilities for p2resolver unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides in-memory repositories and writers for on-disk repository
/// fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{Artifact, ArtifactLocation, Repository, Requires, Unit, Version, VersionRange};
pub use resolver::{ResolveMode, ResolvedArtifactSet, Resolver, SeedSpec};
pub use sources::{CacheConfig, DescriptorCache};
pub use util::context::GlobalContext;
