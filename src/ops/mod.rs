//! High-level operations.
//!
//! This module contains the implementation of p2resolve commands.

pub mod cache;
pub mod explain;
pub mod load;
pub mod repos;
pub mod resolve;

pub use cache::{clean, forget, CleanSummary};
pub use explain::{explain, format_chain, Explanation};
pub use load::{load_repository, RepositoryRegistry};
pub use repos::{format_tree, repository_trees, trees_to_json, RepositoryTree};
pub use resolve::{resolve, resolve_into, CachedFeatureSource, Resolution, ResolveOptions};
