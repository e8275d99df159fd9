//! Repository sources.
//!
//! The descriptor cache mirrors remote descriptor files on disk and
//! revalidates them; the navigator walks composite trees on top of it and
//! remembers what it discovered in per-URL metadata stores.

pub mod cache;
pub mod index;
pub mod metadata;
pub mod navigator;

pub use cache::{CacheConfig, CacheOrigin, CachedFile, DescriptorCache, FetchError, FetchOutcome};
pub use index::{Concern, RepositoryIndex, RepositoryKind};
pub use metadata::{MetadataError, MetadataStore};
pub use navigator::{Flattened, Location, Navigator, NavigatorError, TreeNode};
