//! Composite repository navigation.
//!
//! For one root URL and one [`Concern`], the navigator discovers which
//! descriptor file the repository publishes, whether it is a composite or a
//! leaf, and (for composites) which children it points at. Discoveries are
//! remembered in the URL's metadata store so later runs fetch the right
//! filename directly instead of trying the candidate list again.
//!
//! ```text
//! Unvisited --p2.index / defaults--> Searching --first fetchable--> Composite | Leaf | Unknown
//!     ^                                                              |
//!     +-------------- remembered filename returns NotFound ----------+
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use thiserror::Error;
use url::Url;

use crate::parser::composite::{directory_url, CompositeDescriptor};
use crate::parser::xml::{parse_document, parse_root, read_descriptor, Element};
use crate::parser::ParseError;
use crate::sources::cache::{CachedFile, DescriptorCache, FetchError, FetchOutcome};
use crate::sources::index::{inner_document_name, Concern, RepositoryIndex, RepositoryKind, INDEX_FILE};
use crate::sources::metadata::{MetadataError, MetadataStore};

/// Errors navigating a repository location.
#[derive(Debug, Error)]
pub enum NavigatorError {
    #[error("no {concern} repository found at {url} (tried {})", tried.join(", "))]
    RepositoryNotFound {
        url: Url,
        concern: Concern,
        tried: Vec<String>,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("failed to load child {child} of composite {parent}")]
    ChildFailed {
        parent: Url,
        child: Url,
        #[source]
        source: Box<NavigatorError>,
    },
}

impl NavigatorError {
    /// The innermost error, past any composite nesting.
    pub fn root_cause(&self) -> &NavigatorError {
        match self {
            NavigatorError::ChildFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// A discovered descriptor file.
#[derive(Debug, Clone)]
pub struct Descriptor {
    pub filename: String,
    pub file: CachedFile,
}

impl Descriptor {
    pub fn url(&self) -> &Url {
        self.file.url()
    }

    /// The descriptor document, unpacked from its jar when needed.
    pub fn read(&self) -> Result<Vec<u8>, ParseError> {
        let inner = inner_document_name(&self.filename);
        read_descriptor(self.file.path(), inner.as_deref(), self.url().as_str())
    }

    /// The parsed descriptor document.
    pub fn parse(&self) -> Result<Element, ParseError> {
        parse_document(&self.read()?, self.url().as_str())
    }
}

/// The resolved state of one repository location.
#[derive(Debug, Clone)]
pub struct Location {
    url: Url,
    concern: Concern,
    kind: RepositoryKind,
    descriptor: Descriptor,
    children: Vec<Url>,
    atomic: bool,
    remembered: bool,
}

impl Location {
    /// Repository directory URL (always ends with `/`).
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn concern(&self) -> Concern {
        self.concern
    }

    pub fn kind(&self) -> &RepositoryKind {
        &self.kind
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Child repository URLs of a composite; empty otherwise.
    pub fn children(&self) -> &[Url] {
        &self.children
    }

    /// Whether a failing child fails this composite.
    pub fn atomic(&self) -> bool {
        self.atomic
    }

    /// Whether kind and children came from the discovery memo.
    pub fn is_remembered(&self) -> bool {
        self.remembered
    }
}

/// One node of a flattened repository tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub depth: usize,
    pub url: Url,
    pub kind: Option<RepositoryKind>,
    pub filename: Option<String>,
    /// Set when a non-atomic composite skipped this child.
    pub error: Option<String>,
}

/// Result of expanding a root into its leaves.
#[derive(Debug, Default)]
pub struct Flattened {
    /// Leaf locations in depth-first discovery order, each reported once.
    pub leaves: Vec<Location>,
    /// Every visited node, in visiting order.
    pub nodes: Vec<TreeNode>,
}

/// Navigates one descriptor concern through the descriptor cache.
pub struct Navigator<'a> {
    cache: &'a DescriptorCache,
    concern: Concern,
}

impl<'a> Navigator<'a> {
    pub fn new(cache: &'a DescriptorCache, concern: Concern) -> Self {
        Navigator { cache, concern }
    }

    pub fn concern(&self) -> Concern {
        self.concern
    }

    /// Resolve a single location to its descriptor and kind.
    pub fn navigate(&self, url: &Url) -> Result<Location, NavigatorError> {
        let url = directory_url(url);
        let store = self.cache.metadata(&url);
        let prefix = self.concern.prefix();

        if let Some(filename) = store.get(prefix, "filename") {
            let descriptor_url = join(&url, &filename)?;
            match self.cache.fetch(&descriptor_url)? {
                FetchOutcome::Cached(file) => {
                    tracing::debug!("{}: using remembered {} descriptor {}", url, self.concern, filename);
                    return self.discover(url, &store, Descriptor { filename, file }, true);
                }
                FetchOutcome::NotFound => {
                    tracing::debug!("{}: remembered descriptor {} is gone, searching again", url, filename);
                    warn_on_memo_error(&url, store.clear(prefix));
                }
            }
        }

        let candidates = self.candidates(&url)?;
        for filename in &candidates {
            let descriptor_url = join(&url, filename)?;
            tracing::debug!("trying {}", descriptor_url);
            if let FetchOutcome::Cached(file) = self.cache.fetch(&descriptor_url)? {
                let descriptor = Descriptor {
                    filename: filename.clone(),
                    file,
                };
                return self.discover(url, &store, descriptor, false);
            }
        }

        Err(NavigatorError::RepositoryNotFound {
            url,
            concern: self.concern,
            tried: candidates,
        })
    }

    /// Expand `root` into its leaf locations.
    ///
    /// Composites are expanded depth-first in child order. A URL already
    /// expanded during this call is skipped, which terminates cycles and
    /// reports shared children once.
    pub fn flatten(&self, root: &Url) -> Result<Flattened, NavigatorError> {
        let mut out = Flattened::default();
        let mut visited = HashSet::new();
        self.collect(&directory_url(root), 0, &mut visited, &mut out)?;
        Ok(out)
    }

    /// Leaf locations under `root`.
    pub fn leaves(&self, root: &Url) -> Result<Vec<Location>, NavigatorError> {
        Ok(self.flatten(root)?.leaves)
    }

    /// Forget the discovery memo of `url` for this concern.
    pub fn forget(&self, url: &Url) -> Result<(), MetadataError> {
        self.cache
            .metadata(&directory_url(url))
            .clear(self.concern.prefix())
    }

    fn collect(
        &self,
        url: &Url,
        depth: usize,
        visited: &mut HashSet<Url>,
        out: &mut Flattened,
    ) -> Result<(), NavigatorError> {
        if !visited.insert(url.clone()) {
            tracing::debug!("{}: already expanded, skipping", url);
            return Ok(());
        }

        let location = self.navigate(url)?;
        out.nodes.push(TreeNode {
            depth,
            url: location.url.clone(),
            kind: Some(location.kind.clone()),
            filename: Some(location.descriptor.filename.clone()),
            error: None,
        });

        match location.kind.clone() {
            RepositoryKind::Composite => {
                for child in &location.children {
                    if let Err(e) = self.collect(child, depth + 1, visited, out) {
                        if location.atomic {
                            return Err(NavigatorError::ChildFailed {
                                parent: location.url.clone(),
                                child: child.clone(),
                                source: Box::new(e),
                            });
                        }
                        tracing::warn!("{}: skipping child {}: {}", location.url, child, e);
                        out.nodes.push(TreeNode {
                            depth: depth + 1,
                            url: child.clone(),
                            kind: None,
                            filename: None,
                            error: Some(e.to_string()),
                        });
                    }
                }
            }
            RepositoryKind::Leaf => out.leaves.push(location),
            RepositoryKind::Unknown(ty) => {
                tracing::warn!(
                    "{}: ignoring {} repository of unknown type '{}'",
                    location.url,
                    self.concern,
                    ty
                );
            }
        }

        Ok(())
    }

    fn candidates(&self, url: &Url) -> Result<Vec<String>, NavigatorError> {
        let index_url = join(url, INDEX_FILE)?;
        let index = match self.cache.fetch(&index_url) {
            Ok(FetchOutcome::Cached(file)) => match file.read_bytes() {
                Ok(bytes) => RepositoryIndex::parse(&String::from_utf8_lossy(&bytes)),
                Err(e) => {
                    tracing::warn!("{}: unreadable {}: {}", url, INDEX_FILE, e);
                    RepositoryIndex::default()
                }
            },
            Ok(FetchOutcome::NotFound) => RepositoryIndex::default(),
            Err(e) => {
                tracing::warn!("{}: ignoring {}: {}", url, INDEX_FILE, e);
                RepositoryIndex::default()
            }
        };
        Ok(index.candidates(self.concern))
    }

    fn discover(
        &self,
        url: Url,
        store: &Arc<MetadataStore>,
        descriptor: Descriptor,
        remembered: bool,
    ) -> Result<Location, NavigatorError> {
        let prefix = self.concern.prefix();
        let modified = descriptor
            .file
            .modified()
            .map(format_modified)
            .unwrap_or_default();

        if remembered && !modified.is_empty() && store.get(prefix, "modified").as_deref() == Some(modified.as_str()) {
            if let Some(location) = self.from_memo(&url, store, &descriptor) {
                return Ok(location);
            }
        }

        let location_name = descriptor.url().as_str().to_string();
        let bytes = descriptor.read()?;
        let root = parse_root(&bytes, &location_name)?;
        let kind = RepositoryKind::from_type(self.concern, root.attr("type"));

        let (children, atomic) = match kind {
            RepositoryKind::Composite => {
                let document = parse_document(&bytes, &location_name)?;
                let composite = CompositeDescriptor::from_element(&document);
                (composite.child_urls(&url, &location_name)?, composite.atomic_loading())
            }
            _ => (Vec::new(), true),
        };

        tracing::debug!("{}: {} {} via {}", url, self.concern, kind, descriptor.filename);
        let location = Location {
            url,
            concern: self.concern,
            kind,
            descriptor,
            children,
            atomic,
            remembered: false,
        };
        self.remember(store, &location, modified);
        Ok(location)
    }

    fn from_memo(&self, url: &Url, store: &MetadataStore, descriptor: &Descriptor) -> Option<Location> {
        let prefix = self.concern.prefix();
        let kind = RepositoryKind::from_memo(&store.get(prefix, "kind")?)?;

        let children = match kind {
            RepositoryKind::Composite => {
                let stored: Vec<String> = store.get_object(prefix, "children")?;
                stored
                    .iter()
                    .map(|s| Url::parse(s).ok())
                    .collect::<Option<Vec<_>>>()?
            }
            _ => Vec::new(),
        };

        Some(Location {
            url: url.clone(),
            concern: self.concern,
            kind,
            descriptor: descriptor.clone(),
            children,
            atomic: store.get(prefix, "atomic").as_deref() != Some("false"),
            remembered: true,
        })
    }

    fn remember(&self, store: &MetadataStore, location: &Location, modified: String) {
        let prefix = self.concern.prefix();
        let result = store
            .set_all(
                prefix,
                [
                    ("filename", location.descriptor.filename.clone()),
                    ("kind", location.kind.to_memo()),
                    ("location", location.descriptor.url().to_string()),
                    ("modified", modified),
                    ("atomic", location.atomic.to_string()),
                ],
            )
            .and_then(|()| {
                let children: Vec<String> = location.children.iter().map(Url::to_string).collect();
                store.set_object(prefix, "children", &children)
            });
        warn_on_memo_error(&location.url, result);
    }
}

impl fmt::Debug for Navigator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("concern", &self.concern)
            .finish()
    }
}

fn join(base: &Url, name: &str) -> Result<Url, NavigatorError> {
    base.join(name).map_err(|e| {
        NavigatorError::Parse(ParseError::DescriptorCorrupt {
            location: base.to_string(),
            reason: format!("cannot resolve '{}': {}", name, e),
        })
    })
}

fn format_modified(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339()
}

fn warn_on_memo_error(url: &Url, result: Result<(), MetadataError>) {
    if let Err(e) = result {
        tracing::warn!("{}: could not update discovery memo: {}", url, e);
    }
}
