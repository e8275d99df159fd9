//! Repository root layout: concerns, kinds and the `p2.index` resource.

use std::fmt;
use std::str::FromStr;

/// Name of the optional index-properties resource at a repository root.
pub const INDEX_FILE: &str = "p2.index";

/// Composite property that controls whether a failing child fails the parent.
pub const ATOMIC_LOADING_PROPERTY: &str = "p2.atomic.composite.loading";

const METADATA_CANDIDATES: &[&str] = &[
    "compositeContent.jar",
    "compositeContent.xml",
    "content.jar",
    "content.xml",
];

const ARTIFACT_CANDIDATES: &[&str] = &[
    "compositeArtifacts.jar",
    "compositeArtifacts.xml",
    "artifacts.jar",
    "artifacts.xml",
];

/// Which of the two descriptor trees at a root is being navigated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Concern {
    /// Units with capabilities and requirements.
    Metadata,
    /// Download locations.
    Artifacts,
}

impl Concern {
    pub const ALL: [Concern; 2] = [Concern::Metadata, Concern::Artifacts];

    /// Key prefix in a URL's metadata store.
    pub fn prefix(&self) -> &'static str {
        match self {
            Concern::Metadata => "metadata.",
            Concern::Artifacts => "artifacts.",
        }
    }

    /// Key listing candidate filenames in `p2.index`.
    pub fn index_key(&self) -> &'static str {
        match self {
            Concern::Metadata => "metadata.repository.factory.order",
            Concern::Artifacts => "artifact.repository.factory.order",
        }
    }

    pub fn default_candidates(&self) -> Vec<String> {
        let names = match self {
            Concern::Metadata => METADATA_CANDIDATES,
            Concern::Artifacts => ARTIFACT_CANDIDATES,
        };
        names.iter().map(|s| s.to_string()).collect()
    }

    /// Root `type` of a composite descriptor.
    pub fn composite_type(&self) -> &'static str {
        match self {
            Concern::Metadata => {
                "org.eclipse.equinox.internal.p2.metadata.repository.CompositeMetadataRepository"
            }
            Concern::Artifacts => {
                "org.eclipse.equinox.internal.p2.artifact.repository.CompositeArtifactRepository"
            }
        }
    }

    /// Root `type` of a simple (leaf) descriptor.
    pub fn simple_type(&self) -> &'static str {
        match self {
            Concern::Metadata => "org.eclipse.equinox.internal.p2.metadata.repository.LocalMetadataRepository",
            Concern::Artifacts => "org.eclipse.equinox.p2.artifact.repository.simpleRepository",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Concern::Metadata => "metadata",
            Concern::Artifacts => "artifacts",
        }
    }
}

impl fmt::Display for Concern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Concern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "metadata" | "content" => Ok(Concern::Metadata),
            "artifacts" | "artifact" => Ok(Concern::Artifacts),
            _ => Err(format!(
                "unknown concern '{}' (expected 'metadata' or 'artifacts')",
                s
            )),
        }
    }
}

/// What a discovered descriptor turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryKind {
    Composite,
    Leaf,
    Unknown(String),
}

impl RepositoryKind {
    /// Classify a root `type` attribute.
    pub fn from_type(concern: Concern, ty: &str) -> Self {
        if ty == concern.composite_type() {
            RepositoryKind::Composite
        } else if ty == concern.simple_type() {
            RepositoryKind::Leaf
        } else {
            RepositoryKind::Unknown(ty.to_string())
        }
    }

    /// Encoding used in the discovery memo.
    pub fn to_memo(&self) -> String {
        match self {
            RepositoryKind::Composite => "composite".to_string(),
            RepositoryKind::Leaf => "leaf".to_string(),
            RepositoryKind::Unknown(ty) => format!("unknown:{}", ty),
        }
    }

    pub fn from_memo(s: &str) -> Option<Self> {
        match s {
            "composite" => Some(RepositoryKind::Composite),
            "leaf" => Some(RepositoryKind::Leaf),
            other => other
                .strip_prefix("unknown:")
                .map(|ty| RepositoryKind::Unknown(ty.to_string())),
        }
    }
}

impl fmt::Display for RepositoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryKind::Composite => f.write_str("composite"),
            RepositoryKind::Leaf => f.write_str("leaf"),
            RepositoryKind::Unknown(ty) => write!(f, "unknown ({})", ty),
        }
    }
}

/// Parsed `p2.index` resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryIndex {
    metadata: Option<Vec<String>>,
    artifacts: Option<Vec<String>>,
}

impl RepositoryIndex {
    /// Parse the properties text of a `p2.index` file.
    pub fn parse(text: &str) -> Self {
        let mut index = RepositoryIndex::default();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let Some((key, value)) = line.split_once(['=', ':']) else {
                continue;
            };

            match key.trim() {
                k if k == Concern::Metadata.index_key() => {
                    index.metadata = Some(parse_factory_order(value));
                }
                k if k == Concern::Artifacts.index_key() => {
                    index.artifacts = Some(parse_factory_order(value));
                }
                "version" => {}
                other => tracing::debug!("ignoring p2.index key '{}'", other),
            }
        }

        index
    }

    /// Candidate filenames for a concern, falling back to the defaults.
    pub fn candidates(&self, concern: Concern) -> Vec<String> {
        let listed = match concern {
            Concern::Metadata => self.metadata.as_ref(),
            Concern::Artifacts => self.artifacts.as_ref(),
        };
        match listed {
            Some(names) => names.clone(),
            None => concern.default_candidates(),
        }
    }
}

/// Expand a factory-order value into candidate filenames.
///
/// Each `name.xml` entry yields the packed `name.jar` before the bare
/// document. Entries after a `!` terminator are not consulted.
fn parse_factory_order(value: &str) -> Vec<String> {
    let mut names = Vec::new();

    for token in value.split(',') {
        let token = token.trim();
        let (name, stop) = match token
            .strip_suffix("\\!")
            .or_else(|| token.strip_suffix('!'))
        {
            Some(name) => (name.trim(), true),
            None => (token, false),
        };

        if name.ends_with(".xz") {
            tracing::debug!("skipping unsupported compressed candidate '{}'", name);
        } else if let Some(stem) = name.strip_suffix(".xml") {
            for candidate in [format!("{}.jar", stem), name.to_string()] {
                if !names.contains(&candidate) {
                    names.push(candidate);
                }
            }
        } else if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }

        if stop {
            break;
        }
    }

    names
}

/// Name of the document packed inside a `.jar` candidate.
pub fn inner_document_name(filename: &str) -> Option<String> {
    filename
        .strip_suffix(".jar")
        .map(|stem| format!("{}.xml", stem))
}
