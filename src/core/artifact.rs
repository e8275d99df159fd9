//! Artifact keys and their downloadable locations.

use std::fmt;

use url::Url;

use crate::core::version::Version;

/// Classifier of a downloadable artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Classifier {
    /// `osgi.bundle`
    Bundle,
    /// `org.eclipse.update.feature`
    Feature,
    /// `binary`
    Binary,
    Other(String),
}

impl Classifier {
    pub const BUNDLE: &'static str = "osgi.bundle";
    pub const FEATURE: &'static str = "org.eclipse.update.feature";
    pub const BINARY: &'static str = "binary";

    /// Parse a classifier string. Never fails; unknown values are kept.
    pub fn parse(s: &str) -> Self {
        match s {
            Self::BUNDLE => Classifier::Bundle,
            Self::FEATURE => Classifier::Feature,
            Self::BINARY => Classifier::Binary,
            other => Classifier::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Classifier::Bundle => Self::BUNDLE,
            Classifier::Feature => Self::FEATURE,
            Classifier::Binary => Self::BINARY,
            Classifier::Other(s) => s,
        }
    }
}

impl fmt::Display for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a downloadable byte stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Artifact {
    pub id: String,
    pub version: Version,
    pub classifier: Classifier,
}

impl Artifact {
    pub fn new(id: impl Into<String>, version: Version, classifier: Classifier) -> Self {
        Artifact {
            id: id.into(),
            version,
            classifier,
        }
    }

    pub fn bundle(id: impl Into<String>, version: Version) -> Self {
        Artifact::new(id, version, Classifier::Bundle)
    }

    pub fn feature(id: impl Into<String>, version: Version) -> Self {
        Artifact::new(id, version, Classifier::Feature)
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {}", self.classifier, self.id, self.version)
    }
}

/// An artifact together with the URL its bytes can be downloaded from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactLocation {
    pub artifact: Artifact,
    pub location: Url,
}

impl ArtifactLocation {
    pub fn new(artifact: Artifact, location: Url) -> Self {
        ArtifactLocation { artifact, location }
    }

    pub fn id(&self) -> &str {
        &self.artifact.id
    }

    pub fn version(&self) -> &Version {
        &self.artifact.version
    }

    pub fn classifier(&self) -> &Classifier {
        &self.artifact.classifier
    }
}

impl fmt::Display for ArtifactLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.artifact, self.location)
    }
}
