//! Feature descriptors (`feature.xml`).
//!
//! A feature artifact is a jar whose `feature.xml` lists the plugins and
//! nested features it bundles. Some repositories serve the bare document.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::core::{Version, VersionRange};
use crate::parser::xml::{parse_document, read_entry, Element};
use crate::parser::ParseError;

const FEATURE_DOCUMENT: &str = "feature.xml";

/// A `<plugin>` or `<includes>` entry of a feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureEntry {
    pub id: String,
    pub version: Version,
    pub optional: bool,
    pub os: Option<String>,
    pub ws: Option<String>,
    pub arch: Option<String>,
}

impl FeatureEntry {
    fn from_element(element: &Element) -> Self {
        let platform = |name: &str| {
            element
                .attr_opt(name)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        FeatureEntry {
            id: element.attr("id").to_string(),
            version: Version::parse_lenient(element.attr("version")),
            optional: element.attr("optional") == "true",
            os: platform("os"),
            ws: platform("ws"),
            arch: platform("arch"),
        }
    }

    /// `0.0.0` (or no version) selects the highest available, anything else
    /// is an exact match.
    pub fn range(&self) -> VersionRange {
        if self.version.is_unspecified() {
            VersionRange::any()
        } else {
            VersionRange::exact(self.version.clone())
        }
    }

    /// Whether the entry's platform attributes accept `environment`.
    ///
    /// An empty environment accepts every entry.
    pub fn applies_to(&self, environment: &BTreeMap<String, String>) -> bool {
        if environment.is_empty() {
            return true;
        }

        [("osgi.os", &self.os), ("osgi.ws", &self.ws), ("osgi.arch", &self.arch)]
            .into_iter()
            .all(|(key, allowed)| match (allowed, environment.get(key)) {
                (Some(allowed), Some(actual)) => allowed.split(',').any(|v| v.trim() == actual),
                _ => true,
            })
    }
}

/// Parsed feature descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureDescriptor {
    pub id: String,
    pub version: Version,
    pub plugins: Vec<FeatureEntry>,
    pub includes: Vec<FeatureEntry>,
}

/// Parse a bare `feature.xml` document.
pub fn parse_feature(bytes: &[u8], location: &str) -> Result<FeatureDescriptor, ParseError> {
    let root = parse_document(bytes, location)?;
    if root.name != "feature" {
        return Err(ParseError::DescriptorCorrupt {
            location: location.to_string(),
            reason: format!("expected <feature> root, found <{}>", root.name),
        });
    }

    Ok(FeatureDescriptor {
        id: root.attr("id").to_string(),
        version: Version::parse_lenient(root.attr("version")),
        plugins: root
            .children_named("plugin")
            .map(FeatureEntry::from_element)
            .collect(),
        includes: root
            .children_named("includes")
            .map(FeatureEntry::from_element)
            .collect(),
    })
}

/// Read a feature descriptor from a feature jar, or from a bare document
/// when the file is not an archive.
pub fn read_feature(path: &Path, location: &str) -> Result<FeatureDescriptor, ParseError> {
    let io_error = |e: std::io::Error| ParseError::DescriptorCorrupt {
        location: location.to_string(),
        reason: e.to_string(),
    };

    let file = File::open(path).map_err(io_error)?;
    match zip::ZipArchive::new(file) {
        Ok(mut archive) => {
            let bytes = read_entry(&mut archive, FEATURE_DOCUMENT, location)?.ok_or_else(|| {
                ParseError::DescriptorCorrupt {
                    location: location.to_string(),
                    reason: format!("feature jar has no {}", FEATURE_DOCUMENT),
                }
            })?;
            parse_feature(&bytes, location)
        }
        Err(_) => {
            let mut bytes = Vec::new();
            File::open(path)
                .and_then(|mut f| f.read_to_end(&mut bytes))
                .map_err(io_error)?;
            parse_feature(&bytes, location)
        }
    }
}
