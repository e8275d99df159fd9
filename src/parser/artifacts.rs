//! Artifact descriptor (`artifacts.xml`) parser.
//!
//! A simple artifact repository lists its download layout as an ordered set
//! of mapping rules, each an LDAP filter over the artifact's attributes and
//! an output template. The first matching rule decides an artifact's URL.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use url::Url;

use crate::core::{Artifact, ArtifactIndex, ArtifactLocation, Classifier, Filter, Version};
use crate::parser::xml::Element;
use crate::parser::ParseError;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"));

/// Synthetic template attribute holding the repository base URL.
pub const REPO_URL: &str = "repoUrl";

/// One `<rule filter output/>` entry.
#[derive(Debug, Clone)]
pub struct MappingRule {
    pub filter: Filter,
    pub output: String,
}

impl MappingRule {
    /// Substitute `${name}` placeholders from `attributes`.
    ///
    /// Unknown placeholders are left in place.
    pub fn render(&self, attributes: &[(String, String)]) -> String {
        PLACEHOLDER
            .replace_all(&self.output, |caps: &Captures<'_>| {
                let name = &caps[1];
                attributes
                    .iter()
                    .find(|(k, _)| k == name)
                    .map(|(_, v)| v.clone())
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

/// Read the mapping rules of an artifact repository, in declaration order.
pub fn parse_rules(root: &Element, location: &str) -> Result<Vec<MappingRule>, ParseError> {
    root.list("mappings", "rule")
        .map(|rule| {
            let filter = Filter::parse(rule.attr("filter")).map_err(|e| ParseError::DescriptorCorrupt {
                location: location.to_string(),
                reason: format!("invalid mapping rule filter: {}", e),
            })?;
            Ok(MappingRule {
                filter,
                output: rule.attr("output").to_string(),
            })
        })
        .collect()
}

/// Parse every `<artifact>` of an artifact repository into download locations.
///
/// `base` is the repository's directory URL and feeds `${repoUrl}`.
pub fn parse_artifacts(root: &Element, base: &Url, location: &str) -> Result<ArtifactIndex, ParseError> {
    let rules = parse_rules(root, location)?;
    let repo_url = base.as_str().trim_end_matches('/').to_string();

    let mut index = ArtifactIndex::new();
    for element in root.list("artifacts", "artifact") {
        let artifact = Artifact::new(
            element.attr("id"),
            Version::parse_lenient(element.attr("version")),
            Classifier::parse(element.attr("classifier")),
        );

        let attributes = attributes_of(element, &repo_url);
        let rule = rules
            .iter()
            .find(|rule| rule.filter.matches_pairs(&attributes))
            .ok_or_else(|| ParseError::NoOutputMapping {
                location: location.to_string(),
                artifact: artifact.to_string(),
            })?;

        let rendered = rule.render(&attributes);
        let url = Url::parse(&rendered)
            .or_else(|_| base.join(&rendered))
            .map_err(|e| ParseError::DescriptorCorrupt {
                location: location.to_string(),
                reason: format!("artifact {} maps to invalid URL '{}': {}", artifact, rendered, e),
            })?;

        if !index.insert(ArtifactLocation::new(artifact, url)) {
            tracing::debug!("{}: duplicate artifact {}", location, element.attr("id"));
        }
    }

    tracing::debug!("{}: parsed {} artifacts", location, index.len());
    Ok(index)
}

/// Attributes visible to rule filters and templates.
fn attributes_of(element: &Element, repo_url: &str) -> Vec<(String, String)> {
    let mut attributes: Vec<(String, String)> = element.attributes.clone();
    for property in element.list("properties", "property") {
        let name = property.attr("name");
        if !attributes.iter().any(|(k, _)| k == name) {
            attributes.push((name.to_string(), property.attr("value").to_string()));
        }
    }
    for required in ["id", "version", "classifier"] {
        if !attributes.iter().any(|(k, _)| k == required) {
            attributes.push((required.to_string(), String::new()));
        }
    }
    attributes.push((REPO_URL.to_string(), repo_url.to_string()));
    attributes
}
