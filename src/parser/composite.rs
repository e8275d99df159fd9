//! Composite repository descriptors.

use std::collections::BTreeMap;

use url::Url;

use crate::parser::xml::Element;
use crate::parser::ParseError;
use crate::sources::index::ATOMIC_LOADING_PROPERTY;

/// A parsed composite descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeDescriptor {
    pub name: String,
    pub ty: String,
    pub properties: BTreeMap<String, String>,
    /// Child locations exactly as written.
    pub children: Vec<String>,
}

impl CompositeDescriptor {
    pub fn from_element(root: &Element) -> Self {
        CompositeDescriptor {
            name: root.attr("name").to_string(),
            ty: root.attr("type").to_string(),
            properties: properties(root),
            children: root
                .list("children", "child")
                .map(|c| c.attr("location").trim().to_string())
                .filter(|l| !l.is_empty())
                .collect(),
        }
    }

    /// Whether a failing child fails the whole composite.
    pub fn atomic_loading(&self) -> bool {
        self.properties
            .get(ATOMIC_LOADING_PROPERTY)
            .map(|v| !v.trim().eq_ignore_ascii_case("false"))
            .unwrap_or(true)
    }

    /// Child URLs resolved against the composite's base URL.
    pub fn child_urls(&self, base: &Url, location: &str) -> Result<Vec<Url>, ParseError> {
        let base = directory_url(base);
        self.children
            .iter()
            .map(|child| {
                base.join(child).map(|u| directory_url(&u)).map_err(|e| {
                    ParseError::DescriptorCorrupt {
                        location: location.to_string(),
                        reason: format!("invalid child location '{}': {}", child, e),
                    }
                })
            })
            .collect()
    }
}

/// `<properties><property name value/></properties>` of an element.
pub fn properties(element: &Element) -> BTreeMap<String, String> {
    element
        .list("properties", "property")
        .map(|p| (p.attr("name").to_string(), p.attr("value").to_string()))
        .collect()
}

/// `url` with a trailing `/` so relative joins land beneath it.
pub fn directory_url(url: &Url) -> Url {
    if url.path().ends_with('/') {
        return url.clone();
    }
    let mut url = url.clone();
    let path = format!("{}/", url.path());
    url.set_path(&path);
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::xml::parse_document;

    const COMPOSITE: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<?compositeMetadataRepository version='1.0.0'?>
<repository name='Release' type='org.eclipse.equinox.internal.p2.metadata.repository.CompositeMetadataRepository' version='1.0.0'>
  <properties size='2'>
    <property name='p2.timestamp' value='1710000000000'/>
    <property name='p2.atomic.composite.loading' value='false'/>
  </properties>
  <children size='3'>
    <child location='202403010800'/>
    <child location='../extras/'/>
    <child location='https://mirror.example/other'/>
  </children>
</repository>"#;

    #[test]
    fn test_parse_composite() {
        let root = parse_document(COMPOSITE.as_bytes(), "test").unwrap();
        let composite = CompositeDescriptor::from_element(&root);

        assert_eq!(composite.name, "Release");
        assert_eq!(composite.children.len(), 3);
        assert!(!composite.atomic_loading());

        let base = Url::parse("https://download.example/releases/2024-03").unwrap();
        let children = composite.child_urls(&base, "test").unwrap();
        assert_eq!(
            children[0].as_str(),
            "https://download.example/releases/2024-03/202403010800/"
        );
        assert_eq!(children[1].as_str(), "https://download.example/releases/extras/");
        assert_eq!(children[2].as_str(), "https://mirror.example/other/");
    }

    #[test]
    fn test_atomic_loading_defaults_to_true() {
        let root = parse_document(b"<repository type='t'><children/></repository>", "test").unwrap();
        let composite = CompositeDescriptor::from_element(&root);
        assert!(composite.atomic_loading());
        assert!(composite.children.is_empty());
    }
}
