//! Test fixtures that write p2 repositories to disk.
//!
//! Fixtures produce the same documents a real repository publishes
//! (`content.xml`, `artifacts.xml`, composite descriptors, feature jars),
//! optionally packed into jars, so tests can navigate them through `file:`
//! URLs.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use url::Url;

use crate::core::{Classifier, UNIT_NAMESPACE};
use crate::sources::index::Concern;

/// Escape a value for an XML attribute or text node.
pub fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\'', "&apos;")
        .replace('"', "&quot;")
}

/// Description of one unit written into `content.xml`.
#[derive(Debug, Clone)]
pub struct UnitSpec {
    pub id: String,
    pub version: String,
    pub provides: Vec<(String, String, String)>,
    pub requires: Vec<RequireSpec>,
    pub artifacts: Vec<(String, String, String)>,
    pub filter: Option<String>,
}

/// Description of one `<required>` entry.
#[derive(Debug, Clone)]
pub struct RequireSpec {
    pub namespace: String,
    pub name: String,
    pub range: String,
    pub optional: bool,
    pub filter: Option<String>,
}

impl UnitSpec {
    /// A unit providing its own IU capability and a bundle artifact of the
    /// same id and version.
    pub fn new(id: &str, version: &str) -> Self {
        UnitSpec {
            id: id.to_string(),
            version: version.to_string(),
            provides: vec![(UNIT_NAMESPACE.to_string(), id.to_string(), version.to_string())],
            requires: Vec::new(),
            artifacts: vec![(Classifier::BUNDLE.to_string(), id.to_string(), version.to_string())],
            filter: None,
        }
    }

    /// Drop the default bundle artifact.
    pub fn no_artifact(mut self) -> Self {
        self.artifacts.clear();
        self
    }

    pub fn artifact(mut self, classifier: &str, id: &str, version: &str) -> Self {
        self.artifacts
            .push((classifier.to_string(), id.to_string(), version.to_string()));
        self
    }

    pub fn provides(mut self, namespace: &str, name: &str, version: &str) -> Self {
        self.provides
            .push((namespace.to_string(), name.to_string(), version.to_string()));
        self
    }

    pub fn requires(mut self, namespace: &str, name: &str, range: &str) -> Self {
        self.requires.push(RequireSpec {
            namespace: namespace.to_string(),
            name: name.to_string(),
            range: range.to_string(),
            optional: false,
            filter: None,
        });
        self
    }

    pub fn requires_unit(self, name: &str, range: &str) -> Self {
        self.requires(UNIT_NAMESPACE, name, range)
    }

    pub fn requires_bundle(self, name: &str, range: &str) -> Self {
        self.requires(Classifier::BUNDLE, name, range)
    }

    /// Mark the most recently added requirement optional.
    pub fn optional(mut self) -> Self {
        if let Some(last) = self.requires.last_mut() {
            last.optional = true;
        }
        self
    }

    /// Attach a filter to the most recently added requirement.
    pub fn requirement_filter(mut self, filter: &str) -> Self {
        if let Some(last) = self.requires.last_mut() {
            last.filter = Some(filter.to_string());
        }
        self
    }

    pub fn filter(mut self, filter: &str) -> Self {
        self.filter = Some(filter.to_string());
        self
    }

    fn to_xml(&self) -> String {
        let mut xml = format!(
            "    <unit id='{}' version='{}'>\n",
            escape(&self.id),
            escape(&self.version)
        );

        xml.push_str(&format!("      <provides size='{}'>\n", self.provides.len()));
        for (namespace, name, version) in &self.provides {
            xml.push_str(&format!(
                "        <provided namespace='{}' name='{}' version='{}'/>\n",
                escape(namespace),
                escape(name),
                escape(version)
            ));
        }
        xml.push_str("      </provides>\n");

        if !self.requires.is_empty() {
            xml.push_str(&format!("      <requires size='{}'>\n", self.requires.len()));
            for req in &self.requires {
                let optional = if req.optional { " optional='true'" } else { "" };
                match &req.filter {
                    Some(filter) => xml.push_str(&format!(
                        "        <required namespace='{}' name='{}' range='{}'{}>\n          <filter>{}</filter>\n        </required>\n",
                        escape(&req.namespace),
                        escape(&req.name),
                        escape(&req.range),
                        optional,
                        escape(filter)
                    )),
                    None => xml.push_str(&format!(
                        "        <required namespace='{}' name='{}' range='{}'{}/>\n",
                        escape(&req.namespace),
                        escape(&req.name),
                        escape(&req.range),
                        optional
                    )),
                }
            }
            xml.push_str("      </requires>\n");
        }

        if let Some(filter) = &self.filter {
            xml.push_str(&format!("      <filter>{}</filter>\n", escape(filter)));
        }

        if !self.artifacts.is_empty() {
            xml.push_str(&format!("      <artifacts size='{}'>\n", self.artifacts.len()));
            for (classifier, id, version) in &self.artifacts {
                xml.push_str(&format!(
                    "        <artifact classifier='{}' id='{}' version='{}'/>\n",
                    escape(classifier),
                    escape(id),
                    escape(version)
                ));
            }
            xml.push_str("      </artifacts>\n");
        }

        xml.push_str("    </unit>\n");
        xml
    }
}

/// Description of a feature jar.
#[derive(Debug, Clone)]
pub struct FeatureSpec {
    pub id: String,
    pub version: String,
    pub plugins: Vec<(String, String)>,
    pub includes: Vec<(String, String, bool)>,
}

impl FeatureSpec {
    pub fn new(id: &str, version: &str) -> Self {
        FeatureSpec {
            id: id.to_string(),
            version: version.to_string(),
            plugins: Vec::new(),
            includes: Vec::new(),
        }
    }

    pub fn plugin(mut self, id: &str, version: &str) -> Self {
        self.plugins.push((id.to_string(), version.to_string()));
        self
    }

    pub fn includes(mut self, id: &str, version: &str, optional: bool) -> Self {
        self.includes
            .push((id.to_string(), version.to_string(), optional));
        self
    }

    /// The `feature.xml` document.
    pub fn feature_xml(&self) -> String {
        let mut xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<feature id=\"{}\" version=\"{}\">\n",
            escape(&self.id),
            escape(&self.version)
        );
        for (id, version, optional) in &self.includes {
            xml.push_str(&format!(
                "   <includes id=\"{}\" version=\"{}\" optional=\"{}\"/>\n",
                escape(id),
                escape(version),
                optional
            ));
        }
        for (id, version) in &self.plugins {
            xml.push_str(&format!(
                "   <plugin id=\"{}\" version=\"{}\" unpack=\"false\"/>\n",
                escape(id),
                escape(version)
            ));
        }
        xml.push_str("</feature>\n");
        xml
    }
}

/// A simple (leaf) repository written to a directory.
#[derive(Debug, Clone)]
pub struct RepoFixture {
    root: PathBuf,
    units: Vec<UnitSpec>,
    bundles: Vec<(String, String)>,
    features: Vec<FeatureSpec>,
    packed: bool,
    artifacts: bool,
}

impl RepoFixture {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        RepoFixture {
            root: root.into(),
            units: Vec::new(),
            bundles: Vec::new(),
            features: Vec::new(),
            packed: false,
            artifacts: true,
        }
    }

    /// Add a bundle unit requiring the given unit ids (any version).
    pub fn unit(self, id: &str, version: &str, requires: &[&str]) -> Self {
        let spec = requires
            .iter()
            .fold(UnitSpec::new(id, version), |spec, req| spec.requires_unit(req, "0.0.0"));
        self.unit_spec(spec)
    }

    pub fn unit_spec(mut self, spec: UnitSpec) -> Self {
        self.units.push(spec);
        self
    }

    /// Add a bundle artifact that no unit references.
    pub fn bundle(mut self, id: &str, version: &str) -> Self {
        self.bundles.push((id.to_string(), version.to_string()));
        self
    }

    /// Add a feature jar plus the `<id>.feature.jar` unit that references it.
    pub fn feature(mut self, feature: FeatureSpec) -> Self {
        let unit = UnitSpec::new(&format!("{}.feature.jar", feature.id), &feature.version)
            .no_artifact()
            .artifact(Classifier::FEATURE, &feature.id, &feature.version);
        self.units.push(unit);
        self.features.push(feature);
        self
    }

    /// Publish `content.jar`/`artifacts.jar` instead of bare documents.
    pub fn packed(mut self) -> Self {
        self.packed = true;
        self
    }

    /// Do not publish an artifact descriptor.
    pub fn without_artifacts(mut self) -> Self {
        self.artifacts = false;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn url(&self) -> Url {
        Url::from_directory_path(&self.root).unwrap()
    }

    pub fn content_xml(&self) -> String {
        let mut xml = String::from(
            "<?xml version='1.0' encoding='UTF-8'?>\n<?metadataRepository version='1.1.0'?>\n",
        );
        xml.push_str(&format!(
            "<repository name='fixture' type='{}' version='1'>\n",
            Concern::Metadata.simple_type()
        ));
        xml.push_str("  <properties size='1'>\n    <property name='p2.timestamp' value='0'/>\n  </properties>\n");
        xml.push_str(&format!("  <units size='{}'>\n", self.units.len()));
        for unit in &self.units {
            xml.push_str(&unit.to_xml());
        }
        xml.push_str("  </units>\n</repository>\n");
        xml
    }

    pub fn artifacts_xml(&self) -> String {
        let mut entries: Vec<(String, String, String)> = Vec::new();
        let mut push = |entry: (String, String, String)| {
            if !entries.contains(&entry) {
                entries.push(entry);
            }
        };
        for unit in &self.units {
            for artifact in &unit.artifacts {
                push(artifact.clone());
            }
        }
        for (id, version) in &self.bundles {
            push((Classifier::BUNDLE.to_string(), id.clone(), version.clone()));
        }

        let mut xml = String::from(
            "<?xml version='1.0' encoding='UTF-8'?>\n<?artifactRepository version='1.1.0'?>\n",
        );
        xml.push_str(&format!(
            "<repository name='fixture' type='{}' version='1'>\n",
            Concern::Artifacts.simple_type()
        ));
        xml.push_str(
            "  <mappings size='3'>\n\
             \x20   <rule filter='(&amp; (classifier=osgi.bundle))' output='${repoUrl}/plugins/${id}_${version}.jar'/>\n\
             \x20   <rule filter='(&amp; (classifier=binary))' output='${repoUrl}/binary/${id}_${version}'/>\n\
             \x20   <rule filter='(&amp; (classifier=org.eclipse.update.feature))' output='${repoUrl}/features/${id}_${version}.jar'/>\n\
             \x20 </mappings>\n",
        );
        xml.push_str(&format!("  <artifacts size='{}'>\n", entries.len()));
        for (classifier, id, version) in &entries {
            xml.push_str(&format!(
                "    <artifact classifier='{}' id='{}' version='{}'/>\n",
                escape(classifier),
                escape(id),
                escape(version)
            ));
        }
        xml.push_str("  </artifacts>\n</repository>\n");
        xml
    }

    /// Write the repository and return the fixture for further use.
    pub fn write(self) -> Self {
        fs::create_dir_all(&self.root).unwrap();

        self.write_document("content", &self.content_xml());
        if self.artifacts {
            self.write_document("artifacts", &self.artifacts_xml());
        }

        if !self.features.is_empty() {
            let dir = self.root.join("features");
            fs::create_dir_all(&dir).unwrap();
            for feature in &self.features {
                write_jar(
                    &dir.join(format!("{}_{}.jar", feature.id, feature.version)),
                    "feature.xml",
                    &feature.feature_xml(),
                );
            }
        }

        self
    }

    fn write_document(&self, stem: &str, xml: &str) {
        if self.packed {
            write_jar(
                &self.root.join(format!("{}.jar", stem)),
                &format!("{}.xml", stem),
                xml,
            );
        } else {
            fs::write(self.root.join(format!("{}.xml", stem)), xml).unwrap();
        }
    }
}

/// Write a composite descriptor for `concern` listing `children`.
pub fn composite_xml(dir: &Path, concern: Concern, children: &[&str], atomic: bool) {
    fs::create_dir_all(dir).unwrap();

    let mut xml = String::from("<?xml version='1.0' encoding='UTF-8'?>\n");
    xml.push_str(&format!(
        "<repository name='composite' type='{}' version='1.0.0'>\n",
        concern.composite_type()
    ));
    xml.push_str(&format!(
        "  <properties size='1'>\n    <property name='p2.atomic.composite.loading' value='{}'/>\n  </properties>\n",
        atomic
    ));
    xml.push_str(&format!("  <children size='{}'>\n", children.len()));
    for child in children {
        xml.push_str(&format!("    <child location='{}'/>\n", escape(child)));
    }
    xml.push_str("  </children>\n</repository>\n");

    let name = match concern {
        Concern::Metadata => "compositeContent.xml",
        Concern::Artifacts => "compositeArtifacts.xml",
    };
    fs::write(dir.join(name), xml).unwrap();
}

/// Write a zip archive holding a single entry.
pub fn write_jar(path: &Path, entry: &str, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let file = File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file(entry, zip::write::SimpleFileOptions::default())
        .unwrap();
    zip.write_all(contents.as_bytes()).unwrap();
    zip.finish().unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::xml::parse_document;
    use crate::parser::{parse_artifacts, parse_units};

    #[test]
    fn test_fixture_documents_parse() {
        let repo = RepoFixture::new("unused")
            .unit("a", "1.0.0", &["b"])
            .bundle("lib", "2.0.0")
            .feature(FeatureSpec::new("f", "1.0.0").plugin("a", "1.0.0"));

        let content = parse_document(repo.content_xml().as_bytes(), "content").unwrap();
        let units = parse_units(&content, "content");
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].requires().len(), 1);

        let artifacts = parse_document(repo.artifacts_xml().as_bytes(), "artifacts").unwrap();
        let base = Url::parse("file:///repo/").unwrap();
        let index = parse_artifacts(&artifacts, &base, "artifacts").unwrap();
        assert_eq!(index.len(), 3);
    }
}
