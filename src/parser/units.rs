//! Unit descriptor (`content.xml`) parser.

use crate::core::{Artifact, Classifier, Filter, Provides, Requires, Unit, Version, VersionRange};
use crate::parser::xml::Element;

/// Parse every `<unit>` of a metadata repository document.
///
/// Unknown children are ignored. Malformed versions and filters degrade to
/// the unspecified version and no filter respectively.
pub fn parse_units(root: &Element, location: &str) -> Vec<Unit> {
    let units: Vec<Unit> = root
        .list("units", "unit")
        .map(|element| parse_unit(element, location))
        .collect();

    tracing::debug!("{}: parsed {} units", location, units.len());
    units
}

fn parse_unit(element: &Element, location: &str) -> Unit {
    let id = element.attr("id");
    let mut builder = Unit::builder(id, Version::parse_lenient(element.attr("version")));

    for property in element.list("properties", "property") {
        builder = builder.property(property.attr("name"), property.attr("value"));
    }

    for provided in element.list("provides", "provided") {
        builder = builder.provides(Provides::new(
            provided.attr("namespace"),
            provided.attr("name"),
            Version::parse_lenient(provided.attr("version")),
        ));
    }

    if let Some(requires) = element.child("requires") {
        for required in &requires.children {
            match required.name.as_str() {
                "required" | "requiredProperties" => {
                    builder = builder.requires(parse_requirement(required, id, location));
                }
                other => tracing::debug!("{}: ignoring <{}> in unit {}", location, other, id),
            }
        }
    }

    builder = builder.filter(element.child("filter").and_then(|f| parse_filter(&f.text, id, location)));

    for artifact in element.list("artifacts", "artifact") {
        builder = builder.artifact(Artifact::new(
            artifact.attr("id"),
            Version::parse_lenient(artifact.attr("version")),
            Classifier::parse(artifact.attr("classifier")),
        ));
    }

    builder.build()
}

fn parse_requirement(element: &Element, unit_id: &str, location: &str) -> Requires {
    let range = VersionRange::parse_lenient(element.attr("range"));

    // New-style requirements express optionality as `min='0'`.
    let optional = element.attr("optional") == "true" || element.attr("min") == "0";
    let greedy = element.attr("greedy") != "false";

    let filter = element
        .child("filter")
        .map(|f| f.text.as_str())
        .or_else(|| element.attr_opt("filter"))
        .and_then(|text| parse_filter(text, unit_id, location));

    Requires::new(element.attr("namespace"), element.attr("name"), range)
        .optional(optional)
        .greedy(greedy)
        .with_match_rule(element.attr("match"))
        .with_filter(filter)
}

fn parse_filter(text: &str, unit_id: &str, location: &str) -> Option<Filter> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match Filter::parse(text) {
        Ok(filter) => Some(filter),
        Err(e) => {
            tracing::warn!("{}: ignoring malformed filter on {}: {}", location, unit_id, e);
            None
        }
    }
}
