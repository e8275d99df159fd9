//! Descriptor parsers.
//!
//! Turns repository descriptor documents into units, artifact locations,
//! composite child lists and feature contents.

pub mod artifacts;
pub mod composite;
pub mod feature;
pub mod units;
pub mod xml;

use thiserror::Error;

pub use artifacts::{parse_artifacts, MappingRule};
pub use composite::CompositeDescriptor;
pub use feature::{read_feature, FeatureDescriptor, FeatureEntry};
pub use units::parse_units;
pub use xml::Element;

/// Errors reading a descriptor document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The document is not well-formed or not the expected shape.
    #[error("descriptor {location} is corrupt: {reason}")]
    DescriptorCorrupt { location: String, reason: String },

    /// An artifact matched none of the repository's mapping rules.
    #[error("artifact {artifact} in {location} matches no output mapping rule")]
    NoOutputMapping { location: String, artifact: String },
}

impl ParseError {
    pub fn location(&self) -> &str {
        match self {
            ParseError::DescriptorCorrupt { location, .. } | ParseError::NoOutputMapping { location, .. } => {
                location
            }
        }
    }
}
