//! Resolution error types and diagnostics.

use thiserror::Error;

use crate::resolver::resolved::UnresolvedRequirement;
use crate::util::diagnostic::{suggestions, Diagnostic, UnresolvedRequirementReport};

/// Error during unit resolution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// A mandatory requirement has no provider in planner mode.
    #[error("unresolved requirement {0}")]
    UnresolvedRequirement(UnresolvedRequirement),

    /// A feature's own descriptor could not be read.
    #[error("cannot read feature descriptor of {artifact} at {location}: {reason}")]
    FeatureDescriptor {
        artifact: String,
        location: String,
        reason: String,
    },
}

impl ResolveError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ResolveError::UnresolvedRequirement(failure) => {
                let mut diag = Diagnostic::error(format!(
                    "no repository provides `{}` {}",
                    failure.name, failure.range
                ))
                .with_context(format!("namespace: {}", failure.namespace));

                if let Some(ref by) = failure.required_by {
                    diag = diag.with_context(format!("required by {}", by));
                } else {
                    diag = diag.with_context("requested as a seed".to_string());
                }

                diag.with_suggestion(suggestions::ADD_REPOSITORY)
                    .with_suggestion(suggestions::TRY_SLICER)
                    .with_suggestion(suggestions::CHECK_ENVIRONMENT)
            }

            ResolveError::FeatureDescriptor {
                artifact,
                location,
                reason,
            } => Diagnostic::error(format!("cannot read the descriptor of feature `{}`", artifact))
                .with_location(location.clone())
                .with_context(reason.clone())
                .with_suggestion(suggestions::CHECK_NETWORK)
                .with_suggestion(suggestions::FORGET_CACHE),
        }
    }

    /// The miette report for planner failures, if this is one.
    pub fn to_report(&self) -> Option<UnresolvedRequirementReport> {
        match self {
            ResolveError::UnresolvedRequirement(failure) => Some(UnresolvedRequirementReport {
                namespace: failure.namespace.clone(),
                name: failure.name.clone(),
                range: failure.range.to_string(),
                required_by: failure.required_by.clone(),
            }),
            ResolveError::FeatureDescriptor { .. } => None,
        }
    }
}
