//! User-facing diagnostic messages.
//!
//! Every error surfaced by the CLI says what failed, where it failed and what
//! the user can try next.

use std::fmt;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

/// Common suggestion messages.
pub mod suggestions {
    /// A requirement could not be satisfied by any repository.
    pub const ADD_REPOSITORY: &str = "Add the repository that provides it with `--repo <URL>`";

    /// Planner mode failed where slicer mode would have continued.
    pub const TRY_SLICER: &str = "Run with `--mode slicer` to see everything else that resolves";

    /// Cached descriptors may be out of date.
    pub const FORGET_CACHE: &str = "Drop the cached layout with `p2resolve cache forget <URL>`";

    /// A fetch failed.
    pub const CHECK_NETWORK: &str = "Check your network connection or retry with `--offline`";

    /// A platform filter rejected every candidate.
    pub const CHECK_ENVIRONMENT: &str = "Check the `--env` values (osgi.os, osgi.ws, osgi.arch)";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    pub severity: Severity,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Repository or descriptor URL the diagnostic refers to
    pub location: Option<String>,
}

impl Diagnostic {
    fn with_severity(message: impl Into<String>, severity: Severity) -> Self {
        Diagnostic {
            message: message.into(),
            severity,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Self::with_severity(message, Severity::Error)
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::with_severity(message, Severity::Warning)
    }

    pub fn note(message: impl Into<String>) -> Self {
        Self::with_severity(message, Severity::Note)
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity_str = if color {
            match self.severity {
                Severity::Error => "\x1b[1;31merror\x1b[0m",
                Severity::Warning => "\x1b[1;33mwarning\x1b[0m",
                Severity::Note => "\x1b[1;36mnote\x1b[0m",
            }
        } else {
            match self.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Note => "note",
            }
        };

        output.push_str(&format!("{}: {}\n", severity_str, self.message));

        if let Some(ref location) = self.location {
            output.push_str(&format!("  --> {}\n", location));
        }

        for ctx in &self.context {
            output.push_str(&format!("  = {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            let help_prefix = if color { "\x1b[1;32mhelp\x1b[0m" } else { "help" };
            output.push_str(&format!("{}: consider:\n", help_prefix));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Planner-mode failure, as reported by the CLI.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("no repository provides {namespace}:{name} {range}")]
#[diagnostic(
    code(p2resolve::resolve::unresolved),
    help("Add the repository that provides it, or run with `--mode slicer`")
)]
pub struct UnresolvedRequirementReport {
    pub namespace: String,
    pub name: String,
    pub range: String,
    pub required_by: Option<String>,
}

/// No descriptor could be found at a repository location.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("no repository found at {url}")]
#[diagnostic(code(p2resolve::repository::not_found))]
pub struct RepositoryNotFoundReport {
    pub url: String,
    #[help]
    pub tried: Option<String>,
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::error("no repository provides org.eclipse.equinox.p2.iu:org.example.missing")
            .with_location("https://download.example/releases/")
            .with_context("required by org.example.app 1.0.0")
            .with_suggestion(suggestions::ADD_REPOSITORY)
            .with_suggestion(suggestions::TRY_SLICER);

        let output = diag.format(false);
        assert!(output.starts_with("error: no repository provides"));
        assert!(output.contains("--> https://download.example/releases/"));
        assert!(output.contains("required by org.example.app"));
        assert!(output.contains("help: consider:"));
        assert!(output.contains("2. Run with `--mode slicer`"));
    }

    #[test]
    fn test_colored_severity() {
        let output = Diagnostic::warning("skipping child").format(true);
        assert!(output.contains("\x1b[1;33mwarning\x1b[0m"));
    }

    #[test]
    fn test_unresolved_report_message() {
        let report = UnresolvedRequirementReport {
            namespace: "osgi.bundle".to_string(),
            name: "org.example.core".to_string(),
            range: "[1.0.0,2.0.0)".to_string(),
            required_by: None,
        };
        assert_eq!(
            report.to_string(),
            "no repository provides osgi.bundle:org.example.core [1.0.0,2.0.0)"
        );
    }
}
