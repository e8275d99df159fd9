//! OSGi-style versions and version ranges.
//!
//! A version is `major.minor.micro.qualifier`. Numeric segments compare
//! numerically, the qualifier compares lexically. Ranges use interval
//! notation (`[1.0,2.0)`); a bare version denotes "at least this version".

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Error parsing a version or range string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("malformed version `{input}`: {reason}")]
    MalformedVersion { input: String, reason: String },

    #[error("malformed version range `{input}`: {reason}")]
    MalformedRange { input: String, reason: String },
}

/// A four-part version with a total order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub micro: u64,
    pub qualifier: String,
}

impl Version {
    /// The minimum version, used when metadata omits a version.
    pub const UNSPECIFIED: Version = Version {
        major: 0,
        minor: 0,
        micro: 0,
        qualifier: String::new(),
    };

    /// Create a version without a qualifier.
    pub fn new(major: u64, minor: u64, micro: u64) -> Self {
        Version {
            major,
            minor,
            micro,
            qualifier: String::new(),
        }
    }

    /// Create a version with a qualifier.
    pub fn with_qualifier(major: u64, minor: u64, micro: u64, qualifier: impl Into<String>) -> Self {
        Version {
            major,
            minor,
            micro,
            qualifier: qualifier.into(),
        }
    }

    /// Parse a version string.
    ///
    /// Empty or whitespace-only input yields [`Version::UNSPECIFIED`].
    /// Missing minor/micro segments default to zero.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Version::UNSPECIFIED);
        }

        let malformed = |reason: &str| VersionError::MalformedVersion {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = s.splitn(4, '.');
        let mut numbers = [0u64; 3];

        for (i, slot) in numbers.iter_mut().enumerate() {
            match parts.next() {
                Some(part) => {
                    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                        return Err(malformed(&format!("segment {} is not numeric", i + 1)));
                    }
                    *slot = part
                        .parse()
                        .map_err(|_| malformed(&format!("segment {} is out of range", i + 1)))?;
                }
                None => break,
            }
        }

        let qualifier = parts.next().unwrap_or("");
        if !qualifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(malformed("qualifier contains invalid characters"));
        }

        Ok(Version::with_qualifier(
            numbers[0],
            numbers[1],
            numbers[2],
            qualifier,
        ))
    }

    /// Parse a version, falling back to [`Version::UNSPECIFIED`] on error.
    pub fn parse_lenient(s: &str) -> Self {
        match Version::parse(s) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("{}; treating as {}", e, Version::UNSPECIFIED);
                Version::UNSPECIFIED
            }
        }
    }

    /// Whether this is the unspecified (all-zero, unqualified) version.
    pub fn is_unspecified(&self) -> bool {
        *self == Version::UNSPECIFIED
    }
}

impl Default for Version {
    fn default() -> Self {
        Version::UNSPECIFIED
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.micro.cmp(&other.micro))
            .then_with(|| self.qualifier.cmp(&other.qualifier))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        if !self.qualifier.is_empty() {
            write!(f, ".{}", self.qualifier)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

/// One end of a [`VersionRange`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bound {
    pub version: Version,
    pub inclusive: bool,
}

/// A version interval; `None` on either side means unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionRange {
    lower: Option<Bound>,
    upper: Option<Bound>,
}

impl VersionRange {
    /// A range that includes every version.
    pub fn any() -> Self {
        VersionRange {
            lower: None,
            upper: None,
        }
    }

    /// `[version, version]`.
    pub fn exact(version: Version) -> Self {
        VersionRange {
            lower: Some(Bound {
                version: version.clone(),
                inclusive: true,
            }),
            upper: Some(Bound {
                version,
                inclusive: true,
            }),
        }
    }

    /// `[version, ∞)`.
    pub fn at_least(version: Version) -> Self {
        VersionRange {
            lower: Some(Bound {
                version,
                inclusive: true,
            }),
            upper: None,
        }
    }

    /// Build a range from explicit bounds.
    pub fn between(lower: Option<Bound>, upper: Option<Bound>) -> Self {
        VersionRange { lower, upper }
    }

    /// Parse a range string.
    ///
    /// Accepts interval notation (`[1.0,2.0)`, `(1.0,2.0]`), a bare version
    /// meaning "at least", and empty input meaning "any".
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(VersionRange::any());
        }

        let malformed = |reason: &str| VersionError::MalformedRange {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let first = s.chars().next().unwrap_or(' ');
        if first != '[' && first != '(' {
            let version = Version::parse(s).map_err(|e| malformed(&e.to_string()))?;
            return Ok(VersionRange::at_least(version));
        }

        let last = s.chars().last().unwrap_or(' ');
        if last != ']' && last != ')' {
            return Err(malformed("missing closing bracket"));
        }

        let body = &s[1..s.len() - 1];
        let (low, high) = body
            .split_once(',')
            .ok_or_else(|| malformed("expected `low,high`"))?;

        let lower = Version::parse(low).map_err(|e| malformed(&e.to_string()))?;
        let upper_str = high.trim();
        let upper = if upper_str.is_empty() {
            None
        } else {
            Some(Bound {
                version: Version::parse(upper_str).map_err(|e| malformed(&e.to_string()))?,
                inclusive: last == ']',
            })
        };

        let range = VersionRange {
            lower: Some(Bound {
                version: lower,
                inclusive: first == '[',
            }),
            upper,
        };

        if let (Some(lo), Some(hi)) = (&range.lower, &range.upper) {
            if lo.version > hi.version {
                return Err(malformed("lower bound is above upper bound"));
            }
        }

        Ok(range)
    }

    /// Parse a range, falling back to [`VersionRange::any`] on error.
    pub fn parse_lenient(s: &str) -> Self {
        match VersionRange::parse(s) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("{}; treating as unbounded", e);
                VersionRange::any()
            }
        }
    }

    /// Check whether `version` lies inside this range.
    pub fn includes(&self, version: &Version) -> bool {
        if let Some(lower) = &self.lower {
            match version.cmp(&lower.version) {
                Ordering::Less => return false,
                Ordering::Equal if !lower.inclusive => return false,
                _ => {}
            }
        }

        if let Some(upper) = &self.upper {
            match version.cmp(&upper.version) {
                Ordering::Greater => return false,
                Ordering::Equal if !upper.inclusive => return false,
                _ => {}
            }
        }

        true
    }

    /// The lower bound, if any.
    pub fn lower(&self) -> Option<&Bound> {
        self.lower.as_ref()
    }

    /// The upper bound, if any.
    pub fn upper(&self) -> Option<&Bound> {
        self.upper.as_ref()
    }

    /// If this range admits exactly one version, return it.
    pub fn as_exact(&self) -> Option<&Version> {
        match (&self.lower, &self.upper) {
            (Some(lo), Some(hi)) if lo.inclusive && hi.inclusive && lo.version == hi.version => {
                Some(&lo.version)
            }
            _ => None,
        }
    }
}

impl Default for VersionRange {
    fn default() -> Self {
        VersionRange::any()
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.lower, &self.upper) {
            (None, None) => write!(f, "0.0.0"),
            (Some(lo), None) if lo.inclusive => write!(f, "{}", lo.version),
            (lo, hi) => {
                let (open, low) = match lo {
                    Some(b) => (if b.inclusive { '[' } else { '(' }, b.version.to_string()),
                    None => ('[', Version::UNSPECIFIED.to_string()),
                };
                write!(f, "{}{},", open, low)?;
                match hi {
                    Some(b) => write!(f, "{}{}", b.version, if b.inclusive { ']' } else { ')' }),
                    None => write!(f, ")"),
                }
            }
        }
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionRange::parse(s)
    }
}
