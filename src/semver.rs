//! Semantic version parsing and the compatibility relation used to gate
//! server distributions.
//!
//! Ordering and equality only look at the numeric triple. Pre-release and
//! build metadata are kept so they render back verbatim, but they never
//! decide which of two versions is newer.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static SEMVER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(0|[1-9][0-9]*)\.(0|[1-9][0-9]*)\.(0|[1-9][0-9]*)",
        r"(?:-((?:0|[1-9][0-9]*|[0-9]*[a-zA-Z-][0-9a-zA-Z-]*)",
        r"(?:\.(?:0|[1-9][0-9]*|[0-9]*[a-zA-Z-][0-9a-zA-Z-]*))*))?",
        r"(?:\+([0-9a-zA-Z-]+(?:\.[0-9a-zA-Z-]+)*))?$",
    ))
    .expect("valid regex for semver pattern")
});

/// Error returned by [`Semver::from_str`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid semantic version: {0}")]
pub struct InvalidVersion(pub String);

/// A `major.minor.patch[-prerelease][+build]` version.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Semver {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre_release: Option<String>,
    pub build: Option<String>,
}

impl Semver {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre_release: None,
            build: None,
        }
    }

    /// Parse a canonical version string.
    ///
    /// Returns `None` for anything outside the grammar, including numeric
    /// components with redundant leading zeros and a dangling `-`.
    pub fn parse(input: &str) -> Option<Self> {
        let captures = SEMVER_PATTERN.captures(input)?;
        let number = |index: usize| -> Option<u64> { captures.get(index)?.as_str().parse().ok() };
        Some(Self {
            major: number(1)?,
            minor: number(2)?,
            patch: number(3)?,
            pre_release: captures.get(4).map(|m| m.as_str().to_string()),
            build: captures.get(5).map(|m| m.as_str().to_string()),
        })
    }

    /// Whether a caller built against `reference` can use `self`.
    ///
    /// For `0.x` releases the minor component is the breaking axis, so the
    /// minor must match exactly and only patch may move forward. Past `1.0`
    /// the major must match and the minor may move forward.
    pub fn is_compatible_with(&self, reference: &Semver) -> bool {
        if self.major == 0 {
            return reference.major == 0
                && self.minor == reference.minor
                && self.patch >= reference.patch;
        }
        self.major == reference.major && self.minor >= reference.minor
    }

    fn triple(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }
}

impl PartialEq for Semver {
    fn eq(&self, other: &Self) -> bool {
        self.triple() == other.triple()
    }
}

impl Eq for Semver {}

impl Hash for Semver {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.triple().hash(state);
    }
}

impl PartialOrd for Semver {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Semver {
    fn cmp(&self, other: &Self) -> Ordering {
        self.triple().cmp(&other.triple())
    }
}

impl fmt::Display for Semver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre_release) = &self.pre_release {
            write!(f, "-{}", pre_release)?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{}", build)?;
        }
        Ok(())
    }
}

impl FromStr for Semver {
    type Err = InvalidVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| InvalidVersion(s.to_string()))
    }
}

impl TryFrom<String> for Semver {
    type Error = InvalidVersion;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Semver> for String {
    fn from(version: Semver) -> Self {
        version.to_string()
    }
}
