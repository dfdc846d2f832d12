//! Semantic version model and next-version resolution.
//!
//! [`SemanticVersion`] is the value type the rest of the crate passes around.
//! It keeps the prerelease split into an identifier and a trailing counter
//! (`1.2.0-beta.3` is identifier `beta`, number `3`) so that prerelease
//! trains can be advanced without re-parsing strings.
//!
//! Parsing delegates grammar validation to the `semver` crate; the split is
//! applied afterwards. [`resolve()`] computes the next version from a
//! [`BumpRequest`].

pub mod resolve;

pub use resolve::{BumpRequest, ReleaseType, apply_override, is_release_keyword, resolve};

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors from version parsing and resolution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// The text is not a `major.minor.patch[-pre][+build]` version.
    #[error("invalid version `{input}`: {reason}")]
    InvalidVersion {
        /// The rejected input.
        input: String,
        /// Why the parser rejected it.
        reason: String,
    },

    /// An explicit release type outside `major`, `minor`, `patch`.
    #[error("invalid release type `{0}` (expected major, minor or patch)")]
    InvalidReleaseType(String),

    /// An explicit release version (or override) that does not parse.
    #[error("invalid release version `{0}`")]
    InvalidReleaseVersion(String),

    /// An explicit version and the prerelease flag name different trains.
    #[error(
        "release version `{version}` conflicts with prerelease identifier `{prerelease}`"
    )]
    ConflictingPrerelease {
        /// The explicit version that was requested.
        version: String,
        /// The separately requested prerelease identifier.
        prerelease: String,
    },

    /// Nothing warrants a release. Not a failure; callers report it and exit cleanly.
    #[error("no release necessary")]
    NoReleaseNecessary,
}

impl VersionError {
    /// Whether this is the "nothing to do" outcome rather than a real error.
    pub const fn is_no_release(&self) -> bool {
        matches!(self, Self::NoReleaseNecessary)
    }
}

/// Result alias for version operations.
pub type VersionResult<T> = Result<T, VersionError>;

/// The prerelease part of a version, split at its last dot.
///
/// `rc.2` has identifier `rc` and number `2`; `alpha` has no number; a bare
/// numeric prerelease such as `0` has an empty identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Prerelease {
    /// Train name, e.g. `beta` or `dev`.
    pub identifier: String,
    /// Position in the train.
    pub number: Option<u64>,
}

impl Prerelease {
    /// Create a numbered prerelease, e.g. `Prerelease::new("dev", 0)` → `dev.0`.
    pub fn new(identifier: impl Into<String>, number: u64) -> Self {
        Self {
            identifier: identifier.into(),
            number: Some(number),
        }
    }

    fn split(raw: &str) -> Self {
        let numeric = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

        if let Some((identifier, tail)) = raw.rsplit_once('.')
            && numeric(tail)
            && let Ok(number) = tail.parse()
        {
            return Self {
                identifier: identifier.to_string(),
                number: Some(number),
            };
        }

        if numeric(raw)
            && let Ok(number) = raw.parse()
        {
            return Self {
                identifier: String::new(),
                number: Some(number),
            };
        }

        Self {
            identifier: raw.to_string(),
            number: None,
        }
    }

    /// The next prerelease on the same train. An unnumbered prerelease starts at `0`.
    pub fn next(&self) -> VersionResult<Self> {
        let number = match self.number {
            Some(n) => step(n, "prerelease number")?,
            None => 0,
        };
        Ok(Self {
            identifier: self.identifier.clone(),
            number: Some(number),
        })
    }
}

/// Add one to a version component, refusing to wrap.
pub(crate) fn step(n: u64, component: &str) -> VersionResult<u64> {
    n.checked_add(1).ok_or_else(|| VersionError::InvalidVersion {
        input: n.to_string(),
        reason: format!("{component} cannot be incremented past {}", u64::MAX),
    })
}

impl fmt::Display for Prerelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.identifier.is_empty(), self.number) {
            (true, Some(n)) => write!(f, "{n}"),
            (false, Some(n)) => write!(f, "{}.{n}", self.identifier),
            (_, None) => f.write_str(&self.identifier),
        }
    }
}

/// A parsed semantic version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SemanticVersion {
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Patch component.
    pub patch: u64,
    /// Prerelease train and number, if any.
    pub prerelease: Option<Prerelease>,
    /// Build metadata (the part after `+`), if any.
    pub build: Option<String>,
}

impl SemanticVersion {
    /// A plain release version with no prerelease or build metadata.
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
            build: None,
        }
    }

    /// Parse a version string, ignoring one leading `v`.
    pub fn parse(text: &str) -> VersionResult<Self> {
        let raw = text.strip_prefix('v').unwrap_or(text);
        let parsed = semver::Version::parse(raw).map_err(|e| VersionError::InvalidVersion {
            input: text.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::from(&parsed))
    }

    /// The `major.minor.patch` part alone.
    pub const fn core(&self) -> Self {
        Self::new(self.major, self.minor, self.patch)
    }

    /// Replace the prerelease.
    #[must_use]
    pub fn with_prerelease(mut self, prerelease: Prerelease) -> Self {
        self.prerelease = Some(prerelease);
        self
    }

    /// Replace the build metadata.
    #[must_use]
    pub fn with_build(mut self, build: Option<String>) -> Self {
        self.build = build;
        self
    }

    /// Whether the version carries a prerelease.
    pub const fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    /// Whether both versions share `major.minor.patch`.
    pub const fn same_core(&self, other: &Self) -> bool {
        self.major == other.major && self.minor == other.minor && self.patch == other.patch
    }

    /// The prerelease identifier, if any.
    pub fn prerelease_identifier(&self) -> Option<&str> {
        self.prerelease.as_ref().map(|p| p.identifier.as_str())
    }
}

impl From<&semver::Version> for SemanticVersion {
    fn from(v: &semver::Version) -> Self {
        Self {
            major: v.major,
            minor: v.minor,
            patch: v.patch,
            prerelease: (!v.pre.is_empty()).then(|| Prerelease::split(v.pre.as_str())),
            build: (!v.build.is_empty()).then(|| v.build.as_str().to_string()),
        }
    }
}

impl FromStr for SemanticVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> VersionResult<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(ref pre) = self.prerelease {
            write!(f, "-{pre}")?;
        }
        if let Some(ref build) = self.build {
            write!(f, "+{build}")?;
        }
        Ok(())
    }
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a
                    .number
                    .cmp(&b.number)
                    .then_with(|| a.identifier.cmp(&b.identifier)),
            })
            .then_with(|| self.build.cmp(&other.build))
    }
}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for SemanticVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SemanticVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
