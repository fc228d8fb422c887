//! Version model, parsing and rendering.
//!
//! A [`Version`] is `MAJOR.MINOR.PATCH` with an optional pre-release marker
//! of the form `-alpha.N`, `-beta.N` or `-rc.N`. Build metadata and arbitrary
//! pre-release identifiers are not supported.
//!
//! - [`parse_version`] turns a string into a [`Version`], failing fast on any
//!   non-numeric component.
//! - [`generate_version`] (or `Display`) renders the canonical string form.
//! - [`engine`] computes the next version for a bump request.

pub mod directive;
pub mod engine;

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use directive::Directive;
pub use engine::{BumpLevel, bump_auto, bump_major, bump_minor, bump_patch, bump_pre};

/// Errors from version parsing and bump computation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// The version string could not be parsed.
    #[error("malformed version {raw:?}: {reason}")]
    Malformed {
        /// The offending input.
        raw: String,
        /// What was wrong with it.
        reason: String,
    },

    /// An explicit numeric target is lower than the current component value.
    #[error("cannot downgrade {component} from {current} to {requested}")]
    Downgrade {
        /// The component being set.
        component: Component,
        /// The requested value.
        requested: u64,
        /// The current value (lower bound).
        current: u64,
    },

    /// A pre-release kind lower than the current one was requested.
    #[error("cannot downgrade pre-release from {current} to {requested}")]
    PreReleaseDowngrade {
        /// The requested pre-release kind.
        requested: PreKind,
        /// The current pre-release kind (lower bound).
        current: PreKind,
    },

    /// The bump directive is not valid for the requested operation.
    #[error("unsupported pre-release name: {0:?}")]
    UnsupportedPreRelease(String),
}

/// Result alias for version operations.
pub type VersionResult<T> = Result<T, VersionError>;

/// One of the three numeric version components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    /// `X.y.z`
    Major,
    /// `x.Y.z`
    Minor,
    /// `x.y.Z`
    Patch,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Major => write!(f, "major"),
            Self::Minor => write!(f, "minor"),
            Self::Patch => write!(f, "patch"),
        }
    }
}

/// Pre-release stage. Ordered `Alpha < Beta < Rc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreKind {
    /// `-alpha.N`
    Alpha,
    /// `-beta.N`
    Beta,
    /// `-rc.N`
    Rc,
}

impl PreKind {
    /// Canonical identifier as written in a version string.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Alpha => "alpha",
            Self::Beta => "beta",
            Self::Rc => "rc",
        }
    }

    fn from_identifier(s: &str) -> Option<Self> {
        match s {
            "alpha" => Some(Self::Alpha),
            "beta" => Some(Self::Beta),
            "rc" => Some(Self::Rc),
            _ => None,
        }
    }
}

impl fmt::Display for PreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pre-release marker: kind plus counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PreRelease {
    /// Stage of the pre-release.
    pub kind: PreKind,
    /// Counter within the stage, starting at 0.
    pub value: u64,
}

impl PreRelease {
    /// Create a pre-release marker.
    pub const fn new(kind: PreKind, value: u64) -> Self {
        Self { kind, value }
    }
}

impl fmt::Display for PreRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.value)
    }
}

/// A parsed semantic version.
///
/// Values are never mutated after construction; every bump operation returns
/// a new `Version`. Equality and ordering ignore [`Version::raw`].
#[derive(Debug, Clone)]
pub struct Version {
    major: u64,
    minor: u64,
    patch: u64,
    pre: Option<PreRelease>,
    raw: String,
}

impl Version {
    /// Create a release version with no pre-release marker.
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self::from_parts(major, minor, patch, None)
    }

    /// Return a copy of this version carrying the given pre-release marker.
    pub fn with_pre(&self, kind: PreKind, value: u64) -> Self {
        Self::from_parts(
            self.major,
            self.minor,
            self.patch,
            Some(PreRelease::new(kind, value)),
        )
    }

    /// Return a copy of this version with the pre-release marker removed.
    pub fn release(&self) -> Self {
        Self::from_parts(self.major, self.minor, self.patch, None)
    }

    fn from_parts(major: u64, minor: u64, patch: u64, pre: Option<PreRelease>) -> Self {
        let mut version = Self {
            major,
            minor,
            patch,
            pre,
            raw: String::new(),
        };
        version.raw = version.to_string();
        version
    }

    /// Major component.
    pub const fn major(&self) -> u64 {
        self.major
    }

    /// Minor component.
    pub const fn minor(&self) -> u64 {
        self.minor
    }

    /// Patch component.
    pub const fn patch(&self) -> u64 {
        self.patch
    }

    /// Value of the given component.
    pub const fn component(&self, component: Component) -> u64 {
        match component {
            Component::Major => self.major,
            Component::Minor => self.minor,
            Component::Patch => self.patch,
        }
    }

    /// Pre-release marker, if any.
    pub const fn pre(&self) -> Option<PreRelease> {
        self.pre
    }

    /// Whether this version carries a pre-release marker.
    pub const fn is_prerelease(&self) -> bool {
        self.pre.is_some()
    }

    /// The string this version was parsed from, for diagnostics.
    ///
    /// Versions produced by a bump carry their own canonical form here.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Convert to a [`semver::Version`] for comparison against foreign versions.
    pub fn to_semver(&self) -> Result<semver::Version, semver::Error> {
        semver::Version::parse(&self.to_string())
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.major, self.minor, self.patch, self.pre).hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (self.pre, other.pre) {
                (None, None) => Ordering::Equal,
                // A release sorts after any of its pre-releases.
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(&b),
            })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = self.pre {
            write!(f, "-{pre}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> VersionResult<Self> {
        parse_version(s)
    }
}

impl Serialize for Version {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_version(&s).map_err(serde::de::Error::custom)
    }
}

/// Parse `MAJOR.MINOR.PATCH[-TYPE.VALUE]`, with an optional leading `v`.
///
/// The core grammar is semver's. The pre-release must be `alpha`, `beta` or
/// `rc` with an optional numeric counter; without one (`1.0.0-beta`) the
/// counter is `0`. Build metadata is rejected.
pub fn parse_version(raw: &str) -> VersionResult<Version> {
    let malformed = |reason: String| VersionError::Malformed {
        raw: raw.to_owned(),
        reason,
    };

    let trimmed = raw.trim();
    let s = trimmed.strip_prefix('v').unwrap_or(trimmed);
    let parsed = semver::Version::parse(s).map_err(|e| malformed(e.to_string()))?;

    if !parsed.build.is_empty() {
        return Err(malformed(format!(
            "build metadata {:?} is not supported",
            parsed.build.as_str()
        )));
    }

    let pre = if parsed.pre.is_empty() {
        None
    } else {
        Some(parse_pre(parsed.pre.as_str()).map_err(&malformed)?)
    };

    Ok(Version {
        major: parsed.major,
        minor: parsed.minor,
        patch: parsed.patch,
        pre,
        raw: raw.to_owned(),
    })
}

/// Render the canonical string form of a version.
pub fn generate_version(version: &Version) -> String {
    version.to_string()
}

fn parse_pre(segment: &str) -> Result<PreRelease, String> {
    let (name, value) = segment.split_once('.').unwrap_or((segment, ""));
    let kind = PreKind::from_identifier(name).ok_or_else(|| {
        format!("unknown pre-release identifier {name:?} (expected alpha, beta or rc)")
    })?;
    let value = if value.is_empty() {
        0
    } else if value.bytes().all(|b| b.is_ascii_digit()) {
        value
            .parse()
            .map_err(|e| format!("pre-release counter {value:?} is out of range: {e}"))?
    } else {
        return Err(format!(
            "pre-release counter {value:?} is not a non-negative integer"
        ));
    };
    Ok(PreRelease::new(kind, value))
}
