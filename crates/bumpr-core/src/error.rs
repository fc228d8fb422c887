//! Error types for bumpr-core

use std::fmt;

use camino::Utf8PathBuf;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur when working with configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] Box<figment::Error>),

    /// A config file passed explicitly does not exist.
    #[error("config file not found: {0}")]
    Missing(Utf8PathBuf),
}

/// Result type alias using [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Closed classification of every failure bumpr can report.
///
/// Module error types carry the details; this is what callers match on
/// when they only care about the category (exit handling, JSON output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A requested version component or pre-release stage is lower than
    /// the current one.
    Downgrade,
    /// The bump directive is not valid for the requested bump.
    UnsupportedPreRelease,
    /// A version string could not be parsed.
    MalformedVersion,
    /// A pipeline command failed or could not be started.
    CommandFailure,
    /// The registry could not be queried.
    RegistryUnavailable,
    /// The package manifest could not be read or written.
    Manifest,
    /// Configuration could not be loaded.
    Config,
}

impl ErrorKind {
    /// Stable snake_case identifier.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Downgrade => "downgrade",
            Self::UnsupportedPreRelease => "unsupported_pre_release",
            Self::MalformedVersion => "malformed_version",
            Self::CommandFailure => "command_failure",
            Self::RegistryUnavailable => "registry_unavailable",
            Self::Manifest => "manifest",
            Self::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConfigError {
    /// Category of this error.
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::Config
    }
}

impl crate::version::VersionError {
    /// Category of this error.
    pub const fn kind(&self) -> ErrorKind {
        use crate::version::VersionError;
        match self {
            VersionError::Malformed { .. } => ErrorKind::MalformedVersion,
            VersionError::Downgrade { .. } | VersionError::PreReleaseDowngrade { .. } => {
                ErrorKind::Downgrade
            }
            VersionError::UnsupportedPreRelease(_) => ErrorKind::UnsupportedPreRelease,
        }
    }
}

impl crate::pipeline::PipelineError {
    /// Category of this error.
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::CommandFailure
    }
}

impl crate::registry::RegistryError {
    /// Category of this error.
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::RegistryUnavailable
    }
}

impl crate::manifest::ManifestError {
    /// Category of this error.
    ///
    /// A manifest whose `version` does not parse is a malformed version,
    /// not a manifest problem.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Version { source, .. } => source.kind(),
            _ => ErrorKind::Manifest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::{Component, PreKind, VersionError};

    #[test]
    fn version_errors_classify() {
        let malformed = VersionError::Malformed {
            raw: "x".into(),
            reason: "bad".into(),
        };
        assert_eq!(malformed.kind(), ErrorKind::MalformedVersion);

        let downgrade = VersionError::Downgrade {
            component: Component::Minor,
            requested: 1,
            current: 2,
        };
        assert_eq!(downgrade.kind(), ErrorKind::Downgrade);

        let pre = VersionError::PreReleaseDowngrade {
            requested: PreKind::Alpha,
            current: PreKind::Beta,
        };
        assert_eq!(pre.kind(), ErrorKind::Downgrade);

        let unsupported = VersionError::UnsupportedPreRelease("gamma".into());
        assert_eq!(unsupported.kind(), ErrorKind::UnsupportedPreRelease);
    }

    #[test]
    fn manifest_version_error_is_malformed() {
        let err = crate::manifest::Manifest::from_str_at(
            camino::Utf8Path::new("package.json"),
            r#"{"name":"x","version":"1.x.0"}"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedVersion);
    }

    #[test]
    fn kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::UnsupportedPreRelease).unwrap(),
            "\"unsupported_pre_release\""
        );
        assert_eq!(ErrorKind::CommandFailure.to_string(), "command_failure");
    }
}
