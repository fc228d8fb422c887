//! Package manifest (`package.json`) access.
//!
//! Only `name` and `version` are interpreted. Every other field is carried
//! through untouched, in its original key order, when the version is
//! rewritten. Output uses 2-space indentation and a trailing newline.

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::version::{self, Version};

/// Default manifest file name, relative to the project root.
pub const MANIFEST_FILE: &str = "package.json";

/// Errors from manifest operations.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Failed to read or write the manifest file.
    #[error("{path}: {source}")]
    Io {
        /// The manifest path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The manifest is not a valid JSON object.
    #[error("{path}: invalid JSON: {source}")]
    Json {
        /// The manifest path.
        path: Utf8PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A required string field is missing.
    #[error("{path}: missing string field `{field}`")]
    MissingField {
        /// The manifest path.
        path: Utf8PathBuf,
        /// The field name.
        field: &'static str,
    },

    /// The `version` field is not a supported version string.
    #[error("{path}: {source}")]
    Version {
        /// The manifest path.
        path: Utf8PathBuf,
        /// The parse failure.
        #[source]
        source: version::VersionError,
    },
}

/// Result alias for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

/// A loaded package manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: Utf8PathBuf,
    document: Map<String, Value>,
    name: String,
    version: Version,
}

impl Manifest {
    /// Load and validate a manifest.
    #[instrument(fields(%path))]
    pub fn load(path: &Utf8Path) -> ManifestResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str_at(path, &text)
    }

    /// Parse manifest text as if read from `path`.
    pub fn from_str_at(path: &Utf8Path, text: &str) -> ManifestResult<Self> {
        let document: Map<String, Value> =
            serde_json::from_str(text).map_err(|source| ManifestError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        let name = string_field(&document, "name", path)?.to_owned();
        let raw_version = string_field(&document, "version", path)?;
        let version =
            version::parse_version(raw_version).map_err(|source| ManifestError::Version {
                path: path.to_path_buf(),
                source,
            })?;

        debug!(%name, %version, "loaded manifest");
        Ok(Self {
            path: path.to_path_buf(),
            document,
            name,
            version,
        })
    }

    /// Manifest file path.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Package name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current version.
    pub const fn version(&self) -> &Version {
        &self.version
    }

    /// Render the manifest with `version` replaced.
    pub fn render_with_version(&self, version: &Version) -> ManifestResult<String> {
        let mut document = self.document.clone();
        document.insert("version".into(), Value::String(version.to_string()));
        let mut text =
            serde_json::to_string_pretty(&document).map_err(|source| ManifestError::Json {
                path: self.path.clone(),
                source,
            })?;
        text.push('\n');
        Ok(text)
    }

    /// Overwrite the manifest on disk with `version`.
    ///
    /// The new content is written to a temporary file in the same directory
    /// and renamed over the original.
    #[instrument(skip(self), fields(path = %self.path, %version))]
    pub fn write_version(&self, version: &Version) -> ManifestResult<()> {
        let text = self.render_with_version(version)?;
        let io_err = |source| ManifestError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        let permissions = std::fs::metadata(&self.path)
            .map_err(io_err)?
            .permissions();
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(text.as_bytes()).map_err(io_err)?;
        tmp.as_file().set_permissions(permissions).map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;

        info!(previous = %self.version, "manifest version updated");
        Ok(())
    }
}

fn string_field<'a>(
    document: &'a Map<String, Value>,
    field: &'static str,
    path: &Utf8Path,
) -> ManifestResult<&'a str> {
    document
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ManifestError::MissingField {
            path: path.to_path_buf(),
            field,
        })
}
