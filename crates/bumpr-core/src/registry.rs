//! Read-only npm registry lookup.
//!
//! Fetches the `dist-tags` of a package (e.g. `latest`, `next`) so that
//! `--check` can show what is published next to the local version.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

/// Registry used when none is configured.
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org/";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from registry lookups.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The registry could not be reached or answered with an error status.
    #[error("registry unavailable ({url}): {message}")]
    Unavailable {
        /// The requested URL.
        url: String,
        /// What went wrong.
        message: String,
    },

    /// The registry answered, but not with package metadata we understand.
    #[error("invalid registry response from {url}: {message}")]
    InvalidResponse {
        /// The requested URL.
        url: String,
        /// What went wrong.
        message: String,
    },
}

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Release-tag name → published version string.
pub type DistTags = BTreeMap<String, String>;

/// Something that can report the dist-tags of a package.
pub trait Registry {
    /// Look up the dist-tags of `package`.
    fn dist_tags(&self, package: &str) -> RegistryResult<DistTags>;
}

/// npm-compatible registry over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpRegistry {
    /// Create a client for the registry at `base_url`.
    pub fn new(base_url: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(READ_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            agent,
        }
    }

    /// Metadata URL for `package`. Scoped names keep their `@` and have the
    /// `/` encoded.
    pub fn package_url(&self, package: &str) -> String {
        format!("{}/{}", self.base_url, package.replace('/', "%2f"))
    }
}

impl Default for HttpRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY)
    }
}

impl Registry for HttpRegistry {
    #[instrument(skip(self), fields(registry = %self.base_url))]
    fn dist_tags(&self, package: &str) -> RegistryResult<DistTags> {
        let url = self.package_url(package);
        debug!(%url, "fetching package metadata");

        let response = self
            .agent
            .get(&url)
            .set("Accept", "application/vnd.npm.install-v1+json")
            .call()
            .map_err(|err| {
                let message = match err {
                    ureq::Error::Status(404, _) => format!("package {package:?} not found"),
                    ureq::Error::Status(code, _) => format!("HTTP status {code}"),
                    ureq::Error::Transport(transport) => transport.to_string(),
                };
                RegistryError::Unavailable {
                    url: url.clone(),
                    message,
                }
            })?;

        let body = response
            .into_string()
            .map_err(|err| RegistryError::Unavailable {
                url: url.clone(),
                message: err.to_string(),
            })?;

        parse_dist_tags(&url, &body)
    }
}

#[derive(Deserialize)]
struct Packument {
    #[serde(rename = "dist-tags", default)]
    dist_tags: DistTags,
}

/// Extract `dist-tags` from a package metadata document.
pub fn parse_dist_tags(url: &str, body: &str) -> RegistryResult<DistTags> {
    let packument: Packument =
        serde_json::from_str(body).map_err(|err| RegistryError::InvalidResponse {
            url: url.to_owned(),
            message: err.to_string(),
        })?;
    debug!(tags = packument.dist_tags.len(), "parsed dist-tags");
    Ok(packument.dist_tags)
}
