//! `--check`: compare the local version with what the registry publishes.

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::manifest::Manifest;
use crate::registry::{DistTags, Registry, RegistryResult};

/// Local version alongside published dist-tags.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    /// Package name from the manifest.
    pub name: String,
    /// Version in the local manifest.
    pub local: String,
    /// Published dist-tags (tag → version).
    pub dist_tags: DistTags,
    /// How the local version relates to the `latest` tag, when comparable.
    pub relation: Option<Relation>,
}

/// Ordering of the local version relative to `latest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    /// Local is newer than `latest` (unpublished changes).
    Ahead,
    /// Local equals `latest`.
    Current,
    /// Local is older than `latest`.
    Behind,
}

/// Build a [`CheckReport`] for `manifest`.
///
/// Registry failures propagate; they only matter for this report.
#[instrument(skip_all, fields(package = manifest.name()))]
pub fn check(manifest: &Manifest, registry: &dyn Registry) -> RegistryResult<CheckReport> {
    let dist_tags = registry.dist_tags(manifest.name())?;
    let local = manifest.version();

    let relation = dist_tags.get("latest").and_then(|latest| {
        let latest = semver::Version::parse(latest.trim_start_matches('v'))
            .inspect_err(|e| warn!(%latest, error = %e, "unparseable latest dist-tag"))
            .ok()?;
        let local = local.to_semver().ok()?;
        Some(match local.cmp(&latest) {
            std::cmp::Ordering::Greater => Relation::Ahead,
            std::cmp::Ordering::Equal => Relation::Current,
            std::cmp::Ordering::Less => Relation::Behind,
        })
    });

    info!(%local, ?relation, "version check complete");
    Ok(CheckReport {
        name: manifest.name().to_owned(),
        local: local.to_string(),
        dist_tags,
        relation,
    })
}
