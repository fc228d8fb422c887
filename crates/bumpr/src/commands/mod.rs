//! Command implementations

pub mod check;

pub mod release;

use anyhow::Context;
use bumpr_core::config::Config;
use bumpr_core::manifest::{MANIFEST_FILE, Manifest};
use camino::Utf8Path;

/// Load the manifest named in configuration, relative to `cwd`.
pub fn load_manifest(config: &Config, cwd: &Utf8Path) -> anyhow::Result<Manifest> {
    let relative = config
        .manifest
        .as_deref()
        .unwrap_or_else(|| Utf8Path::new(MANIFEST_FILE));
    let path = cwd.join(relative);
    Manifest::load(&path).with_context(|| format!("failed to load {path}"))
}
