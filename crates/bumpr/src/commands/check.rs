//! Check command: local version next to the registry's dist-tags.

use anyhow::Context;
use owo_colors::OwoColorize;
use tracing::instrument;

use bumpr_core::check::{self, Relation};
use bumpr_core::config::Config;
use bumpr_core::registry::{DEFAULT_REGISTRY, HttpRegistry};

/// Print the local and published versions.
///
/// `registry` is the `--registry` flag; the configured registry is used
/// when it is absent.
#[instrument(name = "cmd_check", skip_all, fields(json_output = json))]
pub fn cmd_check(
    registry: Option<&str>,
    json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    let url = registry
        .or_else(|| config.release.as_ref()?.registry.as_deref())
        .unwrap_or(DEFAULT_REGISTRY);

    let manifest = super::load_manifest(config, cwd)?;
    let report = check::check(&manifest, &HttpRegistry::new(url))
        .with_context(|| format!("failed to look up {} on {url}", manifest.name()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", report.name.bold());
    println!("  {:<8} {}", "local".dimmed(), report.local.green().bold());
    if report.dist_tags.is_empty() {
        println!("  {}", "nothing published yet".yellow());
    }
    for (tag, version) in &report.dist_tags {
        println!("  {:<8} {}", tag.dimmed(), version);
    }
    match report.relation {
        Some(Relation::Ahead) => println!("\n{}", "Local version is ahead of latest.".cyan()),
        Some(Relation::Current) => println!("\n{}", "Local version is published as latest.".green()),
        Some(Relation::Behind) => println!("\n{}", "Local version is behind latest.".yellow()),
        None => {}
    }

    Ok(())
}
