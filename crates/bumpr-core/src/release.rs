//! Release orchestrator.
//!
//! Turns a bump request into a new version and runs the fixed release
//! pipeline: stage, commit, tag, push, push tags, publish.
//!
//! # Two-phase workflow
//!
//! 1. **Plan** ([`plan_release`]): compute the next version, the commit
//!    message, the publish tag and the command list. Nothing is touched, so
//!    a downgrade or an unsupported directive fails here.
//! 2. **Execute** ([`ReadyRelease::execute`]): check the required programs,
//!    rewrite the manifest, then run the pipeline, reporting progress through
//!    [`ReleaseEvent`]s.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::config::ReleaseConfig;
use crate::error::ErrorKind;
use crate::manifest::{Manifest, ManifestError};
use crate::pipeline::{
    self, CommandRunner, PipelineError, PipelineEvent, PipelinePolicy, PipelineReport,
    PipelineStep,
};
use crate::registry::DEFAULT_REGISTRY;
use crate::version::{BumpLevel, Directive, Version, VersionError, bump_auto};

/// Commit and tag message used when none is configured.
pub const DEFAULT_MESSAGE: &str = "chore: bump version";

/// Publish tag for release versions.
pub const LATEST_TAG: &str = "latest";

/// Publish tag for pre-release versions.
pub const NEXT_TAG: &str = "next";

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Errors from the release workflow.
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Version computation failed.
    #[error(transparent)]
    Version(#[from] VersionError),

    /// Manifest read or write failed.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// A pipeline step failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ReleaseError {
    /// Category of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Version(e) => e.kind(),
            Self::Manifest(e) => e.kind(),
            Self::Pipeline(e) => e.kind(),
        }
    }
}

/// Result alias for release operations.
pub type ReleaseResult<T> = Result<T, ReleaseError>;

// ──────────────────────────────────────────────
// Options
// ──────────────────────────────────────────────

/// What the user asked for.
#[derive(Debug, Clone, Default)]
pub struct ReleaseOptions {
    /// Requested bump. `None` increments the last numeric component.
    pub level: Option<BumpLevel>,
    /// Value given with the bump flag.
    pub directive: Directive,
    /// Commit and tag message (before the version suffix).
    pub message: Option<String>,
    /// Publish tag override.
    pub tag: Option<String>,
    /// Registry URL for `npm publish`.
    pub registry: Option<String>,
    /// Do not rewrite the manifest (`--nopkg`).
    pub no_manifest: bool,
    /// Skip push steps (`--nopush`).
    pub no_push: bool,
    /// Skip the publish step (`--nopublish`).
    pub no_publish: bool,
    /// Announce only (`--dry`).
    pub dry_run: bool,
}

impl ReleaseOptions {
    /// Fill unset values from the `[release]` config section.
    ///
    /// Explicit options always win; a config `false` for `push`, `publish`
    /// or `update_manifest` turns the matching skip on.
    #[must_use]
    pub fn with_config(mut self, config: Option<&ReleaseConfig>) -> Self {
        let Some(config) = config else {
            return self;
        };
        if self.message.is_none() {
            self.message.clone_from(&config.message);
        }
        if self.tag.is_none() {
            self.tag.clone_from(&config.tag);
        }
        if self.registry.is_none() {
            self.registry.clone_from(&config.registry);
        }
        self.no_push |= config.push == Some(false);
        self.no_publish |= config.publish == Some(false);
        self.no_manifest |= config.update_manifest == Some(false);
        self
    }

    /// Pipeline policy implied by these options.
    pub const fn policy(&self) -> PipelinePolicy {
        PipelinePolicy {
            dry_run: self.dry_run,
            skip_push: self.no_push,
            skip_publish: self.no_publish,
        }
    }
}

// ──────────────────────────────────────────────
// Plan
// ──────────────────────────────────────────────

/// Everything decided before anything is touched.
#[derive(Debug, Clone, Serialize)]
pub struct ReleasePlan {
    /// Package name from the manifest.
    pub package: String,
    /// Manifest that will be rewritten.
    pub manifest_path: Utf8PathBuf,
    /// Version before the bump.
    pub previous: Version,
    /// Version after the bump.
    pub next: Version,
    /// Full commit and tag message, including the version suffix.
    pub message: String,
    /// Publish dist-tag.
    pub tag: String,
    /// Registry URL.
    pub registry: String,
    /// Pipeline commands in order.
    pub steps: Vec<PipelineStep>,
    /// Whether the manifest will be rewritten.
    pub update_manifest: bool,
    /// Pipeline execution policy.
    pub policy: PipelinePolicy,
}

/// A planned release, ready to execute.
#[derive(Debug)]
pub struct ReadyRelease {
    /// The loaded manifest.
    pub manifest: Manifest,
    /// The computed plan.
    pub plan: ReleasePlan,
}

/// Compute the next version and the pipeline for `manifest`.
#[instrument(skip_all, fields(package = manifest.name(), level = ?options.level))]
pub fn plan_release(manifest: Manifest, options: &ReleaseOptions) -> ReleaseResult<ReadyRelease> {
    let previous = manifest.version().clone();
    let next = match options.level {
        Some(level) => level.apply(&options.directive, &previous)?,
        None => bump_auto(&previous)?,
    };
    debug!(%previous, %next, "computed next version");

    let message = commit_message(options.message.as_deref(), &next);
    let tag = publish_tag(options.tag.as_deref(), &next);
    let registry = options
        .registry
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_REGISTRY)
        .to_owned();
    let steps = release_steps(&next, &message, &tag, &registry);

    info!(%previous, %next, %tag, "release planned");
    let plan = ReleasePlan {
        package: manifest.name().to_owned(),
        manifest_path: manifest.path().to_path_buf(),
        previous,
        next,
        message,
        tag,
        registry,
        steps,
        update_manifest: !options.no_manifest,
        policy: options.policy(),
    };
    Ok(ReadyRelease { manifest, plan })
}

/// Commit message with the ` (bump version: X)` suffix.
pub fn commit_message(message: Option<&str>, next: &Version) -> String {
    let base = message
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_MESSAGE);
    format!("{base} (bump version: {next})")
}

/// Publish tag: the override if given, `next` for pre-releases, else `latest`.
pub fn publish_tag(requested: Option<&str>, next: &Version) -> String {
    match requested.map(str::trim).filter(|t| !t.is_empty()) {
        Some(tag) => tag.to_owned(),
        None if next.is_prerelease() => NEXT_TAG.to_owned(),
        None => LATEST_TAG.to_owned(),
    }
}

/// The fixed release pipeline, with arguments shell-quoted.
pub fn release_steps(
    next: &Version,
    message: &str,
    tag: &str,
    registry: &str,
) -> Vec<PipelineStep> {
    let version = shell_quote(&next.to_string());
    let message = shell_quote(message);
    [
        "git add .".to_owned(),
        format!("git commit -a -m {message}"),
        format!("git tag -a {version} -m {message}"),
        "git push".to_owned(),
        "git push --tags".to_owned(),
        format!(
            "npm publish --tag {} --registry {}",
            shell_quote(tag),
            shell_quote(registry)
        ),
    ]
    .into_iter()
    .map(PipelineStep::new)
    .collect()
}

/// Quote `arg` for `sh`. Plain words pass through unchanged.
pub fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._-/:@%+=,".contains(c));
    if plain {
        arg.to_owned()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

// ──────────────────────────────────────────────
// Execute
// ──────────────────────────────────────────────

/// Why the manifest was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestSkip {
    /// `--nopkg` or `update_manifest = false`.
    Disabled,
    /// Dry run.
    DryRun,
}

/// Progress events emitted during execution.
#[derive(Debug, Clone)]
pub enum ReleaseEvent<'a> {
    /// The manifest now carries the new version.
    ManifestUpdated {
        /// Manifest path.
        path: &'a Utf8Path,
        /// The version written.
        version: &'a Version,
    },
    /// The manifest was not rewritten.
    ManifestSkipped(ManifestSkip),
    /// A pipeline step event.
    Pipeline(PipelineEvent<'a>),
}

/// Result of a finished release.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseOutcome {
    /// Package name.
    pub package: String,
    /// Version before the bump.
    pub previous: Version,
    /// Version after the bump.
    pub version: Version,
    /// Publish dist-tag.
    pub tag: String,
    /// Whether the manifest was rewritten.
    pub manifest_updated: bool,
    /// Whether this was a dry run.
    pub dry_run: bool,
    /// Per-step decisions.
    pub pipeline: PipelineReport,
}

impl ReadyRelease {
    /// Execute the release.
    ///
    /// On a real run, every program the pipeline will invoke is located
    /// first, so a missing `npm` fails before the manifest is rewritten.
    /// Steps that already ran are not undone when a later one fails.
    #[instrument(skip_all, fields(version = %self.plan.next, dry_run = self.plan.policy.dry_run))]
    pub fn execute(
        self,
        runner: &mut dyn CommandRunner,
        mut on_event: impl FnMut(ReleaseEvent<'_>),
    ) -> ReleaseResult<ReleaseOutcome> {
        let Self { manifest, plan } = self;
        let policy = plan.policy;

        if !policy.dry_run {
            pipeline::preflight(&plan.steps, policy, &*runner)?;
        }

        let manifest_updated = if policy.dry_run {
            on_event(ReleaseEvent::ManifestSkipped(ManifestSkip::DryRun));
            false
        } else if !plan.update_manifest {
            on_event(ReleaseEvent::ManifestSkipped(ManifestSkip::Disabled));
            false
        } else {
            manifest.write_version(&plan.next)?;
            on_event(ReleaseEvent::ManifestUpdated {
                path: manifest.path(),
                version: &plan.next,
            });
            true
        };

        let report = pipeline::run_pipeline(&plan.steps, policy, runner, |event| {
            on_event(ReleaseEvent::Pipeline(event));
        })?;

        info!(version = %plan.next, tag = %plan.tag, "release complete");
        Ok(ReleaseOutcome {
            package: plan.package,
            previous: plan.previous,
            version: plan.next,
            tag: plan.tag,
            manifest_updated,
            dry_run: policy.dry_run,
            pipeline: report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RecordingRunner;
    use crate::version::{PreKind, parse_version};
    use std::fs;
    use tempfile::TempDir;

    fn manifest(version: &str) -> Manifest {
        let text = format!(r#"{{"name":"demo","version":"{version}"}}"#);
        Manifest::from_str_at(Utf8Path::new("package.json"), &text).unwrap()
    }

    fn on_disk(dir: &TempDir, version: &str) -> (Utf8PathBuf, Manifest) {
        let path = Utf8PathBuf::try_from(dir.path().join("package.json")).unwrap();
        fs::write(
            &path,
            format!("{{\n  \"name\": \"demo\",\n  \"version\": \"{version}\"\n}}\n"),
        )
        .unwrap();
        let manifest = Manifest::load(&path).unwrap();
        (path, manifest)
    }

    fn options(level: BumpLevel, directive: &str) -> ReleaseOptions {
        ReleaseOptions {
            level: Some(level),
            directive: Directive::parse(directive),
            ..ReleaseOptions::default()
        }
    }

    fn commands(plan: &ReleasePlan) -> Vec<&str> {
        plan.steps.iter().map(|s| s.command.as_str()).collect()
    }

    #[test]
    fn patch_release_resolves_latest() {
        let ready = plan_release(manifest("1.2.3"), &options(BumpLevel::Patch, "")).unwrap();
        assert_eq!(ready.plan.next.to_string(), "1.2.4");
        assert_eq!(ready.plan.tag, "latest");
    }

    #[test]
    fn pre_alpha_from_release_opens_next_patch() {
        let ready = plan_release(manifest("1.2.3"), &options(BumpLevel::Pre, "alpha")).unwrap();
        assert_eq!(ready.plan.next.to_string(), "1.2.4-alpha.0");
        assert_eq!(ready.plan.tag, "next");
    }

    #[test]
    fn pre_beta_after_alpha() {
        let ready =
            plan_release(manifest("1.2.4-alpha.0"), &options(BumpLevel::Pre, "beta")).unwrap();
        assert_eq!(ready.plan.next.to_string(), "1.2.4-beta.0");
    }

    #[test]
    fn pre_alpha_after_beta_is_a_downgrade() {
        let err = plan_release(manifest("1.2.4-beta.0"), &options(BumpLevel::Pre, "alpha"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Downgrade);
        assert!(matches!(
            err,
            ReleaseError::Version(VersionError::PreReleaseDowngrade {
                requested: PreKind::Alpha,
                current: PreKind::Beta,
            })
        ));
    }

    #[test]
    fn unsupported_directive_fails_in_plan() {
        let err =
            plan_release(manifest("1.2.3"), &options(BumpLevel::Pre, "gamma")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedPreRelease);
    }

    #[test]
    fn no_level_increments_last_component() {
        let ready = plan_release(manifest("1.2.3"), &ReleaseOptions::default()).unwrap();
        assert_eq!(ready.plan.next.to_string(), "1.2.4");

        let ready = plan_release(manifest("1.2.4-rc.1"), &ReleaseOptions::default()).unwrap();
        assert_eq!(ready.plan.next.to_string(), "1.2.4-rc.2");
    }

    #[test]
    fn plan_builds_fixed_pipeline() {
        let ready = plan_release(manifest("1.2.3"), &options(BumpLevel::Minor, "")).unwrap();
        assert_eq!(
            commands(&ready.plan),
            vec![
                "git add .",
                "git commit -a -m 'chore: bump version (bump version: 1.3.0)'",
                "git tag -a 1.3.0 -m 'chore: bump version (bump version: 1.3.0)'",
                "git push",
                "git push --tags",
                "npm publish --tag latest --registry https://registry.npmjs.org/",
            ]
        );
    }

    #[test]
    fn message_is_trimmed_and_suffixed() {
        let next = parse_version("2.0.0").unwrap();
        assert_eq!(
            commit_message(Some("  release it  "), &next),
            "release it (bump version: 2.0.0)"
        );
        assert_eq!(
            commit_message(Some("   "), &next),
            "chore: bump version (bump version: 2.0.0)"
        );
        assert_eq!(
            commit_message(None, &next),
            "chore: bump version (bump version: 2.0.0)"
        );
    }

    #[test]
    fn tag_override_wins() {
        let pre = parse_version("1.0.0-rc.0").unwrap();
        assert_eq!(publish_tag(Some("beta"), &pre), "beta");
        assert_eq!(publish_tag(Some(""), &pre), "next");
        assert_eq!(publish_tag(None, &Version::new(1, 0, 0)), "latest");
    }

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("1.2.4-alpha.0"), "1.2.4-alpha.0");
        assert_eq!(shell_quote("it's done"), r"'it'\''s done'");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("$(rm -rf /)"), "'$(rm -rf /)'");
    }

    #[test]
    fn config_fills_unset_options() {
        let config = ReleaseConfig {
            message: Some("from config".into()),
            registry: Some("https://npm.example.com/".into()),
            tag: None,
            push: Some(false),
            publish: None,
            update_manifest: Some(false),
        };
        let options = ReleaseOptions {
            message: Some("from flag".into()),
            ..ReleaseOptions::default()
        }
        .with_config(Some(&config));

        assert_eq!(options.message.as_deref(), Some("from flag"));
        assert_eq!(options.registry.as_deref(), Some("https://npm.example.com/"));
        assert!(options.tag.is_none());
        assert!(options.no_push);
        assert!(!options.no_publish);
        assert!(options.no_manifest);
    }

    #[test]
    fn execute_writes_manifest_then_runs_pipeline() {
        let tmp = TempDir::new().unwrap();
        let (path, manifest) = on_disk(&tmp, "1.2.3");
        let ready = plan_release(manifest, &options(BumpLevel::Patch, "")).unwrap();

        let mut runner = RecordingRunner::default();
        let mut manifest_events = 0;
        let outcome = ready
            .execute(&mut runner, |event| {
                if let ReleaseEvent::ManifestUpdated { version, .. } = event {
                    assert_eq!(version.to_string(), "1.2.4");
                    manifest_events += 1;
                }
            })
            .unwrap();

        assert_eq!(manifest_events, 1);
        assert!(outcome.manifest_updated);
        assert_eq!(runner.ran.len(), 6);
        assert!(fs::read_to_string(&path).unwrap().contains("\"1.2.4\""));
    }

    #[test]
    fn dry_run_touches_nothing() {
        let tmp = TempDir::new().unwrap();
        let (path, manifest) = on_disk(&tmp, "1.2.3");
        let before = fs::read_to_string(&path).unwrap();
        let opts = ReleaseOptions {
            dry_run: true,
            ..options(BumpLevel::Major, "")
        };
        let ready = plan_release(manifest, &opts).unwrap();

        let mut runner = RecordingRunner::default();
        let mut announced = 0;
        let outcome = ready
            .execute(&mut runner, |event| {
                if let ReleaseEvent::Pipeline(PipelineEvent::Announced { dry: true, .. }) = event {
                    announced += 1;
                }
            })
            .unwrap();

        assert!(runner.ran.is_empty());
        assert_eq!(announced, 6);
        assert!(outcome.dry_run);
        assert!(!outcome.manifest_updated);
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn nopkg_still_runs_pipeline() {
        let tmp = TempDir::new().unwrap();
        let (path, manifest) = on_disk(&tmp, "1.2.3");
        let before = fs::read_to_string(&path).unwrap();
        let opts = ReleaseOptions {
            no_manifest: true,
            no_push: true,
            no_publish: true,
            ..options(BumpLevel::Patch, "")
        };
        let ready = plan_release(manifest, &opts).unwrap();

        let mut runner = RecordingRunner::default();
        let outcome = ready.execute(&mut runner, |_| {}).unwrap();

        assert!(!outcome.manifest_updated);
        assert_eq!(outcome.pipeline.skipped(), 3);
        assert_eq!(runner.ran.len(), 3);
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn missing_program_fails_before_manifest_write() {
        let tmp = TempDir::new().unwrap();
        let (path, manifest) = on_disk(&tmp, "1.2.3");
        let before = fs::read_to_string(&path).unwrap();
        let ready = plan_release(manifest, &options(BumpLevel::Patch, "")).unwrap();

        let mut runner = RecordingRunner::without_program("npm");
        let err = ready.execute(&mut runner, |_| {}).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::CommandFailure);
        assert!(runner.ran.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn command_failure_keeps_completed_steps() {
        let tmp = TempDir::new().unwrap();
        let (path, manifest) = on_disk(&tmp, "1.2.3");
        let ready = plan_release(manifest, &options(BumpLevel::Patch, "")).unwrap();

        let mut runner = RecordingRunner::failing_on("git push");
        let err = ready.execute(&mut runner, |_| {}).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::CommandFailure);
        assert_eq!(runner.ran.len(), 3);
        assert!(fs::read_to_string(&path).unwrap().contains("\"1.2.4\""));
    }
}
