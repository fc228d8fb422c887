//! End-to-end CLI integration tests
//!
//! These tests invoke the compiled binary as a subprocess. Everything runs
//! in dry-run mode or fails before the pipeline starts, so neither git nor
//! the network is touched.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Returns a Command configured to run our binary.
///
/// Note: `cargo_bin` is marked deprecated for edge cases involving custom
/// cargo build directories, but works correctly for standard project layouts.
#[allow(deprecated)]
fn cmd() -> Command {
    Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap()
}

/// A temp project with a `package.json` at `version`.
fn project(version: &str) -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("package.json"),
        format!("{{\n  \"name\": \"demo\",\n  \"version\": \"{version}\",\n  \"private\": true\n}}\n"),
    )
    .unwrap();
    tmp
}

/// Command running inside `dir`, logging into a throwaway directory.
fn in_project(dir: &Path) -> Command {
    let mut command = cmd();
    command
        .env("BUMPR_LOG_DIR", dir.join(".logs"))
        .arg("-C")
        .arg(dir);
    command
}

fn manifest(dir: &Path) -> String {
    fs::read_to_string(dir.join("package.json")).unwrap()
}

/// Run a dry release with `--json` and parse the outcome.
fn dry_release(dir: &Path, args: &[&str]) -> Value {
    let output = in_project(dir)
        .args(["--dry", "--json"])
        .args(args)
        .assert()
        .success();
    serde_json::from_slice(&output.get_output().stdout).expect("--json should output valid JSON")
}

fn commands(outcome: &Value) -> Vec<(String, String)> {
    outcome["pipeline"]["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| {
            (
                s["command"].as_str().unwrap().to_owned(),
                s["decision"].as_str().unwrap().to_owned(),
            )
        })
        .collect()
}

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_shows_usage() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("--major"))
        .stdout(predicate::str::contains("--nopublish"));
}

#[test]
fn long_help_lists_bump_types() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("BUMP TYPES:"))
        .stdout(predicate::str::contains("BUMPR_LOG_DIR"));
}

#[test]
fn version_flag_shows_version() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

// =============================================================================
// Dry-run releases
// =============================================================================

#[test]
fn patch_bump_resolves_latest() {
    let tmp = project("1.2.3");
    let outcome = dry_release(tmp.path(), &["--patch"]);

    assert_eq!(outcome["previous"], "1.2.3");
    assert_eq!(outcome["version"], "1.2.4");
    assert_eq!(outcome["tag"], "latest");
    assert_eq!(outcome["dry_run"], true);
    assert_eq!(outcome["manifest_updated"], false);
}

#[test]
fn pre_alpha_from_release_resolves_next() {
    let tmp = project("1.2.3");
    let outcome = dry_release(tmp.path(), &["--pre", "alpha"]);

    assert_eq!(outcome["version"], "1.2.4-alpha.0");
    assert_eq!(outcome["tag"], "next");
}

#[test]
fn pre_beta_after_alpha() {
    let tmp = project("1.2.4-alpha.0");
    let outcome = dry_release(tmp.path(), &["-4", "beta"]);
    assert_eq!(outcome["version"], "1.2.4-beta.0");
}

#[test]
fn pre_rc_from_release_keeps_core() {
    let tmp = project("1.2.3");
    let outcome = dry_release(tmp.path(), &["--pre", "rc"]);
    assert_eq!(outcome["version"], "1.2.3-rc.0");
    assert_eq!(outcome["tag"], "next");
}

#[test]
fn bare_pre_increments_counter() {
    let tmp = project("1.2.4-alpha.2");
    let outcome = dry_release(tmp.path(), &["--pre"]);
    assert_eq!(outcome["version"], "1.2.4-alpha.3");
}

#[test]
fn explicit_major_sets_component() {
    let tmp = project("1.2.3");
    let outcome = dry_release(tmp.path(), &["-1", "4"]);
    assert_eq!(outcome["version"], "4.0.0");
}

#[test]
fn no_bump_flag_increments_last_component() {
    let tmp = project("0.9.1-rc.0");
    let outcome = dry_release(tmp.path(), &[]);
    assert_eq!(outcome["version"], "0.9.1-rc.1");
}

#[test]
fn dry_run_announces_every_step_and_leaves_manifest() {
    let tmp = project("1.2.3");
    let before = manifest(tmp.path());
    let outcome = dry_release(tmp.path(), &["--minor"]);

    let steps = commands(&outcome);
    assert_eq!(steps.len(), 6);
    assert!(steps.iter().all(|(_, decision)| decision == "announce"));
    assert_eq!(steps[0].0, "git add .");
    assert_eq!(steps[2].0, "git tag -a 1.3.0 -m 'chore: bump version (bump version: 1.3.0)'");
    assert_eq!(
        steps[5].0,
        "npm publish --tag latest --registry https://registry.npmjs.org/"
    );
    assert_eq!(manifest(tmp.path()), before);
}

#[test]
fn skip_flags_mark_steps_skipped() {
    let tmp = project("1.2.3");
    let outcome = dry_release(tmp.path(), &["--patch", "--nopush", "--nopublish"]);

    let skipped: Vec<_> = commands(&outcome)
        .into_iter()
        .filter(|(_, decision)| decision == "skip")
        .map(|(command, _)| command)
        .collect();
    assert_eq!(
        skipped,
        vec![
            "git push".to_owned(),
            "git push --tags".to_owned(),
            "npm publish --tag latest --registry https://registry.npmjs.org/".to_owned(),
        ]
    );
}

#[test]
fn msg_tag_and_registry_flags_reach_commands() {
    let tmp = project("1.2.3");
    let outcome = dry_release(
        tmp.path(),
        &[
            "--patch",
            "--msg",
            "release it",
            "--tag",
            "canary",
            "--registry",
            "https://npm.example.com/",
        ],
    );

    assert_eq!(outcome["tag"], "canary");
    let steps = commands(&outcome);
    assert_eq!(steps[1].0, "git commit -a -m 'release it (bump version: 1.2.4)'");
    assert_eq!(
        steps[5].0,
        "npm publish --tag canary --registry https://npm.example.com/"
    );
}

#[test]
fn human_dry_run_output() {
    let tmp = project("1.2.3");
    in_project(tmp.path())
        .args(["--dry", "--patch", "--nopush"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1.2.4"))
        .stdout(predicate::str::contains("[dry]"))
        .stdout(predicate::str::contains("git add ."))
        .stdout(predicate::str::contains("(skipped)"))
        .stdout(predicate::str::contains("Dry run: nothing was changed."));
}

// =============================================================================
// Bump errors
// =============================================================================

#[test]
fn pre_release_downgrade_fails_without_touching_anything() {
    let tmp = project("1.2.4-beta.0");
    let before = manifest(tmp.path());

    // Not a dry run: the failure must happen before the pipeline starts.
    in_project(tmp.path())
        .args(["--pre", "alpha"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot downgrade pre-release"));

    assert_eq!(manifest(tmp.path()), before);
}

#[test]
fn explicit_component_downgrade_fails() {
    let tmp = project("1.5.0");
    in_project(tmp.path())
        .args(["--dry", "--minor", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot downgrade minor from 5 to 3"));
}

#[test]
fn unsupported_pre_release_name_fails() {
    let tmp = project("1.2.3");
    in_project(tmp.path())
        .args(["--dry", "--pre", "gamma"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported pre-release name"));
}

#[test]
fn malformed_manifest_version_fails() {
    let tmp = project("1.two.3");
    in_project(tmp.path())
        .args(["--dry", "--patch"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed version"));
}

#[test]
fn missing_manifest_fails() {
    let tmp = TempDir::new().unwrap();
    in_project(tmp.path())
        .args(["--dry", "--patch"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load"));
}

// =============================================================================
// Check
// =============================================================================

#[test]
fn check_with_unreachable_registry_fails() {
    let tmp = project("1.2.3");
    in_project(tmp.path())
        .args(["--check", "--registry", "http://127.0.0.1:9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to look up demo"));
}

// =============================================================================
// Flag parsing
// =============================================================================

#[test]
fn bump_flags_are_mutually_exclusive() {
    cmd()
        .args(["--major", "--patch"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn check_conflicts_with_bump_flags() {
    cmd()
        .args(["--check", "--patch"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn invalid_flag_shows_error() {
    cmd()
        .arg("--not-a-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn global_flags_accepted() {
    let tmp = project("1.2.3");
    let cases: [&[&str]; 6] = [
        &["--quiet"],
        &["-q"],
        &["--verbose"],
        &["-vv"],
        &["--color", "always"],
        &["--color", "never"],
    ];
    for flags in cases {
        in_project(tmp.path())
            .args(flags)
            .args(["--dry", "--patch"])
            .assert()
            .success();
    }
}

#[test]
fn chdir_nonexistent_fails() {
    cmd()
        .args(["-C", "/nonexistent/path/that/does/not/exist", "--dry"])
        .assert()
        .failure();
}
