//! Command pipeline executor.
//!
//! Runs an ordered list of shell commands one at a time, fail-fast. Each
//! step goes through two separate stages:
//!
//! 1. **Decide** ([`PipelinePolicy::decide`]): skip it (`--nopush`,
//!    `--nopublish`), only announce it (`--dry`), or run it.
//! 2. **Run** ([`CommandRunner::run`]): execute and capture output.
//!
//! The runner is a trait so tests can swap in a recording fake instead of
//! spawning processes. [`ShellRunner`] is the real implementation and runs
//! each command through `sh -c`, inheriting the user's git and npm setup.
//!
//! Nothing is rolled back when a step fails; steps that already ran stay run.

use std::collections::BTreeSet;
use std::process::Command;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Errors from pipeline execution.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A command exited with a non-zero status.
    #[error("command failed: {command}{}", exit_suffix(.exit_code))]
    CommandFailed {
        /// The command that failed.
        command: String,
        /// The exit code, if the process exited normally.
        exit_code: Option<i32>,
        /// Captured stderr.
        stderr: String,
    },

    /// The command could not be spawned at all.
    #[error("failed to execute {command}: {source}")]
    Spawn {
        /// The command that could not be started.
        command: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A program the pipeline needs is not on `PATH`.
    #[error("required program not found on PATH: {program}")]
    MissingProgram {
        /// The program name.
        program: String,
    },
}

fn exit_suffix(code: &Option<i32>) -> String {
    code.map_or_else(String::new, |c| format!(" (exit code {c})"))
}

/// Result alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

// ──────────────────────────────────────────────
// Steps and policy
// ──────────────────────────────────────────────

/// What a pipeline step does, as far as the skip policy cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// `git push ...`
    Push,
    /// `npm publish ...`
    Publish,
    /// Anything else (stage, commit, tag).
    Local,
}

impl StepKind {
    /// Classify a shell command by its leading program and subcommand.
    pub fn classify(command: &str) -> Self {
        let mut words = command.split_whitespace();
        match (words.next(), words.next()) {
            (Some("git"), Some("push")) => Self::Push,
            (Some("npm"), Some("publish")) => Self::Publish,
            _ => Self::Local,
        }
    }
}

/// A single command in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineStep {
    /// Shell command line.
    pub command: String,
    /// Classification used by the skip policy.
    pub kind: StepKind,
}

impl PipelineStep {
    /// Create a step, classifying it from the command text.
    pub fn new(command: impl Into<String>) -> Self {
        let command = command.into();
        let kind = StepKind::classify(&command);
        Self { command, kind }
    }

    /// The program this step invokes (first word of the command).
    pub fn program(&self) -> Option<&str> {
        self.command.split_whitespace().next()
    }
}

/// Execution policy for a pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelinePolicy {
    /// Announce commands without executing anything.
    pub dry_run: bool,
    /// Skip `git push` steps.
    pub skip_push: bool,
    /// Skip `npm publish` steps.
    pub skip_publish: bool,
}

/// What the policy decided for one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepDecision {
    /// Execute the command.
    Run,
    /// Announce only (dry run).
    Announce,
    /// Do not touch it.
    Skip,
}

impl PipelinePolicy {
    /// Decide what to do with a step. Skip flags win over dry run.
    pub const fn decide(&self, step: &PipelineStep) -> StepDecision {
        let skipped = match step.kind {
            StepKind::Push => self.skip_push,
            StepKind::Publish => self.skip_publish,
            StepKind::Local => false,
        };
        if skipped {
            StepDecision::Skip
        } else if self.dry_run {
            StepDecision::Announce
        } else {
            StepDecision::Run
        }
    }
}

// ──────────────────────────────────────────────
// Runners
// ──────────────────────────────────────────────

/// Captured output of a command that succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
    /// Wall-clock time the command took.
    pub duration: Duration,
}

/// Executes a single command synchronously.
pub trait CommandRunner {
    /// Run `command` to completion. Non-zero exit is an error.
    fn run(&mut self, command: &str) -> PipelineResult<CommandOutput>;

    /// Confirm that `program` can be started before anything runs.
    fn locate(&self, program: &str) -> PipelineResult<()> {
        let _ = program;
        Ok(())
    }
}

/// Runs commands through `sh -c` in a fixed working directory.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    cwd: Utf8PathBuf,
}

impl ShellRunner {
    /// Create a runner rooted at `cwd`.
    pub fn new(cwd: impl AsRef<Utf8Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
        }
    }
}

impl CommandRunner for ShellRunner {
    fn locate(&self, program: &str) -> PipelineResult<()> {
        let path = which::which(program).map_err(|_| PipelineError::MissingProgram {
            program: program.to_owned(),
        })?;
        debug!(program, path = %path.display(), "located program");
        Ok(())
    }

    fn run(&mut self, command: &str) -> PipelineResult<CommandOutput> {
        debug!(%command, cwd = %self.cwd, "running command");

        let start = Instant::now();
        let output = Command::new("sh")
            .args(["-c", command])
            .current_dir(self.cwd.as_std_path())
            .output()
            .map_err(|source| PipelineError::Spawn {
                command: command.to_owned(),
                source,
            })?;
        let duration = start.elapsed();

        if !output.status.success() {
            return Err(PipelineError::CommandFailed {
                command: command.to_owned(),
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration,
        })
    }
}

// ──────────────────────────────────────────────
// Execution
// ──────────────────────────────────────────────

/// Progress events emitted while the pipeline runs.
#[derive(Debug, Clone)]
pub enum PipelineEvent<'a> {
    /// The step was skipped by policy.
    Skipped(&'a PipelineStep),
    /// The step is about to run (or, when `dry` is set, would run).
    Announced {
        /// The step being announced.
        step: &'a PipelineStep,
        /// Whether this is a dry-run announcement.
        dry: bool,
    },
    /// The step finished successfully.
    Completed {
        /// The step that ran.
        step: &'a PipelineStep,
        /// What it printed.
        output: &'a CommandOutput,
    },
    /// The step failed; the pipeline stops here.
    Failed {
        /// The step that failed.
        step: &'a PipelineStep,
        /// The failure.
        error: &'a PipelineError,
    },
}

/// Per-step outcome recorded in a [`PipelineReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    /// The command line.
    pub command: String,
    /// What the policy decided.
    pub decision: StepDecision,
}

/// Summary of a completed pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    /// Every step in order, with its decision.
    pub steps: Vec<StepRecord>,
}

impl PipelineReport {
    /// Number of steps that actually executed.
    pub fn executed(&self) -> usize {
        self.count(StepDecision::Run)
    }

    /// Number of steps skipped by policy.
    pub fn skipped(&self) -> usize {
        self.count(StepDecision::Skip)
    }

    fn count(&self, decision: StepDecision) -> usize {
        self.steps.iter().filter(|s| s.decision == decision).count()
    }
}

/// Check that every program the pipeline will actually run is available.
///
/// Steps that the policy skips or only announces are not checked, so a dry
/// run or `--nopublish` works without `npm` installed.
pub fn preflight(
    steps: &[PipelineStep],
    policy: PipelinePolicy,
    runner: &dyn CommandRunner,
) -> PipelineResult<()> {
    let mut checked = BTreeSet::new();
    for step in steps {
        if policy.decide(step) != StepDecision::Run {
            continue;
        }
        if let Some(program) = step.program()
            && checked.insert(program)
        {
            runner.locate(program)?;
        }
    }
    Ok(())
}

/// Run `steps` in order under `policy`, stopping at the first failure.
#[instrument(skip_all, fields(count = steps.len(), dry_run = policy.dry_run))]
pub fn run_pipeline(
    steps: &[PipelineStep],
    policy: PipelinePolicy,
    runner: &mut dyn CommandRunner,
    mut on_event: impl FnMut(PipelineEvent<'_>),
) -> PipelineResult<PipelineReport> {
    let mut report = PipelineReport::default();

    for step in steps {
        let decision = policy.decide(step);
        report.steps.push(StepRecord {
            command: step.command.clone(),
            decision,
        });

        match decision {
            StepDecision::Skip => {
                debug!(command = %step.command, kind = ?step.kind, "skipping step");
                on_event(PipelineEvent::Skipped(step));
            }
            StepDecision::Announce => {
                on_event(PipelineEvent::Announced { step, dry: true });
            }
            StepDecision::Run => {
                on_event(PipelineEvent::Announced { step, dry: false });
                match runner.run(&step.command) {
                    Ok(output) => {
                        debug!(
                            command = %step.command,
                            stdout = %output.stdout.trim(),
                            stderr = %output.stderr.trim(),
                            elapsed_ms = output.duration.as_millis(),
                            "step completed"
                        );
                        on_event(PipelineEvent::Completed {
                            step,
                            output: &output,
                        });
                    }
                    Err(error) => {
                        warn!(command = %step.command, %error, "pipeline step failed");
                        on_event(PipelineEvent::Failed {
                            step,
                            error: &error,
                        });
                        return Err(error);
                    }
                }
            }
        }
    }

    info!(
        executed = report.executed(),
        skipped = report.skipped(),
        "pipeline finished"
    );
    Ok(report)
}

/// In-memory runner that records commands instead of executing them.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingRunner {
    pub(crate) ran: Vec<String>,
    fail_on: Option<String>,
    missing: Vec<String>,
}

#[cfg(test)]
impl RecordingRunner {
    /// Fail (without recording) any command starting with `prefix`.
    pub(crate) fn failing_on(prefix: &str) -> Self {
        Self {
            fail_on: Some(prefix.to_owned()),
            ..Self::default()
        }
    }

    /// Report `program` as not installed.
    pub(crate) fn without_program(program: &str) -> Self {
        Self {
            missing: vec![program.to_owned()],
            ..Self::default()
        }
    }
}

#[cfg(test)]
impl CommandRunner for RecordingRunner {
    fn run(&mut self, command: &str) -> PipelineResult<CommandOutput> {
        if self
            .fail_on
            .as_deref()
            .is_some_and(|prefix| command.starts_with(prefix))
        {
            return Err(PipelineError::CommandFailed {
                command: command.to_owned(),
                exit_code: Some(1),
                stderr: "simulated failure".into(),
            });
        }
        self.ran.push(command.to_owned());
        Ok(CommandOutput {
            stdout: format!("ran {command}"),
            ..CommandOutput::default()
        })
    }

    fn locate(&self, program: &str) -> PipelineResult<()> {
        if self.missing.iter().any(|m| m == program) {
            return Err(PipelineError::MissingProgram {
                program: program.to_owned(),
            });
        }
        Ok(())
    }
}
