//! Release command: thin CLI layer over `bumpr_core::release`.

use std::time::Duration;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use bumpr_core::config::Config;
use bumpr_core::pipeline::{CommandOutput, PipelineError, PipelineEvent, ShellRunner};
use bumpr_core::release::{self, ManifestSkip, ReleaseEvent, ReleaseOptions, ReleasePlan};

/// Bump, commit, tag, push and publish.
#[instrument(name = "cmd_release", skip_all, fields(json_output = json, dry_run = options.dry_run))]
pub fn cmd_release(
    options: ReleaseOptions,
    json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    let options = options.with_config(config.release.as_ref());
    debug!(?options, "executing release");

    let manifest = super::load_manifest(config, cwd)?;
    let ready = release::plan_release(manifest, &options).context("cannot compute next version")?;

    if !json {
        print_plan(&ready.plan);
    }

    let mut runner = ShellRunner::new(cwd);
    let mut display = EventDisplay::new(json);
    let outcome = ready
        .execute(&mut runner, |event| display.show(event))
        .context("release failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else if outcome.dry_run {
        println!();
        println!("{}", "Dry run: nothing was changed.".yellow());
    } else {
        println!();
        println!(
            "  {} Released {}@{} ({})",
            "✓".green(),
            outcome.package.bold(),
            outcome.version.to_string().green().bold(),
            outcome.tag.cyan()
        );
    }

    Ok(())
}

fn print_plan(plan: &ReleasePlan) {
    println!(
        "{}: {} → {}",
        "Version".bold(),
        plan.previous.to_string().dimmed(),
        plan.next.to_string().green().bold()
    );
    println!("{}: {}", "Message".dimmed(), plan.message);
    println!("{}: {}", "Tag".dimmed(), plan.tag);
    println!("{}: {}", "Registry".dimmed(), plan.registry);
    println!();
}

/// Prints pipeline progress, with a spinner while a command runs.
struct EventDisplay {
    quiet: bool,
    spinner: Option<ProgressBar>,
}

impl EventDisplay {
    const fn new(quiet: bool) -> Self {
        Self {
            quiet,
            spinner: None,
        }
    }

    fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    fn show(&mut self, event: ReleaseEvent<'_>) {
        if self.quiet {
            return;
        }
        match event {
            ReleaseEvent::ManifestUpdated { path, version } => {
                println!("  {} {} → {}", "✓".green(), path.as_str().cyan(), version);
            }
            ReleaseEvent::ManifestSkipped(ManifestSkip::Disabled) => {
                println!("  {} {}", "-".dimmed(), "manifest left unchanged".dimmed());
            }
            ReleaseEvent::ManifestSkipped(ManifestSkip::DryRun) => {}
            ReleaseEvent::Pipeline(PipelineEvent::Skipped(step)) => {
                println!("  {} {} {}", "-".dimmed(), step.command.dimmed(), "(skipped)".dimmed());
            }
            ReleaseEvent::Pipeline(PipelineEvent::Announced { step, dry: true }) => {
                println!("  {} {} {}", "○".yellow(), "[dry]".yellow(), step.command);
            }
            ReleaseEvent::Pipeline(PipelineEvent::Announced { step, dry: false }) => {
                let spinner = ProgressBar::new_spinner();
                spinner.set_style(
                    ProgressStyle::with_template("  {spinner:.cyan} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                spinner.set_message(step.command.clone());
                spinner.enable_steady_tick(Duration::from_millis(100));
                self.spinner = Some(spinner);
            }
            ReleaseEvent::Pipeline(PipelineEvent::Completed { step, output }) => {
                self.stop_spinner();
                println!("  {} {}", "✓".green(), step.command);
                for line in captured_lines(output) {
                    println!("    {}", line.dimmed());
                }
            }
            ReleaseEvent::Pipeline(PipelineEvent::Failed { step, error }) => {
                self.stop_spinner();
                println!("  {} {}", "✗".red(), step.command.red());
                println!("    {}", error.to_string().red());
                if let PipelineError::CommandFailed { stderr, .. } = error {
                    for line in stderr.lines() {
                        println!("    {}", line.dimmed());
                    }
                }
            }
        }
    }
}

/// Non-blank lines a step printed, stdout first. `git push` and
/// `npm publish` report progress on stderr.
fn captured_lines(output: &CommandOutput) -> impl Iterator<Item = &str> {
    output
        .stdout
        .lines()
        .chain(output.stderr.lines())
        .filter(|line| !line.trim().is_empty())
}

impl Drop for EventDisplay {
    fn drop(&mut self) {
        self.stop_spinner();
    }
}
