//! Library interface for the `bumpr` CLI.
//!
//! This crate exposes the CLI's argument parser as a library, primarily for
//! documentation generation and testing. The actual entry point is in
//! `main.rs`.
//!
//! # Structure
//!
//! - [`Cli`] - The root argument parser (clap derive)
//! - [`commands`] - Command implementations
//!
//! # Documentation Generation
//!
//! The [`command()`] function returns the clap `Command` for generating man pages
//! and shell completions via `xtask`.

pub mod commands;

use bumpr_core::release::ReleaseOptions;
use bumpr_core::version::{BumpLevel, Directive};
use clap::{ArgGroup, CommandFactory, Parser};
use std::path::PathBuf;

/// Color output preference.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect terminal capabilities automatically.
    #[default]
    Auto,
    /// Always emit colors.
    Always,
    /// Never emit colors.
    Never,
}

impl ColorChoice {
    /// Configure global color output based on this choice.
    ///
    /// Call this once at startup to set the color mode.
    pub fn apply(self) {
        match self {
            Self::Auto => {} // owo-colors auto-detects by default
            Self::Always => owo_colors::set_override(true),
            Self::Never => owo_colors::set_override(false),
        }
    }
}

const AFTER_HELP: &str = "\
BUMP TYPES:
    (none)          increment by one
    alpha, a        next version as an alpha pre-release
    beta, b         beta pre-release (--pre only)
    rc, pre, r      release candidate (--pre only)
    <N>             set the component to exactly N (no downgrades)

ENVIRONMENT VARIABLES:
    RUST_LOG        Log filter (e.g., debug, bumpr=trace)
    BUMPR_LOG_PATH  Explicit log file path
    BUMPR_LOG_DIR   Log directory
";

/// Command-line interface definition for bumpr.
#[derive(Parser, Debug)]
#[command(name = "bumpr")]
#[command(about = "Bump a package version, tag it, push it and publish it", long_about = None)]
#[command(version)]
#[command(after_long_help = AFTER_HELP)]
#[command(group(ArgGroup::new("bump").args(["major", "minor", "patch", "pre"])))]
pub struct Cli {
    /// Show the local version next to the published dist-tags, then exit
    #[arg(long, conflicts_with = "bump")]
    pub check: bool,

    /// Bump the major version
    #[arg(short = '1', long, value_name = "TYPE")]
    pub major: Option<Option<String>>,

    /// Bump the minor version
    #[arg(short = '2', long, value_name = "TYPE")]
    pub minor: Option<Option<String>>,

    /// Bump the patch version
    #[arg(short = '3', long, value_name = "TYPE")]
    pub patch: Option<Option<String>>,

    /// Bump the pre-release version
    #[arg(short = '4', long, value_name = "TYPE")]
    pub pre: Option<Option<String>>,

    /// Publish under this dist-tag [default: next for pre-releases, else latest]
    #[arg(long, value_name = "TAG")]
    pub tag: Option<Option<String>>,

    /// Do not rewrite package.json
    #[arg(long)]
    pub nopkg: bool,

    /// Do not push commits or tags
    #[arg(long)]
    pub nopush: bool,

    /// Do not publish to the registry
    #[arg(long)]
    pub nopublish: bool,

    /// Commit and tag message [default: "chore: bump version"]
    #[arg(long, value_name = "TEXT")]
    pub msg: Option<String>,

    /// Registry URL [default: https://registry.npmjs.org/]
    #[arg(long, value_name = "URL")]
    pub registry: Option<String>,

    /// Show what would happen without changing anything
    #[arg(long)]
    pub dry: bool,

    /// Path to configuration file (overrides discovery)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Run as if started in DIR
    #[arg(short = 'C', long)]
    pub chdir: Option<PathBuf>,

    /// Only print errors (suppresses warnings/info)
    #[arg(short, long)]
    pub quiet: bool,

    /// More detail (repeatable; e.g. -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Colorize output
    #[arg(long, value_enum, default_value_t)]
    pub color: ColorChoice,

    /// Output as JSON (for scripting)
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// The requested bump level and its directive, if any bump flag was given.
    pub fn bump(&self) -> Option<(BumpLevel, Directive)> {
        [
            (BumpLevel::Major, &self.major),
            (BumpLevel::Minor, &self.minor),
            (BumpLevel::Patch, &self.patch),
            (BumpLevel::Pre, &self.pre),
        ]
        .into_iter()
        .find_map(|(level, value)| {
            value
                .as_ref()
                .map(|v| (level, Directive::from_flag(v.as_deref())))
        })
    }

    /// Release options from the flags alone (config is merged later).
    pub fn release_options(&self) -> ReleaseOptions {
        let (level, directive) = self
            .bump()
            .map_or((None, Directive::Increment), |(l, d)| (Some(l), d));
        ReleaseOptions {
            level,
            directive,
            message: self.msg.clone(),
            tag: self.tag.clone().flatten(),
            registry: self.registry.clone(),
            no_manifest: self.nopkg,
            no_push: self.nopush,
            no_publish: self.nopublish,
            dry_run: self.dry,
        }
    }
}

/// Returns the clap command for documentation generation
pub fn command() -> clap::Command {
    Cli::command()
}
