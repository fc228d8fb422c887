//! Core library for bumpr.
//!
//! This crate provides the version arithmetic and release pipeline used by
//! the `bumpr` CLI and any downstream consumers.
//!
//! # Modules
//!
//! - [`version`] - Version model, parser, generator and bump engine
//! - [`manifest`] - `package.json` reading and version rewriting
//! - [`pipeline`] - Sequential, fail-fast command execution
//! - [`release`] - Release planning and execution
//! - [`registry`] - npm registry dist-tag lookup
//! - [`check`] - Local vs. published version report
//! - [`config`] - Configuration loading and management
//! - [`error`] - Error types and the [`ErrorKind`] classification
//!
//! # Quick Start
//!
//! ```no_run
//! use bumpr_core::manifest::Manifest;
//! use bumpr_core::release::{ReleaseOptions, plan_release};
//! use bumpr_core::version::{BumpLevel, Directive};
//! use camino::Utf8Path;
//!
//! let manifest = Manifest::load(Utf8Path::new("package.json")).unwrap();
//! let options = ReleaseOptions {
//!     level: Some(BumpLevel::Pre),
//!     directive: Directive::Beta,
//!     dry_run: true,
//!     ..ReleaseOptions::default()
//! };
//! let ready = plan_release(manifest, &options).unwrap();
//! println!("{} -> {}", ready.plan.previous, ready.plan.next);
//! ```
#![deny(unsafe_code)]

pub mod check;

pub mod config;

pub mod error;

pub mod manifest;

pub mod pipeline;

pub mod registry;

pub mod release;

pub mod version;

pub use config::{Config, ConfigLoader, LogLevel, ReleaseConfig};

pub use error::{ConfigError, ConfigResult, ErrorKind};

pub use version::{Version, VersionError, generate_version, parse_version};

// Re-export semver so downstream crates don't need a direct dependency.
pub use semver;
