//! Structured logging.
//!
//! Log events are written as JSON lines to a daily-rolling file. stdout is
//! never touched: it carries the release report (and `--json` output). When
//! no log file can be opened, logs go to stderr instead.
//!
//! Log file resolution, first match wins:
//!
//! 1. `BUMPR_LOG_PATH` (full file path)
//! 2. `BUMPR_LOG_DIR`
//! 3. `log_dir` from configuration
//! 4. `/var/log`, the platform data directory, then the working directory

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const ENV_LOG_PATH: &str = "BUMPR_LOG_PATH";
const ENV_LOG_DIR: &str = "BUMPR_LOG_DIR";
const DEFAULT_LOG_DIR_UNIX: &str = "/var/log";
const LOG_FILE_SUFFIX: &str = ".jsonl";

/// Why a log file could not be used.
#[derive(Debug, Error)]
pub enum LogTargetError {
    /// `BUMPR_LOG_PATH` has no usable file name.
    #[error("{ENV_LOG_PATH} must end in a UTF-8 file name: {0}")]
    BadPath(PathBuf),

    /// The directory or file could not be created.
    #[error("cannot open log file {path}: {source}")]
    Unwritable {
        /// The path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// None of the fallback directories were writable.
    #[error("no writable log directory found")]
    NoneWritable,
}

/// Settings for [`init_observability`].
#[derive(Clone, Debug)]
pub struct ObservabilityConfig {
    /// Name used for the log file and the platform data directory.
    pub service: String,
    /// Log directory from configuration.
    pub log_dir: Option<PathBuf>,
}

impl ObservabilityConfig {
    /// Settings for this binary, with the configured log directory.
    pub fn new(log_dir: Option<PathBuf>) -> Self {
        Self {
            service: env!("CARGO_PKG_NAME").to_string(),
            log_dir,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct LogTarget {
    dir: PathBuf,
    file_name: String,
}

/// Keeps the background log writer alive. Drop it last.
pub struct ObservabilityGuard {
    _log_guard: WorkerGuard,
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_observability(
    cfg: &ObservabilityConfig,
    env_filter: EnvFilter,
) -> anyhow::Result<ObservabilityGuard> {
    let (writer, guard) = match log_writer(cfg) {
        Ok(pair) => pair,
        Err(err) => {
            eprintln!("Warning: {err}. Falling back to stderr logging.");
            tracing_appender::non_blocking(std::io::stderr())
        }
    };

    let json_layer = fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .with_span_list(false)
        .with_ansi(false)
        .with_writer(writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .try_init()?;

    tracing::debug!("observability initialized");
    Ok(ObservabilityGuard { _log_guard: guard })
}

/// Build the level filter.
///
/// Priority: `--quiet` > `-v`/`-vv` > `RUST_LOG` > configured level.
pub fn env_filter(quiet: bool, verbose: u8, default_level: &str) -> EnvFilter {
    if quiet {
        return EnvFilter::new("error");
    }
    match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    }
}

fn log_writer(cfg: &ObservabilityConfig) -> Result<(NonBlocking, WorkerGuard), LogTargetError> {
    let target = resolve_log_target(
        &cfg.service,
        std::env::var_os(ENV_LOG_PATH).map(PathBuf::from),
        std::env::var_os(ENV_LOG_DIR).map(PathBuf::from),
        cfg.log_dir.clone(),
    )?;
    let appender = tracing_appender::rolling::daily(&target.dir, &target.file_name);
    Ok(tracing_appender::non_blocking(appender))
}

fn resolve_log_target(
    service: &str,
    path_override: Option<PathBuf>,
    dir_override: Option<PathBuf>,
    config_dir: Option<PathBuf>,
) -> Result<LogTarget, LogTargetError> {
    if let Some(path) = path_override {
        return target_from_path(&path);
    }

    let file_name = format!("{service}{LOG_FILE_SUFFIX}");
    if let Some(dir) = dir_override.or(config_dir) {
        ensure_writable(&dir, &file_name)?;
        return Ok(LogTarget { dir, file_name });
    }

    let mut candidates = Vec::new();
    if cfg!(unix) {
        candidates.push(PathBuf::from(DEFAULT_LOG_DIR_UNIX));
    }
    if let Some(dirs) = directories::ProjectDirs::from("", "", service) {
        candidates.push(dirs.data_local_dir().join("logs"));
    }
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd);
    }

    candidates
        .into_iter()
        .find(|dir| ensure_writable(dir, &file_name).is_ok())
        .map(|dir| LogTarget { dir, file_name })
        .ok_or(LogTargetError::NoneWritable)
}

fn target_from_path(path: &Path) -> Result<LogTarget, LogTargetError> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| LogTargetError::BadPath(path.to_path_buf()))?
        .to_owned();
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    ensure_writable(&dir, &file_name)?;
    Ok(LogTarget { dir, file_name })
}

fn ensure_writable(dir: &Path, file_name: &str) -> Result<(), LogTargetError> {
    let unwritable = |path: &Path| {
        let path = path.to_path_buf();
        move |source| LogTargetError::Unwritable { path, source }
    };
    std::fs::create_dir_all(dir).map_err(unwritable(dir))?;
    let path = dir.join(file_name);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(unwritable(&path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn quiet_wins_over_verbose() {
        assert_eq!(env_filter(true, 2, "info").to_string(), "error");
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(env_filter(false, 1, "info").to_string(), "debug");
        assert_eq!(env_filter(false, 3, "info").to_string(), "trace");
    }

    #[test]
    fn path_override_wins() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("nested").join("custom.jsonl");
        let other = tmp.path().join("other");

        let target =
            resolve_log_target("bumpr", Some(file.clone()), Some(other.clone()), Some(other))
                .unwrap();
        assert_eq!(target.dir, tmp.path().join("nested"));
        assert_eq!(target.file_name, "custom.jsonl");
        assert!(file.exists());
    }

    #[test]
    fn dir_override_beats_config_dir() {
        let tmp = TempDir::new().unwrap();
        let env_dir = tmp.path().join("env");
        let config_dir = tmp.path().join("config");

        let target =
            resolve_log_target("bumpr", None, Some(env_dir.clone()), Some(config_dir.clone()))
                .unwrap();
        assert_eq!(target.dir, env_dir);
        assert_eq!(target.file_name, "bumpr.jsonl");
        assert!(!config_dir.exists());
    }

    #[test]
    fn config_dir_used_without_env() {
        let tmp = TempDir::new().unwrap();
        let config_dir = tmp.path().join("logs");
        let target = resolve_log_target("demo", None, None, Some(config_dir.clone())).unwrap();
        assert_eq!(
            target,
            LogTarget {
                dir: config_dir,
                file_name: "demo.jsonl".into()
            }
        );
    }

    #[test]
    fn unwritable_dir_is_reported() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let err = resolve_log_target("demo", None, Some(blocker.join("sub")), None).unwrap_err();
        assert!(matches!(err, LogTargetError::Unwritable { .. }));
    }
}
