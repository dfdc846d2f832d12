//! Logging setup.
//!
//! Structured events go to a daily-rolled JSONL file. Warnings from the
//! release pipeline are also echoed to stderr in a compact human format.
//! Nothing is ever written to stdout, which carries command output
//! (including `--json`).

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::Level;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::{EnvFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, fmt};

const ENV_LOG_PATH: &str = "RELVER_LOG_PATH";
const ENV_LOG_DIR: &str = "RELVER_LOG_DIR";
const SYSTEM_LOG_DIR: &str = "/var/log";
const LOG_EXTENSION: &str = "jsonl";

/// Where logs should go, before environment overrides are applied.
#[derive(Clone, Debug)]
pub struct ObservabilityConfig {
    /// Service name; also the log file stem.
    pub service: String,
    /// Directory from the configuration file, if any.
    pub log_dir: Option<PathBuf>,
}

impl ObservabilityConfig {
    /// Build from the crate name plus the configured log directory.
    pub fn from_env_with_overrides(log_dir: Option<PathBuf>) -> Self {
        Self {
            service: env!("CARGO_PKG_NAME").to_string(),
            log_dir,
        }
    }
}

/// Flushes buffered log lines when dropped. Hold it until `main` returns.
pub struct ObservabilityGuard {
    _file: WorkerGuard,
}

/// Install the global subscriber.
///
/// When no log location is writable the JSONL stream falls back to stderr.
pub fn init_observability(cfg: &ObservabilityConfig, filter: EnvFilter) -> Result<ObservabilityGuard> {
    let (writer, guard) = match file_writer(&cfg.service, cfg.log_dir.as_deref()) {
        Ok(pair) => pair,
        Err(err) => {
            eprintln!("warning: {err:#}; logging to stderr");
            tracing_appender::non_blocking(std::io::stderr())
        }
    };

    let file_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(false)
        .with_ansi(false)
        .with_writer(writer);

    let stderr_layer = fmt::layer()
        .compact()
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(Targets::new().with_target("relver_core", Level::WARN));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    tracing::debug!(service = %cfg.service, "logging initialized");
    Ok(ObservabilityGuard { _file: guard })
}

/// Pick the level filter from CLI flags and the environment.
///
/// `-q` wins over `-v`, which wins over `RUST_LOG`, which wins over the
/// configured level.
pub fn env_filter(quiet: bool, verbose: u8, default_level: &str) -> EnvFilter {
    match (quiet, verbose) {
        (true, _) => EnvFilter::new("error"),
        (false, 0) => {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
        }
        (false, 1) => EnvFilter::new("debug"),
        (false, _) => EnvFilter::new("trace"),
    }
}

// ──────────────────────────────────────────────
// Log file location
// ──────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
struct LogTarget {
    dir: PathBuf,
    file_name: String,
}

/// Explicit locations, highest priority first.
#[derive(Default)]
struct LogOverrides {
    path: Option<PathBuf>,
    dir: Option<PathBuf>,
    config_dir: Option<PathBuf>,
}

impl LogOverrides {
    fn from_env(config_dir: Option<&Path>) -> Self {
        Self {
            path: std::env::var_os(ENV_LOG_PATH).map(PathBuf::from),
            dir: std::env::var_os(ENV_LOG_DIR).map(PathBuf::from),
            config_dir: config_dir.map(Path::to_path_buf),
        }
    }
}

fn file_writer(service: &str, config_dir: Option<&Path>) -> Result<(NonBlocking, WorkerGuard)> {
    let target = resolve_log_target(service, LogOverrides::from_env(config_dir))?;
    let appender = tracing_appender::rolling::daily(&target.dir, &target.file_name);
    Ok(tracing_appender::non_blocking(appender))
}

fn resolve_log_target(service: &str, overrides: LogOverrides) -> Result<LogTarget> {
    if let Some(path) = overrides.path {
        return target_for_file(&path);
    }

    let file_name = format!("{service}.{LOG_EXTENSION}");
    if let Some(dir) = overrides.dir.or(overrides.config_dir) {
        probe(&dir, &file_name)?;
        return Ok(LogTarget { dir, file_name });
    }

    let mut candidates = Vec::new();
    if cfg!(unix) {
        candidates.push(PathBuf::from(SYSTEM_LOG_DIR));
    }
    if let Some(dirs) = directories::ProjectDirs::from("", "", service) {
        candidates.push(dirs.data_local_dir().join("logs"));
    }
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd);
    }

    candidates
        .into_iter()
        .find(|dir| probe(dir, &file_name).is_ok())
        .map(|dir| LogTarget {
            dir,
            file_name: file_name.clone(),
        })
        .context("no writable log directory found")
}

fn target_for_file(path: &Path) -> Result<LogTarget> {
    let Some(name) = path.file_name() else {
        bail!("{ENV_LOG_PATH} must name a file");
    };
    let Some(file_name) = name.to_str() else {
        bail!("{ENV_LOG_PATH} must be valid UTF-8");
    };
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    probe(dir, file_name)?;
    Ok(LogTarget {
        dir: dir.to_path_buf(),
        file_name: file_name.to_string(),
    })
}

/// Create `dir` if needed and make sure the log file can be appended to.
fn probe(dir: &Path, file_name: &str) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("cannot create log directory {}", dir.display()))?;
    let path = dir.join(file_name);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;
    Ok(())
}
