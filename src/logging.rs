use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::error::{OptimizerError, Result};

const DEFAULT_LOG_FILE: &str = "turbo-optimizer.log";
const DISABLED_MARKER: &str = "-";

/// Where tracing output goes. The terminal belongs to the UI, so never stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    File(PathBuf),
    Disabled,
}

impl LogTarget {
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg.map(str::trim) {
            Some(DISABLED_MARKER) => LogTarget::Disabled,
            Some(path) if !path.is_empty() => LogTarget::File(PathBuf::from(path)),
            _ => LogTarget::File(std::env::temp_dir().join(DEFAULT_LOG_FILE)),
        }
    }
}

pub fn normalize_level(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    }
}

/// Installs the global subscriber. `RUST_LOG` overrides `level` when set.
pub fn init(target: &LogTarget, level: &str) -> Result<()> {
    let LogTarget::File(path) = target else {
        return Ok(());
    };
    let file = open_log_file(path)?;
    let fallback = normalize_level(level);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // A second init (tests, re-entry) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();

    tracing::info!(
        log_file = %path.display(),
        level = fallback,
        "tracing initialized"
    );
    Ok(())
}

fn open_log_file(path: &Path) -> Result<fs::File> {
    let to_error = |source| OptimizerError::Logging {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(to_error)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(to_error)
}
