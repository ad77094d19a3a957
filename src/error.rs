use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("unknown task id {0}")]
    UnknownTask(usize),
    #[error("invalid theme file: {0}")]
    Theme(#[from] toml::de::Error),
    #[error("failed to open log file '{path}': {source}")]
    Logging {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, OptimizerError>;
