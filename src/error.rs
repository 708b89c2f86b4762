//! Error types for unitgraph.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the scanner, the dependency index and the report writers.
///
/// Malformed source text is never an error at this level: the scanner reports
/// it through its error handler and keeps going. Only configuration problems
/// and I/O failures surface here.
#[derive(Debug, Error)]
pub enum UnitGraphError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The declared file size does not match the buffer handed to the scanner.
    #[error("file size ({size}) does not match src len ({len})")]
    SizeMismatch { size: usize, len: usize },

    #[error("too many errors ({0})")]
    TooManyErrors(usize),

    #[error("invalid config {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("unknown output format: {0:?}")]
    UnknownFormat(String),

    #[error("unit not found: {0}")]
    UnitNotFound(String),
}

impl UnitGraphError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        UnitGraphError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, UnitGraphError>;
