//! Library error type

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while reading or rendering coverage data
#[derive(Error, Debug)]
pub enum CoverageError {
    #[error("Malformed coverage report {source_name} at byte {position}: {message}")]
    MalformedReport {
        source_name: String,
        position: u64,
        message: String,
    },

    #[error("Coverage report not available: {}", path.display())]
    SourceUnavailable { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl CoverageError {
    pub fn malformed(source_name: &str, position: u64, message: impl Into<String>) -> Self {
        Self::MalformedReport {
            source_name: source_name.to_string(),
            position,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoverageError>;
