//! Error types for the log tail scanner.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    /// No log file yet. Expected on a healthy site, shown as "nothing to show".
    #[error("No log file found (searched: {})", display_paths(.searched))]
    NotFound { searched: Vec<PathBuf> },

    #[error(
        "Insufficient memory headroom: {headroom_bytes} bytes available, {required_bytes} required"
    )]
    InsufficientResources {
        headroom_bytes: u64,
        required_bytes: u64,
    },

    #[error("Log file too large: {size_bytes} bytes exceeds limit of {max_bytes} bytes")]
    FileTooLarge { size_bytes: u64, max_bytes: u64 },

    #[error("Log file not readable: {}: {source}", .path.display())]
    NotReadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid scan request: {0}")]
    InvalidRequest(String),
}

impl ScanError {
    /// True for outcomes that mean "nothing to show" rather than a problem.
    pub fn is_informational(&self) -> bool {
        matches!(self, ScanError::NotFound { .. })
    }

    /// Short stable identifier, used in JSON output and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ScanError::NotFound { .. } => "not_found",
            ScanError::InsufficientResources { .. } => "insufficient_resources",
            ScanError::FileTooLarge { .. } => "file_too_large",
            ScanError::NotReadable { .. } => "not_readable",
            ScanError::InvalidRequest(_) => "invalid_request",
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "none".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
