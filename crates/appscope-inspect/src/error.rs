//! Inspection error types

use thiserror::Error;

/// Package inspection errors
#[derive(Debug, Error)]
pub enum InspectError {
    /// The file is not an installer package this crate understands
    #[error("not a recognized installer package: {0}")]
    UnknownFormat(String),

    /// The package was recognized but its metadata could not be read
    #[error("failed to parse package: {0}")]
    Parse(String),

    /// Tool not found
    #[error("required tool not found: {0}")]
    ToolNotFound(String),

    /// Command execution failed
    #[error("command failed: {0}")]
    CommandFailed(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Zip error
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Plist error
    #[error("plist error: {0}")]
    Plist(#[from] plist::Error),
}

impl InspectError {
    /// Whether this error means the input is not an installer package at all
    pub fn is_unknown_format(&self) -> bool {
        matches!(self, InspectError::UnknownFormat(_))
    }
}

/// Result type for inspection operations
pub type Result<T> = std::result::Result<T, InspectError>;
