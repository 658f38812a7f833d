//! Error types for appscope

use std::path::PathBuf;
use thiserror::Error;

use crate::codes;

/// Result type alias using AppscopeError
pub type Result<T> = std::result::Result<T, AppscopeError>;

/// Main error type for service setup and startup
#[derive(Debug, Error)]
pub enum AppscopeError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// HTTP client construction failed
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found at {0}")]
    NotFound(PathBuf),

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

/// Request pipeline failures
///
/// Every variant ends the request; none are retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// No download URL in the query string
    #[error("download address must be present")]
    MissingInput,

    /// Network, transport or disk failure while fetching
    #[error("{0}")]
    DownloadFailed(String),

    /// The downloaded file is not an installer package
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),

    /// The package was recognized but could not be read
    #[error("{0}")]
    ParseFailed(String),
}

impl PipelineError {
    /// Application code reported in the response envelope
    pub fn code(&self) -> u16 {
        match self {
            PipelineError::MissingInput => codes::MISSING_INPUT,
            PipelineError::DownloadFailed(_) => codes::DOWNLOAD_FAILED,
            PipelineError::UnknownPlatform(_) | PipelineError::ParseFailed(_) => {
                codes::PARSE_FAILED
            }
        }
    }
}
