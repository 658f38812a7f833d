//! Configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::defaults;

/// Main configuration for appscope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Package download configuration
    pub download: DownloadConfig,

    /// Package inspector configuration
    pub inspector: InspectorConfig,

    /// Log output configuration
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (`host:port`)
    pub bind: String,

    /// Route aliases served by the parse handler
    pub routes: Vec<String>,

    /// Query parameter names holding the download URL, in lookup order
    pub accepted_query_params: Vec<String>,

    /// Attach the `system` block (timings, timestamp, version) to results
    pub telemetry_enabled: bool,

    /// Version marker reported in results and on the health route
    pub service_version: String,

    /// Fixed UTC offset for `process_time`; local time when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utc_offset_hours: Option<i32>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: defaults::DEFAULT_BIND.to_string(),
            routes: defaults::DEFAULT_ROUTES.iter().map(|s| s.to_string()).collect(),
            accepted_query_params: defaults::DEFAULT_QUERY_PARAMS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            telemetry_enabled: true,
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            utc_offset_hours: None,
        }
    }
}

/// Package download configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Directory for downloaded packages; the system temp dir when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,

    /// Keep the URL's file extension on the local file name
    pub preserve_extension: bool,

    /// Whole-request timeout for a download
    pub timeout_secs: u64,

    /// Connection timeout for a download
    pub connect_timeout_secs: u64,

    /// Maximum package size in bytes (0 = unlimited)
    pub max_bytes: u64,
}

impl DownloadConfig {
    /// Directory downloads are written to
    pub fn resolved_temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Size limit, if any
    pub fn size_limit(&self) -> Option<u64> {
        (self.max_bytes > 0).then_some(self.max_bytes)
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            preserve_extension: false,
            timeout_secs: defaults::DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            connect_timeout_secs: defaults::DEFAULT_CONNECT_TIMEOUT_SECS,
            max_bytes: 0,
        }
    }
}

/// Package inspector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectorConfig {
    /// `aapt2` binary used for Android packages
    pub aapt_path: PathBuf,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            aapt_path: PathBuf::from(appscope_inspect::archive::DEFAULT_AAPT_PATH),
        }
    }
}

/// Log output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Write JSON logs to a daily-rolling file
    pub file: bool,

    /// Log directory; `~/.appscope/logs` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: true,
            directory: None,
        }
    }
}
