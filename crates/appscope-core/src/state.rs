//! Shared, immutable per-process state

use std::sync::Arc;

use appscope_inspect::{ArchiveInspector, PackageInspector};

use crate::config::{Config, ServerConfig};
use crate::error::Result;
use crate::fetcher::Fetcher;
use crate::reporter::{PanicReporter, TracingReporter};

/// Everything a request needs, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub server: ServerConfig,
    pub fetcher: Fetcher,
    pub inspector: Arc<dyn PackageInspector>,
    pub reporter: Arc<dyn PanicReporter>,
}

impl AppState {
    /// Build state from configuration with the default inspector and reporter
    pub fn from_config(config: &Config) -> Result<Self> {
        let inspector =
            ArchiveInspector::new().with_aapt_path(config.inspector.aapt_path.clone());

        Ok(Self {
            server: config.server.clone(),
            fetcher: Fetcher::new(&config.download)?,
            inspector: Arc::new(inspector),
            reporter: Arc::new(TracingReporter),
        })
    }

    /// Replace the package inspector
    pub fn with_inspector(mut self, inspector: Arc<dyn PackageInspector>) -> Self {
        self.inspector = inspector;
        self
    }

    /// Replace the panic reporter
    pub fn with_reporter(mut self, reporter: Arc<dyn PanicReporter>) -> Self {
        self.reporter = reporter;
        self
    }
}
