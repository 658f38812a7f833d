//! Appscope Core - installer package inspection service
//!
//! This crate provides configuration, the download/parse/format pipeline and
//! the HTTP server that answers `GET /parser?download_url=...` with a
//! `{code, message, result}` envelope describing an `.apk` or `.ipa`.

pub mod codes;
pub mod config;
pub mod envelope;
pub mod error;
pub mod fetcher;
pub mod formatter;
pub mod handler;
pub mod parser;
pub mod reporter;
pub mod server;
pub mod state;

pub use config::Config;
pub use envelope::{EmptyResult, ResponseEnvelope};
pub use error::{AppscopeError, ConfigError, PipelineError, Result};
pub use formatter::{AppInfoView, IosView, SystemInfo};
pub use reporter::{PanicReport, PanicReporter, TracingReporter};

#[cfg(any(test, feature = "test-util"))]
pub use reporter::MemoryReporter;
pub use server::{build_router, serve};
pub use state::AppState;
