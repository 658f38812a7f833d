//! Sinks for panics caught at the request boundary

use std::any::Any;
#[cfg(any(test, feature = "test-util"))]
use std::sync::Mutex;

use tracing::error;

/// A panic caught while handling a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicReport {
    pub method: String,
    pub path: String,
    pub message: String,
}

impl PanicReport {
    /// Build a report from a caught panic payload
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        payload: &(dyn Any + Send),
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            message: panic_message(payload),
        }
    }
}

/// Receives caught panics; purely observational
pub trait PanicReporter: Send + Sync {
    /// Record a caught panic
    fn report(&self, report: &PanicReport);
}

/// Logs caught panics at error level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl PanicReporter for TracingReporter {
    fn report(&self, report: &PanicReport) {
        error!(
            method = %report.method,
            path = %report.path,
            panic = %report.message,
            "request handler panicked"
        );
    }
}

/// Keeps caught panics in memory
///
/// Only compiled for this crate's tests or with the `test-util` feature.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default)]
pub struct MemoryReporter {
    reports: Mutex<Vec<PanicReport>>,
}

#[cfg(any(test, feature = "test-util"))]
impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports received so far
    pub fn reports(&self) -> Vec<PanicReport> {
        self.reports
            .lock()
            .map(|reports| reports.clone())
            .unwrap_or_default()
    }
}

#[cfg(any(test, feature = "test-util"))]
impl PanicReporter for MemoryReporter {
    fn report(&self, report: &PanicReport) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push(report.clone());
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
