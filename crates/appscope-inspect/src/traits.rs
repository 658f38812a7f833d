//! Package inspector trait

use crate::error::Result;
use crate::types::PackageMetadata;
use std::path::Path;

/// Trait for installer package inspectors
///
/// Implementations read a package from local disk and report its metadata.
/// Inspection is blocking: callers on an async runtime should move it onto a
/// blocking thread.
///
/// A file that is not an installer package must be reported as
/// [`InspectError::UnknownFormat`](crate::InspectError::UnknownFormat) so
/// callers can tell it apart from a damaged package.
pub trait PackageInspector: Send + Sync {
    /// Inspect the package at `path`
    fn inspect(&self, path: &Path) -> Result<PackageMetadata>;
}
