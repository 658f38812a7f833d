//! Adapter between the request pipeline and the package inspector

use std::path::PathBuf;
use std::sync::Arc;

use appscope_inspect::{InspectError, PackageInspector, PackageMetadata};
use tracing::debug;

use crate::error::PipelineError;

/// Inspect the package at `path` on the blocking pool
///
/// A panic inside the inspector is re-raised on the calling task so the
/// server's panic boundary sees it.
pub async fn parse_package(
    inspector: Arc<dyn PackageInspector>,
    path: PathBuf,
) -> Result<PackageMetadata, PipelineError> {
    let outcome = tokio::task::spawn_blocking(move || inspector.inspect(&path)).await;

    match outcome {
        Ok(Ok(metadata)) => Ok(metadata),
        Ok(Err(error)) => Err(normalize_error(error)),
        Err(join_error) if join_error.is_panic() => {
            std::panic::resume_unwind(join_error.into_panic())
        }
        Err(join_error) => Err(PipelineError::ParseFailed(join_error.to_string())),
    }
}

/// Map inspector errors onto the pipeline vocabulary
pub fn normalize_error(error: InspectError) -> PipelineError {
    debug!(error = %error, "package inspection failed");
    match error {
        InspectError::UnknownFormat(detail) => PipelineError::UnknownPlatform(detail),
        other => PipelineError::ParseFailed(other.to_string()),
    }
}
