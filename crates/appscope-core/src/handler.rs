//! The parse request handler
//!
//! Intake, fetch, parse, format, respond. The downloaded file lives in a
//! [`TempPackage`](crate::fetcher::TempPackage) guard scoped to
//! [`run_pipeline`], so it is gone before the response is written.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{RawQuery, State};
use axum::response::{IntoResponse, Response};
use chrono::{FixedOffset, Local, Utc};
use tracing::{info, warn};

use crate::envelope::ResponseEnvelope;
use crate::error::PipelineError;
use crate::formatter::{format_app_info, AppInfoView, SystemInfo};
use crate::parser::parse_package;
use crate::state::AppState;

const PROCESS_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `GET <route>?download_url=<url>`
pub async fn handle_parse(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Response {
    match run_pipeline(&state, query.as_deref()).await {
        Ok(view) => ResponseEnvelope::ok(view).into_response(),
        Err(error) => {
            warn!(code = error.code(), error = %error, "package request failed");
            ResponseEnvelope::from(&error).into_response()
        }
    }
}

/// Run one request through the pipeline
pub async fn run_pipeline(
    state: &AppState,
    query: Option<&str>,
) -> Result<AppInfoView, PipelineError> {
    let started = Instant::now();
    let url = resolve_download_url(query, &state.server.accepted_query_params)
        .ok_or(PipelineError::MissingInput)?;
    info!(url = %url, "inspecting package");

    let package = state.fetcher.fetch(&url).await?;
    let download_time = started.elapsed();

    let parse_started = Instant::now();
    let metadata = parse_package(state.inspector.clone(), package.path().to_path_buf()).await?;
    let parser_time = parse_started.elapsed();

    let download_ms = millis(download_time);
    let parse_ms = millis(parser_time);

    let mut view = format_app_info(&metadata);
    if state.server.telemetry_enabled {
        view.system = Some(SystemInfo {
            download_time: download_ms,
            parser_time: parse_ms,
            process_time: format_process_time(state.server.utc_offset_hours),
            version: state.server.service_version.clone(),
        });
    }

    info!(
        url = %url,
        package_name = %view.package_name,
        platform = %metadata.platform,
        download_ms,
        parse_ms,
        "package inspected"
    );
    Ok(view)
}

/// Whole milliseconds, saturating at `u64::MAX`
fn millis(elapsed: Duration) -> u64 {
    elapsed.as_millis().try_into().unwrap_or(u64::MAX)
}

/// First non-empty value among `accepted` parameter names, in their order
pub fn resolve_download_url(query: Option<&str>, accepted: &[String]) -> Option<String> {
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(query?.as_bytes())
        .into_owned()
        .collect();

    accepted.iter().find_map(|name| {
        pairs
            .iter()
            .find(|(key, value)| key == name && !value.trim().is_empty())
            .map(|(_, value)| value.trim().to_string())
    })
}

/// Completion timestamp, at a fixed offset when configured
pub fn format_process_time(utc_offset_hours: Option<i32>) -> String {
    match utc_offset_hours.and_then(|hours| FixedOffset::east_opt(hours * 3600)) {
        Some(offset) => Utc::now()
            .with_timezone(&offset)
            .format(PROCESS_TIME_FORMAT)
            .to_string(),
        None => Local::now().format(PROCESS_TIME_FORMAT).to_string(),
    }
}
