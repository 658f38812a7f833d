//! The `{code, message, result}` JSON wrapper used for every response

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::codes;
use crate::error::PipelineError;

/// Result payload for envelopes that carry no data; serializes as `{}`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyResult {}

/// Response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T = EmptyResult> {
    /// Application status code (see [`crate::codes`])
    pub code: u16,
    /// Human-readable message
    pub message: String,
    /// Payload, `{}` when there is none
    pub result: T,
}

impl<T> ResponseEnvelope<T> {
    /// Successful envelope carrying `result`
    pub fn ok(result: T) -> Self {
        Self {
            code: codes::SUCCESS,
            message: "OK".to_string(),
            result,
        }
    }
}

impl ResponseEnvelope<EmptyResult> {
    /// Envelope with an empty result
    pub fn empty(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            result: EmptyResult {},
        }
    }
}

impl From<&PipelineError> for ResponseEnvelope<EmptyResult> {
    fn from(error: &PipelineError) -> Self {
        Self::empty(error.code(), error.to_string())
    }
}

/// Application outcomes always travel with HTTP 200
impl<T: Serialize> IntoResponse for ResponseEnvelope<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}
