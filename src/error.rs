//! Error taxonomy surfaced over HTTP.
//!
//! Validation and unknown-handler errors are immediate, cheap 400s with a
//! fixed structured body; collaborator failures are 502s. Sandbox denials
//! and file I/O failures never appear here: the file handler recovers them
//! locally into ordinary result strings.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use crate::tts::TtsError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Required `q` parameter absent or empty.
    #[error("No query provided")]
    EmptyQuery,

    /// Dispatch requested for a handler that is not registered.
    #[error("Invalid Request")]
    UnknownPlugin,

    /// The search collaborator failed (rate limit, timeout, API error).
    #[error("search provider failed")]
    SearchFailed(#[source] anyhow::Error),

    /// The synthesis collaborator failed before streaming began.
    #[error("synthesis provider failed")]
    SynthesisFailed(#[source] TtsError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::EmptyQuery | ApiError::UnknownPlugin => StatusCode::BAD_REQUEST,
            ApiError::SearchFailed(_) | ApiError::SynthesisFailed(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// The fixed `error` field served to the caller. Collaborator failure
    /// details go to the log, not over the wire.
    fn message(&self) -> &'static str {
        match self {
            ApiError::EmptyQuery => "No query provided",
            ApiError::UnknownPlugin => "Invalid Request",
            ApiError::SearchFailed(_) => "Search provider error",
            ApiError::SynthesisFailed(_) => "Synthesis provider error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::SearchFailed(e) => warn!("search provider failed: {e:#}"),
            ApiError::SynthesisFailed(e) => warn!("synthesis provider failed: {e}"),
            _ => {}
        }
        (self.status(), Json(json!({ "error": self.message() }))).into_response()
    }
}
