// SPDX-License-Identifier: MIT

//! Application error types with consistent API responses.
//!
//! Empty result sets are never errors; handlers report those as informational
//! messages in a 200 body. Errors here are load failures, bad requests and
//! internal faults, and none of them produce partial results.

use crate::services::export::ExportError;
use crate::services::loader::LoadError;
use crate::services::overlay::OverlayError;
use crate::services::projection::ProjectionError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Failed to load polygon archive: {0}")]
    Load(#[from] LoadError),

    #[error("Overlay analysis failed: {0}")]
    Overlay(#[from] OverlayError),

    #[error("Projection failed: {0}")]
    Projection(#[from] ProjectionError),

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            // A bad upload is the caller's problem; report what was wrong with it
            AppError::Load(err) => (
                StatusCode::BAD_REQUEST,
                "load_error",
                Some(err.to_string()),
            ),
            AppError::Overlay(err) => {
                tracing::error!(error = %err, "Overlay analysis error");
                (StatusCode::INTERNAL_SERVER_ERROR, "overlay_error", None)
            }
            AppError::Projection(err) => {
                tracing::error!(error = %err, "Projection error");
                (StatusCode::INTERNAL_SERVER_ERROR, "projection_error", None)
            }
            AppError::Export(err) => {
                tracing::error!(error = %err, "Export error");
                (StatusCode::INTERNAL_SERVER_ERROR, "export_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
