//! Adapter errors.
//!
//! The relay core never fails; these cover malformed input rejected before
//! it reaches the core.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP body missing, not JSON, or missing required fields.
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// WebSocket frame could not be decoded.
    #[error("Invalid frame: {0}")]
    InvalidFrame(#[from] serde_json::Error),

    /// WebSocket frame named a route that does not exist.
    #[error("Unknown route: {0}")]
    UnknownRoute(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::InvalidBody(_) | ApiError::InvalidFrame(_) => StatusCode::BAD_REQUEST,
            ApiError::UnknownRoute(_) => StatusCode::NOT_FOUND,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
