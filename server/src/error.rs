//! Unified error handling for the server.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use micro_engine::{response, ApiError, DriverError, Error};
use serde_json::json;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("Engine error: {0}")]
    Engine(#[from] Error),

    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Api(e) => (e.status_code, e.to_json()),
            AppError::Engine(Error::Driver(DriverError::DuplicateKey { keys, .. })) => {
                let conflict = ApiError::conflict(format!("duplicate value for {keys}"));
                (conflict.status_code, conflict.to_json())
            }
            AppError::Engine(e @ Error::NotFound { .. }) => {
                let not_found = ApiError::not_found(e.to_string());
                (not_found.status_code, not_found.to_json())
            }
            AppError::Engine(Error::Driver(e)) => {
                tracing::error!("Driver error: {:?}", e);
                (500, json!({ "error": "Storage error" }))
            }
            AppError::Engine(e) => {
                tracing::warn!("Engine error: {:?}", e);
                response::translate(e)
            }
            AppError::BadRequest(msg) => response::translate_other(msg),
        };

        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_REQUEST);
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, AppError>;
