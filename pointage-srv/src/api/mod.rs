//! HTTP API handlers for pointage-srv

pub mod admin;
pub mod auth;
pub mod export;
pub mod health;
pub mod launches;
pub mod operators;
pub mod work;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// API error mapped to a structured JSON response
#[derive(Debug)]
pub enum ApiError {
    InvalidInput(String),
    NotFound(String),
    Conflict(String),
    /// Required schema objects absent; the caller can provision and retry
    SchemaMissing(String),
    Database(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, None, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, None, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, None, msg),
            ApiError::SchemaMissing(msg) => (
                StatusCode::CONFLICT,
                Some("schema_missing"),
                format!("Schema object missing: {}", msg),
            ),
            ApiError::Database(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                None,
                format!("Database error: {}", msg),
            ),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, None, msg),
        };

        let body = match code {
            Some(code) => Json(json!({ "error": message, "code": code })),
            None => Json(json!({ "error": message })),
        };

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Database(err.to_string())
    }
}

impl From<pointage_common::Error> for ApiError {
    fn from(err: pointage_common::Error) -> Self {
        use pointage_common::Error;
        match err {
            Error::Database(e) => ApiError::Database(e.to_string()),
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::InvalidInput(msg) => ApiError::InvalidInput(msg),
            Error::SchemaMissing(msg) => ApiError::SchemaMissing(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}
