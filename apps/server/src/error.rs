//! Error types for the booking service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Error::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            Error::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            Error::Database(_) | Error::Internal(_) | Error::Other(_) => {
                tracing::error!("Internal error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "message": message,
        }));

        (status, body).into_response()
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        // Flatten field errors into the single message string the API
        // surfaces to callers.
        let mut messages: Vec<String> = Vec::new();
        for errs in errors.field_errors().values() {
            for err in errs.iter() {
                if let Some(msg) = &err.message {
                    messages.push(msg.to_string());
                }
            }
        }
        messages.sort();
        messages.dedup();
        if messages.is_empty() {
            Error::Validation("Invalid request".to_string())
        } else {
            Error::Validation(messages.join(". "))
        }
    }
}

impl From<roentgen_scheduling::Error> for Error {
    fn from(err: roentgen_scheduling::Error) -> Self {
        Error::Validation(err.to_string())
    }
}
