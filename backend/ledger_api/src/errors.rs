//! Application-wide error types and their HTTP mapping.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use milestone_escrow::{LedgerError, StateError};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Ledger(#[from] LedgerError),

    #[error("missing x-caller-identity header")]
    MissingCaller,

    #[error("invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u32,
    pub kind: &'static str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Ledger(LedgerError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Ledger(LedgerError::State(e)) if e.is_not_found() => StatusCode::NOT_FOUND,
            Self::Ledger(LedgerError::State(StateError::Unauthorized { .. })) => {
                StatusCode::FORBIDDEN
            }
            Self::Ledger(LedgerError::State(_)) => StatusCode::CONFLICT,
            Self::Ledger(LedgerError::Transfer { .. }) => StatusCode::BAD_GATEWAY,
            Self::MissingCaller => StatusCode::UNAUTHORIZED,
            Self::InvalidBody(rejection) => rejection.status(),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> u32 {
        match self {
            Self::Ledger(e) => e.code(),
            _ => 0,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Ledger(e) => e.kind(),
            Self::MissingCaller => "unauthenticated",
            Self::InvalidBody(_) => "request",
            _ => "infrastructure",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(%status, error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code(),
            kind: self.kind(),
        };
        (status, Json(body)).into_response()
    }
}
