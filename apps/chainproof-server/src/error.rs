//! Error types for the Chainproof server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::ledger::LedgerError;
use crate::records::{UploadError, VerifyError};

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Verify(#[from] VerifyError),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

fn ledger_status(e: &LedgerError) -> (StatusCode, &'static str) {
    match e {
        LedgerError::NoSuchRecord(_) => (StatusCode::NOT_FOUND, "not_found"),
        _ => (StatusCode::BAD_GATEWAY, "ledger_error"),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::Ledger(e) => {
                tracing::error!("Ledger error: {}", e);
                let (status, kind) = ledger_status(e);
                (status, kind, e.to_string())
            }
            AppError::Upload(e) => {
                if e.is_input_error() {
                    tracing::debug!("Upload rejected: {}", e);
                } else {
                    tracing::error!("Upload failed: {}", e);
                }
                let kind = match e {
                    UploadError::PayloadTooLarge { .. } => "payload_too_large",
                    UploadError::Ledger { .. } if e.is_pending() => "ledger_pending",
                    UploadError::Ledger { .. } => "ledger_error",
                    UploadError::Storage(_) | UploadError::Hash(_) => "storage_error",
                    _ => "bad_request",
                };
                (e.status_code(), kind, e.to_string())
            }
            AppError::Verify(e) => {
                tracing::error!("Verification could not run: {}", e);
                match e {
                    VerifyError::Ledger(inner) => {
                        let (status, kind) = ledger_status(inner);
                        (status, kind, e.to_string())
                    }
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "storage_error",
                        "Failed to read local file".to_string(),
                    ),
                }
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}
