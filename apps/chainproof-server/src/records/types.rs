//! Record workflow types

use axum::http::StatusCode;
use serde::Serialize;

use crate::ledger::{FileRecord, LedgerError};
use crate::storage::StorageError;

/// Result of a successful upload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    /// Name the file was stored (and recorded) under
    pub filename: String,
    /// Name the client sent
    pub original_filename: String,
    pub file_hash: String,
    pub size: u64,
    pub tx_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}

impl UploadReceipt {
    pub fn message(&self) -> String {
        format!(
            "File uploaded and metadata stored on chain. Tx: {}",
            self.tx_hash
        )
    }
}

/// Every record that could be read, in ledger order
#[derive(Debug, Clone, Default, Serialize)]
pub struct Listing {
    pub records: Vec<FileRecord>,
    /// Indices whose read failed
    pub skipped: Vec<u64>,
    /// Set when the record count itself could not be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of checking a local file against its record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerifyOutcome {
    /// Local digest equals the recorded one
    Intact {
        index: u64,
        filename: String,
        file_hash: String,
    },
    /// Local digest differs from the recorded one
    Tampered {
        index: u64,
        filename: String,
        on_chain: String,
        local: String,
    },
    /// No local copy to compare
    MissingLocally { index: u64, filename: String },
}

impl VerifyOutcome {
    pub fn message(&self) -> String {
        match self {
            VerifyOutcome::Intact { index, filename, .. } => {
                format!("Integrity OK for {} (index {}).", filename, index)
            }
            VerifyOutcome::Tampered {
                index,
                filename,
                on_chain,
                local,
            } => format!(
                "Integrity FAILED for {} (index {}). On-chain: {}, Local: {}",
                filename, index, on_chain, local
            ),
            VerifyOutcome::MissingLocally { .. } => {
                "Local file not found; stored only on chain or uploaded elsewhere.".to_string()
            }
        }
    }
}

/// Upload failures
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("No file part")]
    MissingFile,

    #[error("No selected file")]
    EmptyFilename,

    #[error("Invalid filename: {0:?}")]
    InvalidFilename(String),

    #[error("File exceeds the upload limit of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("Failed to read upload: {0}")]
    Body(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to hash stored file: {0}")]
    Hash(#[source] std::io::Error),

    #[error("Blockchain transaction failed: {source}")]
    Ledger {
        filename: String,
        /// Whether the stored file was left on disk
        retained: bool,
        #[source]
        source: LedgerError,
    },
}

impl UploadError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingFile | Self::EmptyFilename | Self::InvalidFilename(_) | Self::Body(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Storage(_) | Self::Hash(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Ledger { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// The ledger accepted the transaction but never confirmed it
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Ledger { source, .. } if source.may_have_landed())
    }

    /// Rejected before anything was stored
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::MissingFile
                | Self::EmptyFilename
                | Self::InvalidFilename(_)
                | Self::PayloadTooLarge { .. }
                | Self::Body(_)
        )
    }
}

/// Verification could not run
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("Error reading file: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to hash local file: {0}")]
    Hash(#[source] std::io::Error),
}
