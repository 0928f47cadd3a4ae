//! Storage types

use std::path::PathBuf;

use serde::Serialize;

/// A file created in the upload directory
#[derive(Debug, Clone, Serialize)]
pub struct StoredFile {
    /// Name inside the upload directory (what gets recorded on the ledger)
    pub name: String,
    /// Full path on disk
    #[serde(skip)]
    pub path: PathBuf,
}

/// Storage-specific errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No free name for {name} after {attempts} attempts")]
    NamesExhausted { name: String, attempts: usize },
}
