//! Record Service
//!
//! Upload, listing and verification over a [`Ledger`] and a [`LocalStore`].

use std::sync::Arc;

use axum::body::Bytes;
use futures::{Stream, StreamExt};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use super::types::{Listing, UploadError, UploadReceipt, VerifyError, VerifyOutcome};
use crate::config::OrphanPolicy;
use crate::hasher;
use crate::ledger::{FileRecord, Ledger, LedgerError};
use crate::storage::{sanitize_filename, LocalStore, StorageError, StoredFile};

/// Upload / list / verify workflows
#[derive(Clone)]
pub struct RecordService {
    ledger: Arc<dyn Ledger>,
    store: LocalStore,
    orphan_policy: OrphanPolicy,
}

impl RecordService {
    pub fn new(ledger: Arc<dyn Ledger>, store: LocalStore, orphan_policy: OrphanPolicy) -> Self {
        Self {
            ledger,
            store,
            orphan_policy,
        }
    }

    pub fn ledger(&self) -> &dyn Ledger {
        self.ledger.as_ref()
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    // ========================================================================
    // Upload
    // ========================================================================

    /// Store an uploaded file, hash it and record it on the ledger.
    ///
    /// Input errors leave nothing behind. A ledger failure leaves the stored
    /// file handled according to the orphan policy.
    pub async fn upload<S>(&self, client_filename: &str, body: S) -> Result<UploadReceipt, UploadError>
    where
        S: Stream<Item = Result<Bytes, UploadError>>,
    {
        if client_filename.is_empty() {
            return Err(UploadError::EmptyFilename);
        }
        let safe_name = sanitize_filename(client_filename)
            .ok_or_else(|| UploadError::InvalidFilename(client_filename.to_string()))?;

        let (stored, file) = self.store.create_unique(&safe_name).await?;

        let size = match write_body(&stored, file, body).await {
            Ok(size) => size,
            Err(e) => {
                self.discard(&stored).await;
                return Err(e);
            }
        };

        let file_hash = match hasher::hash_file(&stored.path).await {
            Ok(hash) => hash,
            Err(e) => {
                self.discard(&stored).await;
                return Err(UploadError::Hash(e));
            }
        };

        tracing::debug!(
            filename = %stored.name,
            size = size,
            file_hash = %file_hash,
            "Stored upload, appending to ledger"
        );

        match self.ledger.append(&stored.name, &file_hash).await {
            Ok(receipt) => {
                tracing::info!(
                    filename = %stored.name,
                    file_hash = %file_hash,
                    tx_hash = %receipt.tx_hash,
                    "File recorded on ledger"
                );
                Ok(UploadReceipt {
                    filename: stored.name,
                    original_filename: client_filename.to_string(),
                    file_hash,
                    size,
                    tx_hash: receipt.tx_hash,
                    block_number: receipt.block_number,
                })
            }
            Err(source) => {
                // a submitted transaction can still be mined; keep its file
                let retained = match self.orphan_policy {
                    OrphanPolicy::Retain => true,
                    OrphanPolicy::Remove if source.may_have_landed() => true,
                    OrphanPolicy::Remove => !self.discard(&stored).await,
                };
                if source.may_have_landed() {
                    tracing::warn!(
                        filename = %stored.name,
                        error = %source,
                        "Ledger append unconfirmed, record may still appear"
                    );
                } else {
                    tracing::error!(
                        filename = %stored.name,
                        retained = retained,
                        error = %source,
                        "Ledger append failed"
                    );
                }
                Err(UploadError::Ledger {
                    filename: stored.name,
                    retained,
                    source,
                })
            }
        }
    }

    /// Remove a stored file, reporting whether it is gone
    async fn discard(&self, stored: &StoredFile) -> bool {
        match self.store.remove(stored).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(filename = %stored.name, error = %e, "Could not remove stored file");
                false
            }
        }
    }

    // ========================================================================
    // Listing
    // ========================================================================

    pub async fn count(&self) -> Result<u64, LedgerError> {
        self.ledger.count().await
    }

    pub async fn record(&self, index: u64) -> Result<FileRecord, LedgerError> {
        self.ledger.get(index).await
    }

    /// Read every record in index order, skipping the ones that fail
    pub async fn list(&self) -> Listing {
        let count = match self.ledger.count().await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read record count");
                return Listing {
                    error: Some(format!("Failed to read from contract: {}", e)),
                    ..Listing::default()
                };
            }
        };

        let mut listing = Listing::default();
        for index in 0..count {
            match self.ledger.get(index).await {
                Ok(record) => listing.records.push(record),
                Err(e) => {
                    tracing::warn!(index = index, error = %e, "Error fetching file record");
                    listing.skipped.push(index);
                }
            }
        }
        listing
    }

    // ========================================================================
    // Verification
    // ========================================================================

    /// Compare the local copy of record `index` with its on-chain digest
    pub async fn verify(&self, index: u64) -> Result<VerifyOutcome, VerifyError> {
        let record = self.ledger.get(index).await?;

        let Some(path) = self.store.locate(&record.filename).await? else {
            return Ok(VerifyOutcome::MissingLocally {
                index,
                filename: record.filename,
            });
        };

        let local = match hasher::hash_file(&path).await {
            Ok(hash) => hash,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(VerifyOutcome::MissingLocally {
                    index,
                    filename: record.filename,
                });
            }
            Err(e) => return Err(VerifyError::Hash(e)),
        };

        let outcome = if local == record.file_hash {
            VerifyOutcome::Intact {
                index,
                filename: record.filename,
                file_hash: local,
            }
        } else {
            tracing::warn!(
                index = index,
                filename = %record.filename,
                on_chain = %record.file_hash,
                local = %local,
                "Integrity check failed"
            );
            VerifyOutcome::Tampered {
                index,
                filename: record.filename,
                on_chain: record.file_hash,
                local,
            }
        };
        Ok(outcome)
    }
}

/// Copy the body into the freshly created file
async fn write_body<S>(stored: &StoredFile, mut file: File, body: S) -> Result<u64, UploadError>
where
    S: Stream<Item = Result<Bytes, UploadError>>,
{
    let io_error = |source: std::io::Error| {
        UploadError::Storage(StorageError::Io {
            path: stored.path.clone(),
            source,
        })
    };

    let mut body = std::pin::pin!(body);
    let mut written = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await.map_err(io_error)?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(io_error)?;
    file.sync_all().await.map_err(io_error)?;
    Ok(written)
}
