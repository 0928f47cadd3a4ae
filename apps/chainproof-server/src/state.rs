//! Application state management

use std::sync::Arc;

use crate::config::{Config, LedgerBackend};
use crate::ledger::{EvmLedger, Ledger, LedgerError, MemoryLedger};
use crate::records::RecordService;
use crate::storage::{LocalStore, StorageError};

/// Error type for state initialization
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to initialize ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Failed to initialize upload storage: {0}")]
    Storage(#[from] StorageError),
}

/// Shared application state
///
/// Built once at startup and never mutated afterwards; handlers only get
/// shared references.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    records: RecordService,
}

impl AppState {
    pub fn new(config: Config, records: RecordService) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, records }),
        }
    }

    /// Connect the configured ledger and open upload storage
    pub async fn initialize(config: Config) -> Result<Self, StateError> {
        let ledger: Arc<dyn Ledger> = match config.ledger.backend {
            LedgerBackend::Evm => Arc::new(EvmLedger::connect(&config.ledger).await?),
            LedgerBackend::Memory => {
                tracing::warn!("Using in-memory ledger; records are lost on restart");
                Arc::new(MemoryLedger::new())
            }
        };

        let store = LocalStore::open(&config.storage.upload_dir).await?;
        let records = RecordService::new(ledger, store, config.storage.orphan_policy);

        Ok(Self::new(config, records))
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the record service
    pub fn records(&self) -> &RecordService {
        &self.inner.records
    }
}
