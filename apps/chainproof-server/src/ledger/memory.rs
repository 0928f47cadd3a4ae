//! In-process ledger
//!
//! Keeps the registry in memory with the same append semantics as the
//! contract: sequential indices, ledger-assigned timestamp and uploader.
//! Failures can be switched on per operation to exercise degraded paths.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{FileRecord, Ledger, LedgerError, TxReceipt};
use crate::hasher;

/// Uploader identity used when none is given
pub const DEFAULT_SIGNER: &str = "0x0000000000000000000000000000000000000001";

pub struct MemoryLedger {
    signer: String,
    records: RwLock<Vec<FileRecord>>,
    fail_count: AtomicBool,
    fail_appends: AtomicBool,
    failing_indices: RwLock<HashSet<u64>>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::with_signer(DEFAULT_SIGNER)
    }

    pub fn with_signer(signer: impl Into<String>) -> Self {
        Self {
            signer: signer.into(),
            records: RwLock::new(Vec::new()),
            fail_count: AtomicBool::new(false),
            fail_appends: AtomicBool::new(false),
            failing_indices: RwLock::new(HashSet::new()),
        }
    }

    /// Make `count()` fail until switched off again
    pub fn set_fail_count(&self, fail: bool) {
        self.fail_count.store(fail, Ordering::SeqCst);
    }

    /// Make `append()` fail until switched off again
    pub fn set_fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Make `get(index)` fail for one index
    pub async fn fail_index(&self, index: u64) {
        self.failing_indices.write().await.insert(index);
    }

    pub async fn records(&self) -> Vec<FileRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn signer(&self) -> String {
        self.signer.clone()
    }

    async fn count(&self) -> Result<u64, LedgerError> {
        if self.fail_count.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("count read disabled".to_string()));
        }
        Ok(self.records.read().await.len() as u64)
    }

    async fn get(&self, index: u64) -> Result<FileRecord, LedgerError> {
        if self.failing_indices.read().await.contains(&index) {
            return Err(LedgerError::Unavailable(format!("read of index {} disabled", index)));
        }
        let records = self.records.read().await;
        usize::try_from(index)
            .ok()
            .and_then(|i| records.get(i))
            .cloned()
            .ok_or(LedgerError::NoSuchRecord(index))
    }

    async fn append(&self, filename: &str, file_hash: &str) -> Result<TxReceipt, LedgerError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("append disabled".to_string()));
        }

        let mut records = self.records.write().await;
        let index = records.len() as u64;
        let timestamp = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0);

        let tx_hash = format!(
            "0x{}",
            hasher::hash_bytes(format!("{}:{}:{}:{}", index, filename, file_hash, timestamp).as_bytes())
        );

        records.push(FileRecord {
            index,
            filename: filename.to_string(),
            file_hash: file_hash.to_string(),
            timestamp,
            uploader: self.signer.clone(),
        });

        Ok(TxReceipt {
            tx_hash,
            block_number: Some(index + 1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sequential_indices() {
        let ledger = MemoryLedger::new();
        let first = ledger.append("a.txt", "h1").await.unwrap();
        let second = ledger.append("b.txt", "h2").await.unwrap();
        assert_ne!(first.tx_hash, second.tx_hash);
        assert_eq!(ledger.count().await.unwrap(), 2);

        let record = ledger.get(1).await.unwrap();
        assert_eq!(record.index, 1);
        assert_eq!(record.filename, "b.txt");
        assert_eq!(record.file_hash, "h2");
        assert_eq!(record.uploader, DEFAULT_SIGNER);
        assert!(record.recorded_at().is_some());
    }

    #[tokio::test]
    async fn test_out_of_range() {
        let ledger = MemoryLedger::new();
        assert!(matches!(ledger.get(0).await, Err(LedgerError::NoSuchRecord(0))));
    }

    #[tokio::test]
    async fn test_failure_switches() {
        let ledger = MemoryLedger::with_signer("0xabc");
        ledger.append("a.txt", "h1").await.unwrap();

        ledger.set_fail_count(true);
        assert!(ledger.count().await.is_err());
        ledger.set_fail_count(false);
        assert_eq!(ledger.count().await.unwrap(), 1);

        ledger.fail_index(0).await;
        assert!(ledger.get(0).await.is_err());

        ledger.set_fail_appends(true);
        assert!(ledger.append("b.txt", "h2").await.is_err());
        assert_eq!(ledger.records().await.len(), 1);
    }
}
