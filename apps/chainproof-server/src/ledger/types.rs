//! Ledger data types

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::abi::AbiError;
use super::address::AddressParseError;
use super::rpc::RpcError;

/// One entry of the on-chain file registry. Never changes once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Position in the registry, 0-based
    pub index: u64,
    /// Name of the file in local storage at upload time
    pub filename: String,
    /// Hex SHA-256 of the file at upload time
    pub file_hash: String,
    /// Block time of the append, seconds since epoch
    pub timestamp: u64,
    /// Account that submitted the append
    pub uploader: String,
}

impl FileRecord {
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.timestamp)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

/// Confirmation of a state-changing call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub tx_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}

/// Ledger errors
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Cannot connect to RPC at {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: RpcError,
    },

    #[error("No accounts available from the ledger node")]
    NoAccounts,

    #[error("Contract ABI not found at {path}: {source}")]
    SchemaIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Contract ABI error: {0}")]
    Abi(#[from] AbiError),

    #[error(transparent)]
    Address(#[from] AddressParseError),

    #[error("RPC call failed: {0}")]
    Rpc(#[from] RpcError),

    #[error("Unexpected contract output: {0}")]
    UnexpectedOutput(String),

    #[error("No record at index {0}")]
    NoSuchRecord(u64),

    #[error("Transaction {tx_hash} reverted")]
    Reverted { tx_hash: String },

    #[error("Transaction {tx_hash} not confirmed within {waited:?}")]
    ConfirmationTimeout { tx_hash: String, waited: Duration },

    #[error("Transaction {tx_hash} submitted but its receipt could not be read: {source}")]
    ReceiptUnavailable {
        tx_hash: String,
        #[source]
        source: RpcError,
    },

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

impl LedgerError {
    /// The transaction was accepted by the node and may still be mined
    pub fn may_have_landed(&self) -> bool {
        matches!(
            self,
            Self::ConfirmationTimeout { .. } | Self::ReceiptUnavailable { .. }
        )
    }
}
