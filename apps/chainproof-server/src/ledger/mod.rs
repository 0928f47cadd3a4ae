//! Ledger access
//!
//! The file registry lives in a smart contract exposing three calls:
//! - `getFileCount() -> uint256`
//! - `getFile(uint256) -> (uint256, string, string, uint256, address)`
//! - `addFile(string, string)`, state-changing
//!
//! [`EvmLedger`] talks to a deployed contract over JSON-RPC; [`MemoryLedger`]
//! keeps the registry in process.

pub mod abi;
pub mod address;
pub mod contract;
pub mod memory;
pub mod rpc;
mod types;

use async_trait::async_trait;

pub use contract::EvmLedger;
pub use memory::MemoryLedger;
pub use types::*;

/// Read/append access to the file registry
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Short backend name for diagnostics
    fn backend(&self) -> &'static str;

    /// Identity appends are submitted from
    fn signer(&self) -> String;

    /// Number of records stored
    async fn count(&self) -> Result<u64, LedgerError>;

    /// Record at `index`
    async fn get(&self, index: u64) -> Result<FileRecord, LedgerError>;

    /// Append a record and wait until it is confirmed
    async fn append(&self, filename: &str, file_hash: &str) -> Result<TxReceipt, LedgerError>;
}
