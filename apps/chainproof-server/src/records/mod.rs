//! File integrity records
//!
//! The three workflows on top of the ledger and local storage:
//! - upload: store the file, hash it, append `(name, hash)` to the ledger
//! - list: enumerate every readable record in ledger order
//! - verify: re-hash the local copy of a record and compare digests

mod service;
mod types;

pub use service::RecordService;
pub use types::*;
