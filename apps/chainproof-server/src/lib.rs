//! Chainproof Server Library
//!
//! Records file content hashes on an EVM ledger and re-verifies local copies
//! against them. The server binary is in main.rs; everything it wires together
//! lives here so integration tests can drive the router directly.
//!
//! # Modules
//!
//! - `hasher`: streaming SHA-256 digests
//! - `storage`: flat upload directory with collision-free naming
//! - `ledger`: registry contract access (JSON-RPC) and an in-process ledger
//! - `records`: upload / list / verify workflows
//! - `routes`, `html`: HTTP surface

pub mod config;
pub mod error;
pub mod hasher;
pub mod html;
pub mod ledger;
pub mod records;
pub mod routes;
pub mod state;
pub mod storage;
