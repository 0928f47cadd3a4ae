//! Local upload storage
//!
//! A flat directory of uploaded files named by their sanitized client
//! filename, with numeric suffixes on collision.

mod filename;
mod local;
mod types;

pub use filename::{is_plain_name, numbered_candidate, sanitize_filename};
pub use local::{LocalStore, MAX_NAME_PROBES};
pub use types::*;
