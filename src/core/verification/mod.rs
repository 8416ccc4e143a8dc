//! Artifact verification
//!
//! SHA-256 checksums used by the durable store to confirm a published
//! artifact matches the merged file it was copied from.

pub mod checksum;

pub use checksum::{calculate_checksum_bytes, calculate_file_checksum, verify_copy};
