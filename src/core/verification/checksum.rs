//! Checksum calculation for artifact verification
//!
//! The durable store hashes every artifact it accepts and compares the stored
//! copy against the local merged file before reporting success.

use crate::domain::{QuireError, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

/// Calculate the SHA-256 checksum of a file, streaming its contents
///
/// # Returns
///
/// Returns a hex-encoded SHA-256 checksum string (64 characters).
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened or read.
pub fn calculate_file_checksum(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| {
        QuireError::Io(format!("Failed to open {} for hashing: {e}", path.display()))
    })?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Calculate SHA-256 checksum of raw bytes
///
/// # Examples
///
/// ```
/// use quire::core::verification::checksum::calculate_checksum_bytes;
///
/// let checksum = calculate_checksum_bytes(b"id,name\n1,a\n");
/// assert_eq!(checksum.len(), 64);
/// ```
pub fn calculate_checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Verify that two files have identical content by checksum
///
/// Returns the shared checksum on success.
pub fn verify_copy(original: &Path, copy: &Path) -> Result<String> {
    let expected = calculate_file_checksum(original)?;
    let actual = calculate_file_checksum(copy)?;
    if expected != actual {
        return Err(QuireError::Storage(format!(
            "Checksum mismatch for {}: expected {expected}, found {actual}",
            copy.display()
        )));
    }
    Ok(actual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_calculate_checksum_bytes_known_value() {
        // sha256("abc")
        assert_eq!(
            calculate_checksum_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_file_checksum_matches_bytes_checksum() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.csv");
        std::fs::write(&path, b"id,name\n1,a\n").unwrap();

        let from_file = calculate_file_checksum(&path).unwrap();
        assert_eq!(from_file, calculate_checksum_bytes(b"id,name\n1,a\n"));
    }

    #[test]
    fn test_file_checksum_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = calculate_file_checksum(&dir.path().join("missing.csv")).unwrap_err();
        assert!(matches!(err, QuireError::Io(_)));
    }

    #[test]
    fn test_verify_copy_detects_difference() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        std::fs::write(&a, b"id\n1\n").unwrap();
        let mut file = File::create(&b).unwrap();
        file.write_all(b"id\n2\n").unwrap();

        let err = verify_copy(&a, &b).unwrap_err();
        assert!(matches!(err, QuireError::Storage(_)));

        std::fs::copy(&a, &b).unwrap();
        assert_eq!(verify_copy(&a, &b).unwrap().len(), 64);
    }
}
