//! Checksums for file records
//!
//! File content carries a SHA-256 digest in the bundle so the importer can
//! check blobs read from a cache or an external path. File ids are derived
//! from the source path the same way, which makes them content-addressed
//! per installation.

use sha2::{Digest, Sha256};

/// Calculate SHA-256 checksum of raw bytes
///
/// Returns a hex-encoded SHA-256 checksum string (64 characters).
pub fn calculate_checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    format!("{result:x}")
}

/// Portable file id for a blob stored at `path` in the source installation
pub fn path_digest(path: &str) -> String {
    calculate_checksum_bytes(path.as_bytes())
}

/// Checks `data` against the size and checksum a file record declares
///
/// An empty `expected_checksum` skips the digest comparison.
///
/// # Errors
///
/// Returns a description of the first mismatch.
pub fn verify_blob(data: &[u8], expected_checksum: &str, expected_size: u64) -> Result<(), String> {
    if expected_size != 0 && data.len() as u64 != expected_size {
        return Err(format!(
            "size mismatch: expected {} bytes, found {}",
            expected_size,
            data.len()
        ));
    }
    if !expected_checksum.is_empty() {
        let actual = calculate_checksum_bytes(data);
        if !actual.eq_ignore_ascii_case(expected_checksum) {
            return Err(format!(
                "checksum mismatch: expected {}, found {}",
                expected_checksum, actual
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_checksum_bytes_known_value() {
        let checksum = calculate_checksum_bytes(b"Hello, World!");
        assert_eq!(
            checksum,
            "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
        );
    }

    #[test]
    fn test_calculate_checksum_bytes_deterministic() {
        let data = b"Test data";
        assert_eq!(calculate_checksum_bytes(data), calculate_checksum_bytes(data));
    }

    #[test]
    fn test_path_digest_differs_per_path() {
        let a = path_digest("var/storage/images/a.png");
        let b = path_digest("var/storage/images/b.png");
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_verify_blob() {
        let data = b"Hello, World!";
        let checksum = calculate_checksum_bytes(data);
        assert!(verify_blob(data, &checksum, 13).is_ok());
        assert!(verify_blob(data, &checksum.to_uppercase(), 0).is_ok());
        assert!(verify_blob(data, "", 13).is_ok());

        let err = verify_blob(data, &checksum, 12).unwrap_err();
        assert!(err.contains("size mismatch"));

        let err = verify_blob(b"other", &checksum, 0).unwrap_err();
        assert!(err.contains("checksum mismatch"));
    }
}
