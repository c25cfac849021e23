//! SHA-256 checksums for drift detection.

use sha2::{Digest, Sha256};

/// Compute the lowercase hex SHA-256 checksum of a migration's raw content.
///
/// The checksum covers the exact bytes on disk; whitespace or line-ending
/// changes to an applied script show up as drift.
pub fn compute_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
