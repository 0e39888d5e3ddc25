//! Deterministic file identity.
//!
//! `file_id` is the SHA-256 hex digest over the original name, the size in
//! bytes and the first MiB of content. That is enough to dedupe re-uploads
//! of the same file while letting same-named files with different content
//! coexist.

use omnivault_core::StoreError;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Number of leading content bytes folded into the identity hash.
const IDENTITY_PREFIX_BYTES: usize = 1024 * 1024;

/// Compute the deterministic `file_id` for a file on disk.
pub async fn compute_file_id(path: &Path, original_name: &str) -> Result<String, StoreError> {
    let metadata = tokio::fs::metadata(path).await?;
    let size_bytes = metadata.len();

    let mut file = tokio::fs::File::open(path).await?;
    let mut prefix = vec![0u8; IDENTITY_PREFIX_BYTES.min(size_bytes as usize)];
    file.read_exact(&mut prefix).await?;

    Ok(file_id_from_parts(original_name, size_bytes, &prefix))
}

/// Hash the identity parts. Split out so stores and tests can derive ids
/// without touching the filesystem.
#[must_use]
pub fn file_id_from_parts(original_name: &str, size_bytes: u64, prefix: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(original_name.as_bytes());
    hasher.update(size_bytes.to_le_bytes());
    hasher.update(prefix);
    format!("{:x}", hasher.finalize())
}
