//! Deterministic point identifiers for indexed chunks.

use sha1::{Digest, Sha1};
use uuid::{Builder, Uuid};

/// Derive the stable identifier of chunk `chunk_index` of `file_name`.
///
/// The id is the first 16 bytes of SHA-1 over the bare `"<file_name>:<chunk_index>"` string,
/// stamped with the version 5 and RFC 4122 variant bits. No namespace is mixed in, so ids match
/// points written by earlier deployments of the service and re-indexing overwrites them.
pub fn chunk_id(file_name: &str, chunk_index: usize) -> Uuid {
    let mut hasher = Sha1::new();
    hasher.update(format!("{file_name}:{chunk_index}").as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Builder::from_sha1_bytes(bytes).into_uuid()
}
