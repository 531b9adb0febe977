//! Generation naming and request-identity cache keys.

use sha2::{Digest, Sha256};

/// Namespace suffix shared by every generation this worker creates. Caches
/// are shared across the whole origin; the suffix keeps ours recognizable.
pub const CACHE_NAMESPACE: &str = "sw-cache-";

/// Storage key of the generation belonging to a version tag.
pub fn generation_key(version_tag: &str) -> String {
    format!("{version_tag}:{CACHE_NAMESPACE}")
}

/// Prefix that identifies keys belonging to a version tag. The colon
/// terminates the tag, so tag "4" does not claim "40:sw-cache-".
pub fn version_prefix(version_tag: &str) -> String {
    format!("{version_tag}:")
}

/// Compute the cache identity key for a request: method plus URL, bodies
/// ignored.
pub fn compute_entry_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
