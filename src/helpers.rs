//! Key helpers shared by callers of every backend.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{CacheError, Result};

/// Builds a cache key of the form `prefix:<hex digest>` from any serializable value.
///
/// The digest is taken over the value's JSON encoding, so equal values always
/// map to the same key and the key length does not depend on the value size.
///
/// # Example
/// ```
/// use tagcache::helpers::hash_key;
///
/// let key = hash_key("user", &("alice", 42)).unwrap();
/// assert!(key.starts_with("user:"));
/// assert_eq!(key.len(), "user:".len() + 64);
/// ```
pub fn hash_key<T: Serialize + ?Sized>(prefix: &str, value: &T) -> Result<String> {
    let encoded = serde_json::to_vec(value).map_err(|e| CacheError::Encode(e.to_string()))?;
    let mut hasher = Sha256::new();
    hasher.update(&encoded);
    Ok(format!("{}:{}", prefix, hex::encode(hasher.finalize())))
}
