use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Identifies a logical request for caching purposes.
///
/// Every request that should share cached data and updates must resolve to the
/// same key. Keys are usually built from the request line
/// ([`CacheKey::from_request`]), given explicitly, or derived from the type of
/// the producer ([`CacheKey::for_producer`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Create a key from an explicit string.
    pub fn new(key: impl Into<String>) -> Self {
        CacheKey(key.into())
    }

    /// Build a key from an HTTP-style method and path.
    ///
    /// Format: `{METHOD} {path}`, with the method upper-cased so `get` and `GET`
    /// address the same entry.
    pub fn from_request(method: &str, path: &str) -> Self {
        CacheKey(format!("{} {}", method.trim().to_ascii_uppercase(), path.trim()))
    }

    /// Derive a key from the producer's type.
    ///
    /// Each closure and function item has its own type, so two call sites
    /// passing the same function share a key while distinct closures do not.
    pub fn for_producer<F>() -> Self {
        CacheKey(format!("producer:{}", std::any::type_name::<F>()))
    }

    /// Same as [`CacheKey::for_producer`], inferring the type from a value.
    pub fn of_producer<F>(_producer: &F) -> Self {
        Self::for_producer::<F>()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CacheKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        CacheKey(key.to_string())
    }
}

impl From<String> for CacheKey {
    fn from(key: String) -> Self {
        CacheKey(key)
    }
}

impl From<&CacheKey> for CacheKey {
    fn from(key: &CacheKey) -> Self {
        key.clone()
    }
}
