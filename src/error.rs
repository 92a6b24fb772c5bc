/// Error type for cache operations.
///
/// Producer failures are never wrapped in this type: `fetch` hands the
/// producer's own error back to the caller untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// The entry behind a subscription was removed by `clear` or `clear_all`.
    #[error("cache entry for key '{key}' was cleared")]
    Cleared { key: String },
}

impl CacheError {
    /// Create a new cleared error.
    pub fn cleared(key: impl Into<String>) -> Self {
        CacheError::Cleared { key: key.into() }
    }
}
