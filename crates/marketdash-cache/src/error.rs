//! Cache fetch errors.

/// The upstream failed and there was no cached value to fall back on.
///
/// Wraps the upstream's own error so callers can still inspect it.
#[derive(Debug, thiserror::Error)]
#[error("upstream unavailable for '{key}' and nothing cached: {error}")]
pub struct FetchError<E> {
    /// Cache key that was being resolved.
    pub key: String,
    /// Error reported by the upstream fetch.
    pub error: E,
}

impl<E> FetchError<E> {
    pub fn new(key: impl Into<String>, error: E) -> Self {
        Self {
            key: key.into(),
            error,
        }
    }
}
