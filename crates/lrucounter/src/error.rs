//! Error types for lrucounter

/// Result type alias for lrucounter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for building a counter cache
///
/// Only construction can fail. Lookups report absence as `None` and a
/// rate-limit rejection is a normal [`Decision`](crate::Decision).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Capacity was zero
    #[error("capacity must be positive")]
    ZeroCapacity,
}
