//! Page buffer cache errors.

use pagebuf_common::config::ConfigError;
use pagebuf_store::StoreError;
use thiserror::Error;

/// Result type for page buffer cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Broken cache invariants.
///
/// None of these are recoverable: they mean the cache (or something
/// mutating the backing store behind its back) has a bug.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum IntegrityError {
    /// A page was still dirty after the final flush at close.
    #[error("page at offset {offset} is still dirty at close")]
    DirtyPageAtClose { offset: u64 },

    /// Every resident page is busy, so nothing can be evicted.
    #[error("no evictable page: all {resident} resident pages are busy")]
    NoEvictablePage { resident: usize },

    /// The backing store's EOA changed without going through the cache.
    #[error("backing store EOA is {actual}, expected {expected}")]
    EoaMismatch { expected: u64, actual: u64 },
}

/// Errors that can occur during page buffer cache operations.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum CacheError {
    /// Invalid cache configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A page buffer could not be allocated.
    #[error("failed to allocate a {bytes}-byte page buffer")]
    AllocationFailed { bytes: usize },

    /// Backing store failure, propagated verbatim.
    #[error("backing store error: {0}")]
    Store(#[from] StoreError),

    /// Cache integrity violation.
    #[error("cache integrity violated: {0}")]
    Integrity(#[from] IntegrityError),

    /// `address + length` does not fit in the address space.
    #[error("address overflow: address {addr} + length {len}")]
    AddressOverflow { addr: u64, len: usize },

    /// The cache has been closed.
    #[error("page buffer is closed")]
    Closed,
}

impl CacheError {
    /// Creates an allocation failure error.
    pub fn allocation_failed(bytes: usize) -> Self {
        Self::AllocationFailed { bytes }
    }

    /// Returns true if this is a cache integrity violation.
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::Integrity(_))
    }

    /// Returns true if the error indicates a logic bug rather than an
    /// environmental failure.
    pub fn is_fatal(&self) -> bool {
        self.is_integrity()
    }

    /// Returns true if the failed call may succeed when retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}
