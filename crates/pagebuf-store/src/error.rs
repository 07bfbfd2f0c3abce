//! Backing store error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for backing store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur inside a backing store.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum StoreError {
    /// Standard I/O error.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// File not found.
    #[error("file not found: {path}")]
    NotFound { path: PathBuf },

    /// Permission denied.
    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// File already exists.
    #[error("file already exists: {path}")]
    AlreadyExists { path: PathBuf },

    /// Request is not aligned to the store's page size.
    #[error("misaligned request: offset {offset}, length {len}, alignment {alignment}")]
    Misaligned {
        offset: u64,
        len: usize,
        alignment: usize,
    },

    /// `offset + len` does not fit in the address space.
    #[error("address overflow: offset {offset} + length {len}")]
    AddressOverflow { offset: u64, len: usize },

    /// Short read/write (less data than expected).
    #[error("short {operation}: expected {expected} bytes, got {actual}")]
    ShortIo {
        operation: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Invalid operation for the store's mode.
    #[error("invalid operation: {operation} not allowed in {mode} mode")]
    InvalidOperation {
        operation: &'static str,
        mode: &'static str,
    },

    /// The store has been closed.
    #[error("store is closed")]
    Closed,

    /// Failure reported by a stacked layer (for example a nested cache).
    #[error("layer error: {source}")]
    Layer {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StoreError {
    /// Creates a Misaligned error.
    pub fn misaligned(offset: u64, len: usize, alignment: usize) -> Self {
        Self::Misaligned {
            offset,
            len,
            alignment,
        }
    }

    /// Creates a ShortIo error for writes.
    pub fn short_write(expected: usize, actual: usize) -> Self {
        Self::ShortIo {
            operation: "write",
            expected,
            actual,
        }
    }

    /// Wraps an error raised by a stacked layer.
    pub fn layer(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Layer {
            source: Box::new(source),
        }
    }

    /// Converts from std::io::Error with path context.
    pub fn from_io_with_path(err: io::Error, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            io::ErrorKind::AlreadyExists => Self::AlreadyExists { path },
            _ => Self::Io { source: err },
        }
    }

    /// Returns true if this is a retryable error.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Io { source } => {
                source.kind() == io::ErrorKind::Interrupted
                    || source.kind() == io::ErrorKind::WouldBlock
            }
            _ => false,
        }
    }

    /// Returns true if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
            || matches!(self, Self::Io { source } if source.kind() == io::ErrorKind::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_with_path() {
        let err = StoreError::from_io_with_path(
            io::Error::new(io::ErrorKind::NotFound, "missing"),
            "/tmp/pages.db",
        );
        assert!(err.is_not_found());

        let err = StoreError::from_io_with_path(
            io::Error::new(io::ErrorKind::Other, "boom"),
            "/tmp/pages.db",
        );
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn test_retryable() {
        let err: StoreError = io::Error::new(io::ErrorKind::Interrupted, "eintr").into();
        assert!(err.is_retryable());
        assert!(!StoreError::Closed.is_retryable());
        assert!(!StoreError::misaligned(1, 4096, 4096).is_retryable());
    }

    #[test]
    fn test_layer_error() {
        let err = StoreError::layer(io::Error::new(io::ErrorKind::Other, "inner"));
        assert!(err.to_string().contains("inner"));
    }
}
