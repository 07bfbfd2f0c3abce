//! Configuration errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for configuration handling.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors detected while building or loading a cache configuration.
///
/// All of these are fatal to the creation call that observed them; nothing
/// is ever silently defaulted.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum ConfigError {
    /// Page size is not a power of two, or is out of range.
    #[error("invalid page size {page_size}: must be a power of two")]
    InvalidPageSize { page_size: usize },

    /// The cache was configured to hold no pages.
    #[error("max_num_pages must be at least 1")]
    ZeroCapacity,

    /// Hash bucket count is not a power of two, or is out of range.
    #[error("invalid hash bucket count {buckets}: must be a power of two")]
    InvalidBucketCount { buckets: usize },

    /// Replacement policy code is not implemented.
    #[error("unsupported replacement policy code {code}")]
    UnsupportedPolicy { code: u32 },

    /// Replacement policy name is not recognized.
    #[error("unsupported replacement policy {name:?}")]
    UnknownPolicy { name: String },

    /// TOML parse failure.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization failure.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Configuration file could not be read or written.
    #[error("configuration file {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

impl ConfigError {
    /// Creates an I/O error annotated with the file path.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
