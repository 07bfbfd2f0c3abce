//! Configuration for the pagebuf page cache.

mod cache;
mod error;

pub use cache::{CacheConfig, ReplacementPolicy};
pub use error::{ConfigError, ConfigResult};
