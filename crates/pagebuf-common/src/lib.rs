//! # pagebuf-common
//!
//! Common types, constants and configuration for the pagebuf page cache.
//!
//! This crate provides the foundational pieces shared by the backing stores
//! and the cache itself:
//!
//! - **Types**: `PageSize` (validated power-of-two page geometry) and
//!   `PageNumber`
//! - **Config**: `CacheConfig` and `ReplacementPolicy`, loadable from TOML
//! - **Constants**: defaults and limits
//!
//! ## Example
//!
//! ```rust
//! use pagebuf_common::config::CacheConfig;
//! use pagebuf_common::types::PageSize;
//!
//! let config = CacheConfig::new(4096, 64);
//! config.validate().unwrap();
//!
//! let page_size = PageSize::new(config.page_size).unwrap();
//! assert_eq!(page_size.align_down(5000), 4096);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod types;

pub use config::{CacheConfig, ConfigError, ConfigResult, ReplacementPolicy};
pub use constants::*;
pub use types::{PageNumber, PageSize};
