//! # pagebuf-store
//!
//! Page-aligned backing stores for the pagebuf page cache.
//!
//! The cache never touches durable storage itself. Every page it loads or
//! writes back goes through the [`PageStore`] trait, which a backing store
//! implements with page-aligned offsets and page-multiple lengths.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            PageStore Trait              │
//! │  (read, write, flush, eoa, eof, close)  │
//! └─────────────────────────────────────────┘
//!              │                   │
//!              ▼                   ▼
//! ┌─────────────────────┐  ┌─────────────────────┐
//! │    MemoryStore      │  │     FileStore       │
//! │  (sparse, in RAM)   │  │  (positional file)  │
//! └─────────────────────┘  └─────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use pagebuf_store::{MemoryStore, PageStore};
//!
//! let mut store = MemoryStore::new();
//! store.write(4096, &[7u8; 4096]).unwrap();
//!
//! let mut page = vec![0u8; 4096];
//! store.read(4096, &mut page).unwrap();
//! assert!(page.iter().all(|&b| b == 7));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod file;
#[cfg(any(test, feature = "testing"))]
mod flaky;
mod memory;
mod options;
mod store;

pub use error::{StoreError, StoreResult};
pub use file::FileStore;
#[cfg(any(test, feature = "testing"))]
pub use flaky::FlakyStore;
pub use memory::{MemoryStore, StoreStats, MEMORY_CHUNK_SIZE};
pub use options::OpenOptions;
pub use store::{check_range, PageStore};
