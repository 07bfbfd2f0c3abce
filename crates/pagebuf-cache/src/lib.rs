//! # pagebuf-cache
//!
//! A page buffer cache: byte-granular reads and writes over a page-granular
//! backing store, with LRU replacement and dirty page write-back.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         PageBuffer                               │
//! │  ┌─────────────────────────────────────────────────────────────┐ │
//! │  │   RequestSplit: head │ middle (whole pages) │ tail           │ │
//! │  └─────────────────────────────────────────────────────────────┘ │
//! │               │                          │                       │
//! │               ▼                          ▼ long runs             │
//! │  ┌──────────────────────────┐   ┌──────────────────────────┐     │
//! │  │       HashIndex          │   │     direct store I/O     │     │
//! │  │  offset → PageHandle     │   └──────────────────────────┘     │
//! │  └──────────────────────────┘                                    │
//! │               │                                                  │
//! │               ▼                                                  │
//! │  ┌─────────────────────────────────────────────────────────────┐ │
//! │  │                    Page header arena                         │ │
//! │  │  ┌─────────┐ ┌─────────┐ ┌─────────┐     ┌─────────┐       │ │
//! │  │  │ offset  │ │ offset  │ │ offset  │ ... │ offset  │       │ │
//! │  │  │ data[]  │ │ data[]  │ │ data[]  │     │ data[]  │       │ │
//! │  │  │ flags   │ │ flags   │ │ flags   │     │ flags   │       │ │
//! │  │  └─────────┘ └─────────┘ └─────────┘     └─────────┘       │ │
//! │  └─────────────────────────────────────────────────────────────┘ │
//! │               │                                                  │
//! │               ▼                                                  │
//! │  ┌─────────────────────────────────────────────────────────────┐ │
//! │  │        ReplacementList (MRU ⇄ ... ⇄ LRU victim)              │ │
//! │  └─────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//!                     PageStore (MemoryStore, FileStore, PageBuffer)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use pagebuf_cache::PageBuffer;
//! use pagebuf_common::CacheConfig;
//! use pagebuf_store::MemoryStore;
//!
//! let mut cache = PageBuffer::open(MemoryStore::new(), CacheConfig::new(4096, 64)).unwrap();
//! cache.write(10_000, b"hello").unwrap();
//!
//! let mut buf = [0u8; 5];
//! cache.read(10_000, &mut buf).unwrap();
//! assert_eq!(&buf, b"hello");
//!
//! cache.close().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod error;
pub mod guard;
pub mod hash;
pub mod page;
pub mod replacement;
pub mod shared;
pub mod split;
pub mod stats;

pub use buffer::{EoaTranslator, PageBuffer};
pub use error::{CacheError, CacheResult, IntegrityError};
pub use guard::BusyGuard;
pub use hash::{HashIndex, Probe};
pub use page::{PageFlags, PageHandle, PageHeader};
pub use replacement::{ReplacementList, Victim};
pub use shared::SharedPageBuffer;
pub use split::{PageRun, PartialPage, RequestSplit};
pub use stats::{CacheStats, IoStats};
