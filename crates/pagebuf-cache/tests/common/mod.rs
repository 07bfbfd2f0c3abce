//! Helpers shared by the integration tests.

#![allow(dead_code)]

use pagebuf_cache::PageBuffer;
use pagebuf_common::types::PageSize;
use pagebuf_common::CacheConfig;
use pagebuf_store::MemoryStore;

pub use pagebuf_store::FlakyStore;

/// Opens a cache over a memory store that rejects unaligned requests, so
/// every test also checks that the cache only issues page-aligned I/O.
pub fn aligned_cache(page_size: usize, max_num_pages: usize) -> PageBuffer<MemoryStore> {
    let ps = PageSize::new(page_size).unwrap();
    PageBuffer::open(
        MemoryStore::with_alignment(ps),
        CacheConfig::new(page_size, max_num_pages),
    )
    .unwrap()
}

/// Deterministic non-repeating test bytes.
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(13).wrapping_add(seed ^ (i >> 8) as u8))
        .collect()
}
