//! Cache statistics for monitoring and debugging.
//!
//! The hash index and replacement list keep no counters. The controller
//! fills an [`IoStats`] while it serves one top-level call and folds it
//! into the cumulative [`CacheStats`] when the call returns, whether it
//! succeeded or not.

use std::fmt;

/// Counters gathered while serving a single call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoStats {
    /// Page lookups satisfied from the cache.
    pub hits: u64,
    /// Page lookups that had to load from the backing store.
    pub misses: u64,
    /// Pages reclaimed to make room.
    pub evictions: u64,
    /// Dirty pages written back because they were evicted.
    pub dirty_writebacks: u64,
    /// Dirty pages written back by a flush.
    pub flushed_pages: u64,
    /// Full pages read straight from the backing store.
    pub direct_page_reads: u64,
    /// Full pages written straight to the backing store.
    pub direct_page_writes: u64,
    /// Cached pages invalidated.
    pub invalidations: u64,
    /// Hash index searches, whatever the caller.
    pub hash_searches: u64,
    /// Hash chain entries compared.
    pub hash_probes: u64,
    /// Longest hash chain seen.
    pub max_bucket_depth: usize,
    /// Busy pages passed over during victim selection.
    pub busy_skips: u64,
    /// Fresh page buffers allocated.
    pub allocations: u64,
}

impl IoStats {
    /// Records one hash index search that compared `depth` chain entries.
    #[inline]
    pub fn record_probe(&mut self, depth: usize) {
        self.hash_searches += 1;
        self.hash_probes += depth as u64;
        self.observe_bucket_depth(depth);
    }

    /// Records a hash chain length.
    #[inline]
    pub fn observe_bucket_depth(&mut self, depth: usize) {
        self.max_bucket_depth = self.max_bucket_depth.max(depth);
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Cumulative statistics of a page buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    /// Client read calls.
    pub reads: u64,
    /// Client write calls.
    pub writes: u64,
    /// Bytes returned to clients.
    pub bytes_read: u64,
    /// Bytes accepted from clients.
    pub bytes_written: u64,
    /// Flush calls.
    pub flushes: u64,
    /// Page lookups satisfied from the cache.
    pub hits: u64,
    /// Page lookups that had to load from the backing store.
    pub misses: u64,
    /// Pages reclaimed to make room.
    pub evictions: u64,
    /// Dirty pages written back because they were evicted.
    pub dirty_writebacks: u64,
    /// Dirty pages written back by a flush.
    pub flushed_pages: u64,
    /// Full pages read straight from the backing store.
    pub direct_page_reads: u64,
    /// Full pages written straight to the backing store.
    pub direct_page_writes: u64,
    /// Cached pages invalidated.
    pub invalidations: u64,
    /// Hash index searches, whatever the caller.
    pub hash_searches: u64,
    /// Hash chain entries compared.
    pub hash_probes: u64,
    /// Longest hash chain ever seen.
    pub max_bucket_depth: usize,
    /// Busy pages passed over during victim selection.
    pub busy_skips: u64,
    /// Fresh page buffers allocated.
    pub allocations: u64,
}

impl CacheStats {
    /// Creates zeroed statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds the counters of one call into the totals.
    pub fn merge(&mut self, io: &IoStats) {
        self.hits += io.hits;
        self.misses += io.misses;
        self.evictions += io.evictions;
        self.dirty_writebacks += io.dirty_writebacks;
        self.flushed_pages += io.flushed_pages;
        self.direct_page_reads += io.direct_page_reads;
        self.direct_page_writes += io.direct_page_writes;
        self.invalidations += io.invalidations;
        self.hash_searches += io.hash_searches;
        self.hash_probes += io.hash_probes;
        self.max_bucket_depth = self.max_bucket_depth.max(io.max_bucket_depth);
        self.busy_skips += io.busy_skips;
        self.allocations += io.allocations;
    }

    /// Returns the number of cached page lookups.
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    /// Returns the hit ratio (0.0 to 1.0).
    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.lookups();
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }

    /// Returns the miss ratio (0.0 to 1.0).
    pub fn miss_ratio(&self) -> f64 {
        if self.lookups() == 0 {
            0.0
        } else {
            1.0 - self.hit_ratio()
        }
    }

    /// Returns the average number of chain entries compared per hash index
    /// search. Searches made by flushes, invalidations and direct transfers
    /// count as well as cached lookups.
    pub fn average_probe_depth(&self) -> f64 {
        if self.hash_searches == 0 {
            0.0
        } else {
            self.hash_probes as f64 / self.hash_searches as f64
        }
    }

    /// Resets all statistics.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ reads: {}, writes: {}, hits: {}, misses: {}, hit_ratio: {:.2}%, evictions: {}, dirty_writebacks: {}, flushed_pages: {}, direct_reads: {}, direct_writes: {}, invalidations: {} }}",
            self.reads,
            self.writes,
            self.hits,
            self.misses,
            self.hit_ratio() * 100.0,
            self.evictions,
            self.dirty_writebacks,
            self.flushed_pages,
            self.direct_page_reads,
            self.direct_page_writes,
            self.invalidations
        )
    }
}
