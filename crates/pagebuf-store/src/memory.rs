//! Sparse in-memory backing store.

use std::collections::HashMap;

use pagebuf_common::types::PageSize;
use tracing::trace;

use super::error::{StoreError, StoreResult};
use super::store::{check_range, PageStore};

/// Granularity at which [`MemoryStore`] allocates backing memory.
pub const MEMORY_CHUNK_SIZE: usize = 4096;

/// Operation counters kept by [`MemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of read calls.
    pub reads: u64,
    /// Number of write calls.
    pub writes: u64,
    /// Total bytes read.
    pub bytes_read: u64,
    /// Total bytes written.
    pub bytes_written: u64,
    /// Number of flush calls.
    pub flushes: u64,
    /// Number of set_eoa calls.
    pub eoa_updates: u64,
}

/// A sparse in-memory store.
///
/// Memory is allocated in [`MEMORY_CHUNK_SIZE`] chunks as it is written, so
/// writing at a large offset does not allocate everything below it. Reads of
/// never-written bytes return zeros.
///
/// With [`MemoryStore::with_alignment`] the store rejects any request that
/// is not page aligned, which is how the cache tests prove that only
/// page-aligned I/O reaches the backing store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    chunks: HashMap<u64, Box<[u8]>>,
    /// Highest written end offset.
    eof: u64,
    eoa: u64,
    alignment: Option<PageSize>,
    stats: StoreStats,
    closed: bool,
}

impl MemoryStore {
    /// Creates an empty store that accepts requests of any alignment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store that rejects requests not aligned to
    /// `page_size`.
    pub fn with_alignment(page_size: PageSize) -> Self {
        Self {
            alignment: Some(page_size),
            ..Self::default()
        }
    }

    /// Returns the operation counters.
    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    /// Resets the operation counters.
    pub fn reset_stats(&mut self) {
        self.stats = StoreStats::default();
    }

    /// Returns true once [`PageStore::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Reads bytes without counting the access or checking alignment.
    ///
    /// Intended for tests and tooling that want to inspect what actually
    /// reached the store.
    pub fn peek(&self, offset: u64, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        self.copy_out(offset, &mut buf);
        buf
    }

    fn check_open(&self) -> StoreResult<()> {
        if self.closed {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    fn copy_out(&self, offset: u64, buf: &mut [u8]) {
        let mut done = 0usize;
        while done < buf.len() {
            let addr = offset + done as u64;
            let chunk = addr / MEMORY_CHUNK_SIZE as u64;
            let within = (addr % MEMORY_CHUNK_SIZE as u64) as usize;
            let n = (MEMORY_CHUNK_SIZE - within).min(buf.len() - done);
            match self.chunks.get(&chunk) {
                Some(data) => buf[done..done + n].copy_from_slice(&data[within..within + n]),
                None => buf[done..done + n].fill(0),
            }
            done += n;
        }
    }

    fn copy_in(&mut self, offset: u64, buf: &[u8]) {
        let mut done = 0usize;
        while done < buf.len() {
            let addr = offset + done as u64;
            let chunk = addr / MEMORY_CHUNK_SIZE as u64;
            let within = (addr % MEMORY_CHUNK_SIZE as u64) as usize;
            let n = (MEMORY_CHUNK_SIZE - within).min(buf.len() - done);
            let data = self
                .chunks
                .entry(chunk)
                .or_insert_with(|| vec![0u8; MEMORY_CHUNK_SIZE].into_boxed_slice());
            data[within..within + n].copy_from_slice(&buf[done..done + n]);
            done += n;
        }
    }
}

impl PageStore for MemoryStore {
    fn read(&mut self, offset: u64, buf: &mut [u8]) -> StoreResult<()> {
        self.check_open()?;
        check_range(offset, buf.len(), self.alignment)?;

        self.copy_out(offset, buf);
        self.stats.reads += 1;
        self.stats.bytes_read += buf.len() as u64;
        trace!(offset, len = buf.len(), "memory store read");
        Ok(())
    }

    fn write(&mut self, offset: u64, buf: &[u8]) -> StoreResult<()> {
        self.check_open()?;
        let end = check_range(offset, buf.len(), self.alignment)?;

        self.copy_in(offset, buf);
        self.eof = self.eof.max(end);
        self.stats.writes += 1;
        self.stats.bytes_written += buf.len() as u64;
        trace!(offset, len = buf.len(), "memory store write");
        Ok(())
    }

    fn flush(&mut self) -> StoreResult<()> {
        self.check_open()?;
        self.stats.flushes += 1;
        Ok(())
    }

    fn eoa(&self) -> u64 {
        self.eoa
    }

    fn set_eoa(&mut self, addr: u64) -> StoreResult<()> {
        self.check_open()?;
        self.eoa = addr;
        self.stats.eoa_updates += 1;
        Ok(())
    }

    fn eof(&self) -> StoreResult<u64> {
        self.check_open()?;
        Ok(self.eof)
    }

    fn close(&mut self) -> StoreResult<()> {
        self.check_open()?;
        self.closed = true;
        Ok(())
    }
}
