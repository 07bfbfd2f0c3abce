//! Page buffer controller.
//!
//! [`PageBuffer`] sits between a client that reads and writes arbitrary
//! byte ranges and a [`PageStore`] that only understands whole,
//! page-aligned pages. Each request is cut into head, middle and tail
//! pieces (see [`RequestSplit`]); partial pages are merged through the
//! cache, whole pages that are not cached go straight to the store.

mod eoa;
mod layer;
mod lifecycle;

pub use eoa::EoaTranslator;

use pagebuf_common::config::CacheConfig;
use pagebuf_common::types::PageSize;
use pagebuf_store::PageStore;
use tracing::{debug, error, trace};

use crate::error::{CacheError, CacheResult, IntegrityError};
use crate::guard::BusyGuard;
use crate::hash::HashIndex;
use crate::page::{PageHandle, PageHeader};
use crate::replacement::ReplacementList;
use crate::split::{PageRun, PartialPage, RequestSplit};
use crate::stats::{CacheStats, IoStats};

/// Direction and client buffer of one request.
enum Transfer<'a> {
    Read(&'a mut [u8]),
    Write(&'a [u8]),
}

impl Transfer<'_> {
    fn len(&self) -> usize {
        match self {
            Self::Read(buf) => buf.len(),
            Self::Write(buf) => buf.len(),
        }
    }
}

/// A page buffer cache over a backing store.
///
/// It provides:
/// - Byte-granular reads and writes on top of a page-granular store
/// - LRU replacement over at most `max_num_pages` resident pages
/// - Dirty page tracking and write-back before eviction
/// - End-of-address translation between client and store views
///
/// Page headers live in an arena and are addressed by [`PageHandle`]; the
/// hash index and the replacement list only store handles.
pub struct PageBuffer<S: PageStore> {
    /// Configuration.
    config: CacheConfig,
    /// Validated page size.
    page_size: PageSize,
    /// Backing store.
    store: S,
    /// Arena of page headers.
    pages: Vec<PageHeader>,
    /// Allocated headers that are neither indexed nor listed.
    free: Vec<PageHandle>,
    /// Offset to page lookup.
    index: HashIndex,
    /// Resident pages, most recently used first.
    lru: ReplacementList,
    /// Number of pages in the replacement list.
    resident: usize,
    /// Client and store end-of-address.
    eoa: EoaTranslator,
    /// Cumulative statistics.
    stats: CacheStats,
    /// Set once `close` has released everything.
    closed: bool,
}

impl<S: PageStore> PageBuffer<S> {
    /// Reads `buf.len()` bytes starting at `addr`.
    pub fn read(&mut self, addr: u64, buf: &mut [u8]) -> CacheResult<()> {
        self.check_open()?;
        let len = buf.len() as u64;
        let mut io = IoStats::default();
        let result = self.transfer(addr, Transfer::Read(buf), &mut io);

        self.stats.reads += 1;
        if result.is_ok() {
            self.stats.bytes_read += len;
        }
        self.stats.merge(&io);
        result
    }

    /// Writes all of `buf` starting at `addr`.
    pub fn write(&mut self, addr: u64, buf: &[u8]) -> CacheResult<()> {
        self.check_open()?;
        let len = buf.len() as u64;
        let mut io = IoStats::default();
        let result = self.transfer(addr, Transfer::Write(buf), &mut io);

        self.stats.writes += 1;
        if result.is_ok() {
            self.stats.bytes_written += len;
        }
        self.stats.merge(&io);
        result
    }

    /// Writes back the page containing `addr` if it is cached and dirty.
    ///
    /// Returns true if a write-back happened.
    pub fn flush_page(&mut self, addr: u64) -> CacheResult<bool> {
        self.check_open()?;
        let mut io = IoStats::default();
        let result = match self.lookup(addr, &mut io) {
            Some(handle) => write_back(&mut self.store, &mut self.pages[handle.index()]),
            None => Ok(false),
        };
        if let Ok(true) = result {
            io.flushed_pages += 1;
        }
        self.stats.merge(&io);
        result
    }

    /// Writes back and drops the page containing `addr`.
    ///
    /// Returns true if the page was cached.
    pub fn evict_page(&mut self, addr: u64) -> CacheResult<bool> {
        self.check_open()?;
        let mut io = IoStats::default();
        let result = self.evict_cached(addr, &mut io);
        self.stats.merge(&io);
        result
    }

    /// Drops the cached copy of the page containing `addr` without writing
    /// it back. Unflushed modifications to that page are lost.
    ///
    /// Returns true if the page was cached.
    pub fn invalidate(&mut self, addr: u64) -> CacheResult<bool> {
        self.check_open()?;
        let mut io = IoStats::default();
        let handle = self.lookup(addr, &mut io);
        if let Some(handle) = handle {
            self.invalidate_page(handle, &mut io);
        }
        self.stats.merge(&io);
        Ok(handle.is_some())
    }

    /// Returns true if the page containing `addr` is cached and valid.
    pub fn contains(&self, addr: u64) -> bool {
        self.find(addr).is_some()
    }

    /// Returns true if the page containing `addr` is cached and dirty.
    pub fn is_dirty(&self, addr: u64) -> bool {
        self.find(addr)
            .is_some_and(|handle| self.pages[handle.index()].is_dirty())
    }

    /// Returns the number of resident pages, invalidated ones included.
    #[inline]
    pub fn resident_pages(&self) -> usize {
        self.resident
    }

    /// Returns the number of resident pages awaiting write-back.
    pub fn dirty_pages(&self) -> usize {
        self.lru
            .iter()
            .filter(|h| self.pages[h.index()].needs_write_back())
            .count()
    }

    /// Returns the offsets of resident pages, most recently used first.
    pub fn eviction_order(&self) -> Vec<u64> {
        self.lru
            .iter()
            .map(|h| self.pages[h.index()].offset())
            .collect()
    }

    /// Returns the page size.
    #[inline]
    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    /// Returns the maximum number of resident pages.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.config.max_num_pages
    }

    /// Returns the configuration.
    #[inline]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the cumulative statistics.
    #[inline]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Resets the cumulative statistics.
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// Returns the backing store.
    #[inline]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the backing store mutably. Changes made through it bypass
    /// the cache.
    #[inline]
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Returns true once the cache has been closed.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn check_open(&self) -> CacheResult<()> {
        if self.closed {
            Err(CacheError::Closed)
        } else {
            Ok(())
        }
    }

    fn transfer(&mut self, addr: u64, mut xfer: Transfer<'_>, io: &mut IoStats) -> CacheResult<()> {
        let split = RequestSplit::new(self.page_size, addr, xfer.len())?;

        if let Some(head) = split.head {
            self.transfer_partial(head, &mut xfer, io)?;
        }
        if let Some(run) = split.middle {
            if run.pages >= self.config.bypass_threshold() {
                match &mut xfer {
                    Transfer::Read(buf) => self.read_run(run, buf, io)?,
                    Transfer::Write(buf) => self.write_run(run, buf, io)?,
                }
            } else {
                self.transfer_cached_run(run, &mut xfer, io)?;
            }
        }
        if let Some(tail) = split.tail {
            self.transfer_partial(tail, &mut xfer, io)?;
        }
        Ok(())
    }

    fn transfer_partial(
        &mut self,
        piece: PartialPage,
        xfer: &mut Transfer<'_>,
        io: &mut IoStats,
    ) -> CacheResult<()> {
        // A page about to be overwritten in full need not be read first.
        let overwrite = matches!(xfer, Transfer::Write(_)) && piece.len == self.page_size.bytes();
        let handle = self.resolve_or_load(piece.page, !overwrite, io)?;
        let mut guard = BusyGuard::new(&mut self.pages[handle.index()]);
        match xfer {
            Transfer::Read(buf) => guard.copy_out(piece.in_page, &mut buf[piece.buf_range()]),
            Transfer::Write(buf) => guard.copy_in(piece.in_page, &buf[piece.buf_range()]),
        }
        Ok(())
    }

    /// Moves a short run of whole pages through the cache, one page at a
    /// time.
    fn transfer_cached_run(
        &mut self,
        run: PageRun,
        xfer: &mut Transfer<'_>,
        io: &mut IoStats,
    ) -> CacheResult<()> {
        for i in 0..run.pages {
            let piece = PartialPage {
                page: run.page(self.page_size, i),
                in_page: 0,
                len: self.page_size.bytes(),
                buf_offset: run.buf_offset_of(self.page_size, i),
            };
            self.transfer_partial(piece, xfer, io)?;
        }
        Ok(())
    }

    /// Reads whole pages, serving cached ones from the cache and batching
    /// contiguous uncached ones into single store reads.
    ///
    /// Cached pages are copied out and touched only after every store read
    /// has succeeded, so a failed read leaves the replacement order as it was.
    fn read_run(&mut self, run: PageRun, buf: &mut [u8], io: &mut IoStats) -> CacheResult<()> {
        let page_bytes = self.page_size.bytes();
        let mut direct: Option<PageRun> = None;
        let mut cached = Vec::new();

        for i in 0..run.pages {
            let offset = run.page(self.page_size, i);
            let buf_offset = run.buf_offset_of(self.page_size, i);

            let probe = self.index.search(offset);
            io.record_probe(probe.depth);
            match probe.handle {
                Some(handle) => {
                    if let Some(pending) = direct.take() {
                        self.read_direct(pending, buf, io)?;
                    }
                    cached.push((handle, buf_offset));
                }
                None => {
                    let pending = direct.get_or_insert(PageRun {
                        start: offset,
                        pages: 0,
                        buf_offset,
                    });
                    pending.pages += 1;
                }
            }
        }
        if let Some(pending) = direct {
            self.read_direct(pending, buf, io)?;
        }

        for (handle, buf_offset) in cached {
            self.lru.touch(handle);
            io.hits += 1;
            BusyGuard::new(&mut self.pages[handle.index()])
                .copy_out(0, &mut buf[buf_offset..buf_offset + page_bytes]);
        }
        Ok(())
    }

    fn read_direct(&mut self, run: PageRun, buf: &mut [u8], io: &mut IoStats) -> CacheResult<()> {
        let bytes = run.bytes(self.page_size);
        self.store
            .read(run.start, &mut buf[run.buf_offset..run.buf_offset + bytes])?;
        io.direct_page_reads += run.pages as u64;
        trace!(offset = run.start, pages = run.pages, "direct read");
        Ok(())
    }

    /// Writes whole pages straight to the store, invalidating any cached
    /// copies first.
    fn write_run(&mut self, run: PageRun, buf: &[u8], io: &mut IoStats) -> CacheResult<()> {
        for i in 0..run.pages {
            let offset = run.page(self.page_size, i);
            let probe = self.index.search(offset);
            io.record_probe(probe.depth);
            if let Some(handle) = probe.handle {
                self.invalidate_page(handle, io);
            }
        }

        let bytes = run.bytes(self.page_size);
        self.store
            .write(run.start, &buf[run.buf_offset..run.buf_offset + bytes])?;
        io.direct_page_writes += run.pages as u64;
        trace!(offset = run.start, pages = run.pages, "direct write");
        Ok(())
    }

    /// Returns the cached page at the page-aligned `offset`.
    ///
    /// On a miss the page is read from the store when `load` is set; when it
    /// is not, the caller must overwrite the whole buffer.
    fn resolve_or_load(
        &mut self,
        offset: u64,
        load: bool,
        io: &mut IoStats,
    ) -> CacheResult<PageHandle> {
        let probe = self.index.search(offset);
        io.record_probe(probe.depth);
        if let Some(handle) = probe.handle {
            self.lru.touch(handle);
            io.hits += 1;
            trace!(offset, handle = %handle, "page hit");
            return Ok(handle);
        }

        io.misses += 1;
        let handle = self.acquire_page(io)?;
        let page = &mut self.pages[handle.index()];
        page.reset(offset);
        let loaded = if load {
            let mut guard = BusyGuard::new(page);
            self.store.read(offset, guard.buffer_mut())
        } else {
            Ok(())
        };
        if let Err(e) = loaded {
            debug!(offset, error = %e, "page load failed");
            self.free.push(handle);
            return Err(e.into());
        }

        let depth = self.index.insert(handle, offset);
        io.observe_bucket_depth(depth);
        self.lru.prepend(handle);
        self.resident += 1;
        trace!(offset, handle = %handle, "page loaded");
        Ok(handle)
    }

    /// Returns a detached header: recycled, freshly allocated, or evicted.
    fn acquire_page(&mut self, io: &mut IoStats) -> CacheResult<PageHandle> {
        if self.resident < self.config.max_num_pages {
            if let Some(handle) = self.free.pop() {
                return Ok(handle);
            }
            return self.allocate_page(io);
        }
        self.evict(io)
    }

    fn allocate_page(&mut self, io: &mut IoStats) -> CacheResult<PageHandle> {
        let bytes = self.page_size.bytes();
        let mut data = Vec::new();
        data.try_reserve_exact(bytes)
            .map_err(|_| CacheError::allocation_failed(bytes))?;
        data.resize(bytes, 0u8);
        self.pages
            .try_reserve(1)
            .map_err(|_| CacheError::allocation_failed(bytes))?;

        let handle = PageHandle::new(self.pages.len());
        self.pages.push(PageHeader::new(data.into_boxed_slice()));
        io.allocations += 1;
        trace!(handle = %handle, bytes, "allocated page buffer");
        Ok(handle)
    }

    /// Reclaims the least recently used page that is not busy.
    fn evict(&mut self, io: &mut IoStats) -> CacheResult<PageHandle> {
        let pages = &self.pages;
        let Some(victim) = self.lru.select_victim(|h| pages[h.index()].is_busy()) else {
            error!(resident = self.resident, "no evictable page");
            return Err(IntegrityError::NoEvictablePage {
                resident: self.resident,
            }
            .into());
        };
        io.busy_skips += victim.skipped as u64;

        let handle = victim.handle;
        if write_back(&mut self.store, &mut self.pages[handle.index()])? {
            io.dirty_writebacks += 1;
        }
        self.detach(handle);
        io.evictions += 1;
        debug!(offset = self.pages[handle.index()].offset(), handle = %handle, "evicted page");
        Ok(handle)
    }

    fn evict_cached(&mut self, addr: u64, io: &mut IoStats) -> CacheResult<bool> {
        let Some(handle) = self.lookup(addr, io) else {
            return Ok(false);
        };
        if write_back(&mut self.store, &mut self.pages[handle.index()])? {
            io.dirty_writebacks += 1;
        }
        self.detach(handle);
        self.free.push(handle);
        io.evictions += 1;
        debug!(offset = self.pages[handle.index()].offset(), "dropped page");
        Ok(true)
    }

    /// Marks a page invalid, unindexes it and moves it to the eviction end.
    fn invalidate_page(&mut self, handle: PageHandle, io: &mut IoStats) {
        let page = &mut self.pages[handle.index()];
        page.invalidate();
        self.index.remove(handle);
        self.lru.remove(handle);
        self.lru.append(handle);
        io.invalidations += 1;
        debug!(offset = page.offset(), "invalidated page");
    }

    /// Unlinks a resident page from both the index and the list.
    fn detach(&mut self, handle: PageHandle) {
        self.index.remove(handle);
        self.lru.remove(handle);
        self.resident -= 1;
    }

    fn lookup(&self, addr: u64, io: &mut IoStats) -> Option<PageHandle> {
        let probe = self.index.search(self.page_size.align_down(addr));
        io.record_probe(probe.depth);
        probe.handle
    }

    fn find(&self, addr: u64) -> Option<PageHandle> {
        self.index.search(self.page_size.align_down(addr)).handle
    }
}

/// Writes `page` back to `store` if it is dirty and valid.
///
/// Returns true if a write happened. The page stays dirty on failure.
fn write_back<S: PageStore + ?Sized>(store: &mut S, page: &mut PageHeader) -> CacheResult<bool> {
    if !page.needs_write_back() {
        return Ok(false);
    }
    let mut guard = BusyGuard::new(page);
    store.write(guard.offset(), guard.buffer())?;
    guard.clear_dirty();
    debug!(offset = guard.offset(), "wrote back dirty page");
    Ok(true)
}

impl<S: PageStore> std::fmt::Debug for PageBuffer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageBuffer")
            .field("page_size", &self.page_size)
            .field("capacity", &self.config.max_num_pages)
            .field("resident", &self.resident)
            .field("allocated", &self.pages.len())
            .field("index", &self.index)
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::PageFlags;
    use pagebuf_store::{FlakyStore, MemoryStore, StoreError};

    const PAGE: usize = 512;

    fn create_cache(max_num_pages: usize) -> PageBuffer<MemoryStore> {
        let ps = PageSize::new(PAGE).unwrap();
        PageBuffer::open(
            MemoryStore::with_alignment(ps),
            CacheConfig::new(PAGE, max_num_pages),
        )
        .unwrap()
    }

    fn pattern(len: usize, seed: u8) -> Vec<u8> {
        (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
    }

    #[test]
    fn test_unaligned_round_trip() {
        let mut cache = create_cache(4);
        let data = pattern(1500, 3);
        cache.write(700, &data).unwrap();

        let mut buf = vec![0u8; data.len()];
        cache.read(700, &mut buf).unwrap();
        assert_eq!(buf, data);

        // Pages 1 through 4 were touched; the two whole pages went through
        // the cache because the run is shorter than the capacity.
        assert_eq!(cache.resident_pages(), 4);
        assert_eq!(cache.stats().direct_page_writes, 0);

        // A read straddling the written range sees zeros around it.
        let mut wide = vec![0xFFu8; 2000];
        cache.read(500, &mut wide).unwrap();
        assert!(wide[..200].iter().all(|&b| b == 0));
        assert_eq!(&wide[200..1700], &data[..]);
        assert!(wide[1700..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_worked_example() {
        let ps = PageSize::new(4096).unwrap();
        let mut cache =
            PageBuffer::open(MemoryStore::with_alignment(ps), CacheConfig::new(4096, 2)).unwrap();
        let a = vec![0xAAu8; 4096];
        let b = vec![0xBBu8; 4096];
        let c = vec![0xCCu8; 4096];

        cache.write(0, &a).unwrap();
        assert!(cache.is_dirty(0));
        cache.write(4096, &b).unwrap();
        assert_eq!(cache.eviction_order(), vec![4096, 0]);

        cache.write(8192, &c).unwrap();
        assert!(!cache.contains(0));
        assert_eq!(cache.eviction_order(), vec![8192, 4096]);
        assert_eq!(cache.store().peek(0, 4096), a);
        assert_eq!(cache.stats().evictions, 1);
        assert_eq!(cache.stats().dirty_writebacks, 1);

        let mut buf = vec![0u8; 4096];
        cache.read(0, &mut buf).unwrap();
        assert_eq!(buf, a);
        assert_eq!(cache.eviction_order(), vec![0, 8192]);
        assert_eq!(cache.store().peek(4096, 4096), b);
        assert_eq!(cache.resident_pages(), 2);
    }

    #[test]
    fn test_lru_eviction_order() {
        let mut cache = create_cache(3);
        let mut byte = [0u8; 1];
        for page in 0..3u64 {
            cache.read(page * PAGE as u64, &mut byte).unwrap();
        }
        // Touch page 0 so page 1 becomes least recently used.
        cache.read(0, &mut byte).unwrap();
        cache.read(3 * PAGE as u64, &mut byte).unwrap();

        assert!(cache.contains(0));
        assert!(!cache.contains(PAGE as u64));
        assert!(cache.contains(2 * PAGE as u64));
        assert!(cache.contains(3 * PAGE as u64));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 4);
    }

    #[test]
    fn test_partial_write_merges_with_store() {
        let mut cache = create_cache(4);
        cache.store_mut().write(0, &[7u8; PAGE]).unwrap();
        cache.store_mut().reset_stats();

        cache.write(10, b"ab").unwrap();
        assert_eq!(cache.store().stats().reads, 1);

        let mut buf = vec![0u8; PAGE];
        cache.read(0, &mut buf).unwrap();
        assert_eq!(&buf[10..12], b"ab");
        assert!(buf[..10].iter().chain(&buf[12..]).all(|&b| b == 7));
    }

    #[test]
    fn test_full_page_write_skips_load() {
        let mut cache = create_cache(4);
        cache.write(PAGE as u64, &[1u8; PAGE]).unwrap();

        assert_eq!(cache.store().stats().reads, 0);
        assert!(cache.is_dirty(PAGE as u64));
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_long_runs_bypass_cache() {
        let mut cache = create_cache(2);
        let data = pattern(4 * PAGE, 9);

        cache.write(0, &data).unwrap();
        assert_eq!(cache.resident_pages(), 0);
        assert_eq!(cache.stats().direct_page_writes, 4);
        assert_eq!(cache.store().stats().writes, 1);
        assert_eq!(cache.store().peek(0, data.len()), data);

        let mut buf = vec![0u8; data.len()];
        cache.read(0, &mut buf).unwrap();
        assert_eq!(buf, data);
        assert_eq!(cache.resident_pages(), 0);
        assert_eq!(cache.stats().direct_page_reads, 4);
        assert_eq!(cache.store().stats().reads, 1);
    }

    #[test]
    fn test_bypass_read_serves_cached_pages() {
        let mut cache = create_cache(2);
        cache.write(PAGE as u64 + 5, b"xyz").unwrap();

        let mut buf = vec![0u8; 4 * PAGE];
        cache.read(0, &mut buf).unwrap();
        assert_eq!(&buf[PAGE + 5..PAGE + 8], b"xyz");
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().direct_page_reads, 3);
        // One load for the partial write, then pages 0 and 2..4 directly.
        assert_eq!(cache.store().stats().reads, 3);
        // The cached page is still dirty and has not reached the store.
        assert!(cache.is_dirty(PAGE as u64));
    }

    #[test]
    fn test_direct_write_invalidates_cached_page() {
        let mut cache = create_cache(2);
        cache.write(PAGE as u64, b"old").unwrap();
        assert!(cache.is_dirty(PAGE as u64));

        cache.write(0, &vec![9u8; 4 * PAGE]).unwrap();
        assert!(!cache.contains(PAGE as u64));
        assert_eq!(cache.resident_pages(), 1);
        assert_eq!(cache.eviction_order(), vec![PAGE as u64]);
        assert_eq!(cache.dirty_pages(), 0);
        assert_eq!(cache.stats().invalidations, 1);

        cache.flush().unwrap();
        assert_eq!(cache.store().peek(PAGE as u64, 3), vec![9u8; 3]);

        let mut buf = [0u8; 3];
        cache.read(PAGE as u64, &mut buf).unwrap();
        assert_eq!(buf, [9u8; 3]);
    }

    #[test]
    fn test_invalid_page_reclaimed_first() {
        let mut cache = create_cache(2);
        let mut byte = [0u8; 1];
        cache.read(0, &mut byte).unwrap();
        cache.read(PAGE as u64, &mut byte).unwrap();
        assert!(cache.invalidate(PAGE as u64).unwrap());

        // Page 0 is older but the invalid page sits at the eviction end.
        cache.read(2 * PAGE as u64, &mut byte).unwrap();
        assert!(cache.contains(0));
        assert_eq!(cache.eviction_order(), vec![2 * PAGE as u64, 0]);
    }

    #[test]
    fn test_all_busy_fails_loudly() {
        let mut cache = create_cache(2);
        let mut byte = [0u8; 1];
        cache.read(0, &mut byte).unwrap();
        cache.read(PAGE as u64, &mut byte).unwrap();
        for page in &mut cache.pages {
            page.flags_mut().insert(PageFlags::BUSY);
        }

        let err = cache.read(2 * PAGE as u64, &mut byte).unwrap_err();
        assert!(matches!(
            err,
            CacheError::Integrity(IntegrityError::NoEvictablePage { resident: 2 })
        ));
        assert_eq!(cache.resident_pages(), 2);

        for page in &mut cache.pages {
            page.flags_mut().remove(PageFlags::BUSY);
        }
        cache.read(2 * PAGE as u64, &mut byte).unwrap();
        assert!(cache.contains(2 * PAGE as u64));
    }

    #[test]
    fn test_busy_page_skipped_for_eviction() {
        let mut cache = create_cache(2);
        let mut byte = [0u8; 1];
        cache.read(0, &mut byte).unwrap();
        cache.read(PAGE as u64, &mut byte).unwrap();

        let lru = cache.lru.tail().unwrap();
        cache.pages[lru.index()].flags_mut().insert(PageFlags::BUSY);
        cache.read(2 * PAGE as u64, &mut byte).unwrap();
        cache.pages[lru.index()].flags_mut().remove(PageFlags::BUSY);

        assert!(cache.contains(0));
        assert!(!cache.contains(PAGE as u64));
        assert_eq!(cache.stats().busy_skips, 1);
    }

    #[test]
    fn test_failed_load_leaves_no_entry() {
        let config = CacheConfig::new(PAGE, 2);
        let mut cache = PageBuffer::open(FlakyStore::default(), config).unwrap();
        cache.store_mut().fail_reads = true;

        let err = cache.read(0, &mut [0u8; 10]).unwrap_err();
        assert!(matches!(err, CacheError::Store(StoreError::Io { .. })));
        assert!(!cache.contains(0));
        assert_eq!(cache.resident_pages(), 0);
        assert_eq!(cache.free.len(), 1);

        cache.store_mut().fail_reads = false;
        cache.read(0, &mut [0u8; 10]).unwrap();
        assert!(cache.contains(0));
        // The header of the failed load was reused.
        assert_eq!(cache.stats().allocations, 1);
    }

    #[test]
    fn test_failed_write_back_keeps_victim() {
        let config = CacheConfig::new(PAGE, 1);
        let mut cache = PageBuffer::open(FlakyStore::default(), config).unwrap();
        cache.write(0, b"keep").unwrap();
        cache.store_mut().fail_writes = true;

        assert!(cache.read(PAGE as u64, &mut [0u8; 1]).is_err());
        assert!(cache.contains(0));
        assert!(cache.is_dirty(0));
        assert_eq!(cache.resident_pages(), 1);

        cache.store_mut().fail_writes = false;
        cache.read(PAGE as u64, &mut [0u8; 1]).unwrap();
        assert!(!cache.contains(0));
        assert_eq!(cache.store().inner.peek(0, 4), b"keep");
    }

    #[test]
    fn test_failed_direct_write_drops_cached_copy() {
        let config = CacheConfig::new(PAGE, 4).with_bypass_pages(1);
        let mut cache = PageBuffer::open(FlakyStore::default(), config).unwrap();
        cache.write(PAGE as u64 + 3, b"old").unwrap();
        assert!(cache.is_dirty(PAGE as u64));

        cache.store_mut().fail_writes = true;
        let err = cache.write(0, &[5u8; 2 * PAGE]).unwrap_err();
        assert!(matches!(err, CacheError::Store(StoreError::Io { .. })));

        // The cached copy was invalidated before the store write failed.
        assert!(!cache.contains(PAGE as u64));
        assert_eq!(cache.dirty_pages(), 0);
        assert_eq!(cache.stats().invalidations, 1);
        assert_eq!(cache.stats().direct_page_writes, 0);
        assert_eq!(cache.stats().bytes_written, 3);

        // The range holds whatever the store had, which is nothing.
        cache.store_mut().fail_writes = false;
        let mut buf = [0xFFu8; 3];
        cache.read(PAGE as u64 + 3, &mut buf).unwrap();
        assert_eq!(buf, [0u8; 3]);
    }

    #[test]
    fn test_failed_direct_read_keeps_cache_state() {
        let config = CacheConfig::new(PAGE, 4).with_bypass_pages(1);
        let mut cache = PageBuffer::open(FlakyStore::default(), config).unwrap();
        cache.write(0, b"a").unwrap();
        cache.write(2 * PAGE as u64, b"b").unwrap();
        cache.write(PAGE as u64 * 5, b"c").unwrap();
        let order = cache.eviction_order();
        let hits = cache.stats().hits;

        // Pages 0 and 2 are cached, pages 1 and 3 must come from the store.
        cache.store_mut().fail_reads = true;
        let mut buf = vec![0u8; 4 * PAGE];
        let err = cache.read(0, &mut buf).unwrap_err();
        assert!(matches!(err, CacheError::Store(StoreError::Io { .. })));

        assert_eq!(cache.resident_pages(), 3);
        assert_eq!(cache.eviction_order(), order);
        assert_eq!(cache.dirty_pages(), 3);
        assert_eq!(cache.stats().hits, hits);
        assert_eq!(cache.stats().direct_page_reads, 0);

        cache.store_mut().fail_reads = false;
        cache.read(0, &mut buf).unwrap();
        assert_eq!(buf[0], b'a');
        assert_eq!(buf[2 * PAGE], b'b');
        assert_eq!(cache.stats().direct_page_reads, 2);
        assert_eq!(
            cache.eviction_order(),
            vec![2 * PAGE as u64, 0, 5 * PAGE as u64]
        );
    }

    #[test]
    fn test_single_page_operations() {
        let mut cache = create_cache(4);
        cache.write(0, b"one").unwrap();
        cache.write(PAGE as u64, b"two").unwrap();
        cache.write(2 * PAGE as u64, b"three").unwrap();

        assert!(cache.flush_page(1).unwrap());
        assert!(!cache.is_dirty(0));
        assert!(!cache.flush_page(1).unwrap());
        assert_eq!(cache.store().peek(0, 3), b"one");

        assert!(cache.evict_page(PAGE as u64 + 100).unwrap());
        assert!(!cache.contains(PAGE as u64));
        assert_eq!(cache.store().peek(PAGE as u64, 3), b"two");
        assert!(!cache.evict_page(PAGE as u64).unwrap());

        assert!(cache.invalidate(2 * PAGE as u64).unwrap());
        assert!(!cache.contains(2 * PAGE as u64));
        assert_eq!(cache.store().peek(2 * PAGE as u64, 5), vec![0u8; 5]);
        assert!(!cache.invalidate(2 * PAGE as u64).unwrap());

        assert_eq!(cache.resident_pages(), 2);
        assert!(!cache.flush_page(9 * PAGE as u64).unwrap());
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let mut cache = create_cache(3);
        let mut buf = vec![0u8; 700];
        for i in 0..200u64 {
            let addr = (i * 7919) % (40 * PAGE as u64);
            if i % 3 == 0 {
                cache.write(addr, &buf).unwrap();
            } else {
                cache.read(addr, &mut buf).unwrap();
            }
            assert!(cache.resident_pages() <= 3);
            assert!(cache.pages.len() <= 3);
            assert_eq!(cache.pages.len(), cache.resident_pages() + cache.free.len());
            assert_eq!(cache.lru.len(), cache.resident_pages());
        }
    }

    #[test]
    fn test_zero_length_request() {
        let mut cache = create_cache(2);
        cache.read(100, &mut []).unwrap();
        cache.write(100, &[]).unwrap();
        assert_eq!(cache.resident_pages(), 0);
        assert_eq!(cache.stats().reads, 1);
        assert_eq!(cache.stats().writes, 1);
        assert_eq!(cache.store().stats().reads, 0);
    }

    #[test]
    fn test_address_overflow() {
        let mut cache = create_cache(2);
        let err = cache.write(u64::MAX - 1, b"abc").unwrap_err();
        assert!(matches!(err, CacheError::AddressOverflow { len: 3, .. }));

        // The bytes fit but their page would end past the address space.
        let err = cache.write(u64::MAX - 10, b"abc").unwrap_err();
        assert!(matches!(err, CacheError::AddressOverflow { len: 3, .. }));
        assert_eq!(cache.resident_pages(), 0);
        assert_eq!(cache.store().stats().writes, 0);
    }

    #[test]
    fn test_average_chain_depth_counts_every_search() {
        let ps = PageSize::new(PAGE).unwrap();
        let config = CacheConfig::new(PAGE, 4)
            .with_hash_buckets(1)
            .with_bypass_pages(1);
        let mut cache = PageBuffer::open(MemoryStore::with_alignment(ps), config).unwrap();

        // Misses on an empty chain, then a chain of one.
        cache.write(0, b"a").unwrap();
        cache.write(PAGE as u64, b"b").unwrap();
        assert_eq!(cache.stats().hash_searches, 2);
        assert_eq!(cache.stats().hash_probes, 1);

        // flush_page finds page 0 behind page 1, at depth 2.
        cache.flush_page(0).unwrap();
        assert_eq!(cache.stats().hash_searches, 3);
        assert_eq!(cache.stats().hash_probes, 3);
        assert_eq!(cache.stats().lookups(), 2);

        // A direct read of two uncached pages searches twice, full chain each.
        cache.read(4 * PAGE as u64, &mut vec![0u8; 2 * PAGE]).unwrap();
        assert_eq!(cache.stats().hash_searches, 5);
        assert_eq!(cache.stats().hash_probes, 7);
        assert!((cache.stats().average_probe_depth() - 1.4).abs() < 1e-9);
    }

    #[test]
    fn test_stats_accumulate() {
        let mut cache = create_cache(2);
        cache.write(0, b"hello").unwrap();
        cache.read(0, &mut [0u8; 5]).unwrap();
        cache.read(1, &mut [0u8; 2]).unwrap();

        let stats = cache.stats();
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.reads, 2);
        assert_eq!(stats.bytes_written, 5);
        assert_eq!(stats.bytes_read, 7);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.allocations, 1);
        assert_eq!(stats.max_bucket_depth, 1);

        cache.reset_stats();
        assert_eq!(cache.stats().hits, 0);
    }
}
