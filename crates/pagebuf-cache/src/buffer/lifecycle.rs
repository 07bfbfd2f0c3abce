//! Open, flush and close.

use pagebuf_common::config::CacheConfig;
use pagebuf_store::PageStore;
use tracing::{debug, error, info};

use super::{write_back, EoaTranslator, PageBuffer};
use crate::error::{CacheResult, IntegrityError};
use crate::hash::HashIndex;
use crate::replacement::ReplacementList;
use crate::stats::{CacheStats, IoStats};

impl<S: PageStore> PageBuffer<S> {
    /// Opens a page buffer over `store`.
    ///
    /// Fails with a configuration error if the page size is not a power of
    /// two, the capacity is zero or the bucket count is invalid. No page
    /// buffer is allocated until the first miss.
    pub fn open(store: S, config: CacheConfig) -> CacheResult<Self> {
        config.validate()?;
        let page_size = config.page_size()?;
        let index = HashIndex::new(config.bucket_count(), page_size);
        let eoa = EoaTranslator::new(page_size, store.eoa());

        info!(
            page_size = page_size.bytes(),
            max_num_pages = config.max_num_pages,
            policy = %config.replacement_policy,
            buckets = index.bucket_count(),
            "opened page buffer"
        );

        Ok(Self {
            config,
            page_size,
            store,
            pages: Vec::new(),
            free: Vec::new(),
            index,
            lru: ReplacementList::new(),
            resident: 0,
            eoa,
            stats: CacheStats::new(),
            closed: false,
        })
    }

    /// Writes back every dirty page, then flushes the backing store.
    ///
    /// On failure the pages not yet written stay dirty and the call can be
    /// retried.
    pub fn flush(&mut self) -> CacheResult<()> {
        self.check_open()?;
        let mut io = IoStats::default();
        let result = self.flush_all(&mut io);
        self.stats.flushes += 1;
        self.stats.merge(&io);
        result
    }

    /// Flushes, releases every page and closes the backing store.
    ///
    /// A failed flush leaves the cache open. Once released, every further
    /// call fails with [`CacheError::Closed`](crate::CacheError::Closed),
    /// even if closing the backing store itself failed.
    pub fn close(&mut self) -> CacheResult<()> {
        self.check_open()?;
        self.flush()?;
        self.check_clean()?;

        let resident = self.resident;
        self.index.clear();
        self.lru.clear();
        self.pages = Vec::new();
        self.free = Vec::new();
        self.resident = 0;
        self.closed = true;

        self.store.close()?;
        info!(resident, stats = %self.stats, "closed page buffer");
        Ok(())
    }

    /// Consumes the cache and returns the backing store.
    ///
    /// Dirty pages are dropped, not written; call [`flush`](Self::flush)
    /// first.
    pub fn into_store(self) -> S {
        self.store
    }

    fn flush_all(&mut self, io: &mut IoStats) -> CacheResult<()> {
        for handle in self.lru.iter() {
            if write_back(&mut self.store, &mut self.pages[handle.index()])? {
                io.flushed_pages += 1;
            }
        }
        self.store.flush()?;
        debug!(pages = io.flushed_pages, "flushed page buffer");
        Ok(())
    }

    /// Fails if any resident page still needs a write-back.
    fn check_clean(&self) -> CacheResult<()> {
        let dirty = self
            .lru
            .iter()
            .map(|h| &self.pages[h.index()])
            .find(|page| page.needs_write_back());
        if let Some(page) = dirty {
            let offset = page.offset();
            error!(offset, "dirty page at close");
            return Err(IntegrityError::DirtyPageAtClose { offset }.into());
        }
        Ok(())
    }
}
