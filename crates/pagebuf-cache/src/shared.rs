//! A thread-safe page buffer handle.

use std::sync::Arc;

use pagebuf_common::config::CacheConfig;
use pagebuf_store::PageStore;
use parking_lot::Mutex;

use crate::buffer::PageBuffer;
use crate::error::CacheResult;
use crate::stats::CacheStats;

/// A page buffer behind a mutex, shareable across threads.
///
/// Every call locks the whole cache for its duration, so concurrent
/// callers are serialized. Clones share the same cache.
pub struct SharedPageBuffer<S: PageStore> {
    inner: Arc<Mutex<PageBuffer<S>>>,
}

impl<S: PageStore> Clone for SharedPageBuffer<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: PageStore> SharedPageBuffer<S> {
    /// Opens a shared page buffer over `store`.
    pub fn open(store: S, config: CacheConfig) -> CacheResult<Self> {
        Ok(Self::new(PageBuffer::open(store, config)?))
    }

    /// Wraps an open page buffer.
    pub fn new(cache: PageBuffer<S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cache)),
        }
    }

    /// Reads `buf.len()` bytes starting at `addr`.
    pub fn read(&self, addr: u64, buf: &mut [u8]) -> CacheResult<()> {
        self.inner.lock().read(addr, buf)
    }

    /// Writes all of `buf` starting at `addr`.
    pub fn write(&self, addr: u64, buf: &[u8]) -> CacheResult<()> {
        self.inner.lock().write(addr, buf)
    }

    /// Writes back every dirty page and flushes the backing store.
    pub fn flush(&self) -> CacheResult<()> {
        self.inner.lock().flush()
    }

    /// Closes the cache for every handle.
    pub fn close(&self) -> CacheResult<()> {
        self.inner.lock().close()
    }

    /// Sets the end-of-address.
    pub fn set_eoa(&self, addr: u64) -> CacheResult<()> {
        self.inner.lock().set_eoa(addr)
    }

    /// Returns the end-of-address.
    pub fn get_eoa(&self) -> CacheResult<u64> {
        self.inner.lock().get_eoa()
    }

    /// Returns the backing store's end-of-file.
    pub fn get_eof(&self) -> CacheResult<u64> {
        self.inner.lock().get_eof()
    }

    /// Gets cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats().clone()
    }

    /// Runs `f` with exclusive access to the underlying cache.
    pub fn with<R>(&self, f: impl FnOnce(&mut PageBuffer<S>) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl<S: PageStore> std::fmt::Debug for SharedPageBuffer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedPageBuffer")
            .field("handles", &Arc::strong_count(&self.inner))
            .finish()
    }
}
