//! A page buffer is itself a page store, so caches can be stacked.

use pagebuf_store::{PageStore, StoreError, StoreResult};

use super::PageBuffer;
use crate::error::CacheError;

fn into_store_error(err: CacheError) -> StoreError {
    match err {
        CacheError::Store(e) => e,
        CacheError::Closed => StoreError::Closed,
        other => StoreError::layer(other),
    }
}

impl<S: PageStore> PageStore for PageBuffer<S> {
    fn read(&mut self, offset: u64, buf: &mut [u8]) -> StoreResult<()> {
        PageBuffer::read(self, offset, buf).map_err(into_store_error)
    }

    fn write(&mut self, offset: u64, buf: &[u8]) -> StoreResult<()> {
        PageBuffer::write(self, offset, buf).map_err(into_store_error)
    }

    fn flush(&mut self) -> StoreResult<()> {
        PageBuffer::flush(self).map_err(into_store_error)
    }

    /// Returns the client EOA without cross-checking the inner store.
    fn eoa(&self) -> u64 {
        self.eoa.eoa_up()
    }

    fn set_eoa(&mut self, addr: u64) -> StoreResult<()> {
        PageBuffer::set_eoa(self, addr).map_err(into_store_error)
    }

    fn eof(&self) -> StoreResult<u64> {
        self.get_eof().map_err(into_store_error)
    }

    fn close(&mut self) -> StoreResult<()> {
        PageBuffer::close(self).map_err(into_store_error)
    }
}
