//! Failure-injecting store for tests.

use std::io;

use super::error::{StoreError, StoreResult};
use super::memory::MemoryStore;
use super::store::PageStore;

/// A [`MemoryStore`] whose reads, writes and flushes can be switched to
/// fail with an I/O error.
#[derive(Debug, Default)]
pub struct FlakyStore {
    /// Store that serves requests while no failure is switched on.
    pub inner: MemoryStore,
    /// Fail every read.
    pub fail_reads: bool,
    /// Fail every write.
    pub fail_writes: bool,
    /// Fail every flush.
    pub fail_flush: bool,
}

impl FlakyStore {
    /// Wraps an existing memory store.
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }
}

fn injected(operation: &str) -> StoreError {
    io::Error::new(io::ErrorKind::Other, format!("injected {operation} failure")).into()
}

impl PageStore for FlakyStore {
    fn read(&mut self, offset: u64, buf: &mut [u8]) -> StoreResult<()> {
        if self.fail_reads {
            return Err(injected("read"));
        }
        self.inner.read(offset, buf)
    }

    fn write(&mut self, offset: u64, buf: &[u8]) -> StoreResult<()> {
        if self.fail_writes {
            return Err(injected("write"));
        }
        self.inner.write(offset, buf)
    }

    fn flush(&mut self) -> StoreResult<()> {
        if self.fail_flush {
            return Err(injected("flush"));
        }
        self.inner.flush()
    }

    fn eoa(&self) -> u64 {
        self.inner.eoa()
    }

    fn set_eoa(&mut self, addr: u64) -> StoreResult<()> {
        self.inner.set_eoa(addr)
    }

    fn eof(&self) -> StoreResult<u64> {
        self.inner.eof()
    }

    fn close(&mut self) -> StoreResult<()> {
        self.inner.close()
    }
}
