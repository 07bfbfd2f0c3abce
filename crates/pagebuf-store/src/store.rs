//! The backing store trait.

use pagebuf_common::types::PageSize;

use super::error::{StoreError, StoreResult};

/// A backing store addressed at page granularity.
///
/// Callers guarantee that `offset` is page aligned and that the buffer
/// length is a multiple of the page size. Stores may enforce that with
/// [`check_range`]. All calls are synchronous and run to completion.
pub trait PageStore {
    /// Reads `buf.len()` bytes starting at `offset`.
    ///
    /// Bytes that were never written are whatever the store defines them to
    /// be; both stores in this crate return zeros.
    fn read(&mut self, offset: u64, buf: &mut [u8]) -> StoreResult<()>;

    /// Writes all of `buf` starting at `offset`.
    fn write(&mut self, offset: u64, buf: &[u8]) -> StoreResult<()>;

    /// Makes previously written data durable.
    fn flush(&mut self) -> StoreResult<()>;

    /// Returns the end-of-address: the first address past the allocated
    /// space.
    fn eoa(&self) -> u64;

    /// Sets the end-of-address.
    fn set_eoa(&mut self, addr: u64) -> StoreResult<()>;

    /// Returns the end-of-file: the physical size of the store.
    fn eof(&self) -> StoreResult<u64>;

    /// Releases the store. Further calls fail with [`StoreError::Closed`].
    fn close(&mut self) -> StoreResult<()>;
}

impl<S: PageStore + ?Sized> PageStore for Box<S> {
    fn read(&mut self, offset: u64, buf: &mut [u8]) -> StoreResult<()> {
        (**self).read(offset, buf)
    }

    fn write(&mut self, offset: u64, buf: &[u8]) -> StoreResult<()> {
        (**self).write(offset, buf)
    }

    fn flush(&mut self) -> StoreResult<()> {
        (**self).flush()
    }

    fn eoa(&self) -> u64 {
        (**self).eoa()
    }

    fn set_eoa(&mut self, addr: u64) -> StoreResult<()> {
        (**self).set_eoa(addr)
    }

    fn eof(&self) -> StoreResult<u64> {
        (**self).eof()
    }

    fn close(&mut self) -> StoreResult<()> {
        (**self).close()
    }
}

impl<S: PageStore + ?Sized> PageStore for &mut S {
    fn read(&mut self, offset: u64, buf: &mut [u8]) -> StoreResult<()> {
        (**self).read(offset, buf)
    }

    fn write(&mut self, offset: u64, buf: &[u8]) -> StoreResult<()> {
        (**self).write(offset, buf)
    }

    fn flush(&mut self) -> StoreResult<()> {
        (**self).flush()
    }

    fn eoa(&self) -> u64 {
        (**self).eoa()
    }

    fn set_eoa(&mut self, addr: u64) -> StoreResult<()> {
        (**self).set_eoa(addr)
    }

    fn eof(&self) -> StoreResult<u64> {
        (**self).eof()
    }

    fn close(&mut self) -> StoreResult<()> {
        (**self).close()
    }
}

/// Checks a request against an optional page alignment and the address
/// space, returning the exclusive end address.
pub fn check_range(offset: u64, len: usize, alignment: Option<PageSize>) -> StoreResult<u64> {
    let end = offset
        .checked_add(len as u64)
        .ok_or(StoreError::AddressOverflow { offset, len })?;

    if let Some(ps) = alignment {
        if !ps.is_aligned(offset) || len % ps.bytes() != 0 {
            return Err(StoreError::misaligned(offset, len, ps.bytes()));
        }
    }

    Ok(end)
}
