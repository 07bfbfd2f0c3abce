//! End-of-address translation.
//!
//! Clients see the exact EOA they set (`eoa_up`). The backing store only
//! ever sees it rounded up to a page boundary (`eoa_down`), so the last
//! page the cache loads or writes back is always inside the allocated
//! space. End-of-file is not translated.

use pagebuf_common::types::PageSize;
use pagebuf_store::PageStore;
use tracing::{debug, warn};

use super::PageBuffer;
use crate::error::{CacheError, CacheResult, IntegrityError};

/// Client-side and store-side end-of-address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EoaTranslator {
    page_size: PageSize,
    eoa_up: u64,
    eoa_down: u64,
}

impl EoaTranslator {
    /// Starts from the EOA the store reports, which both sides share until
    /// the first [`set_eoa`](PageBuffer::set_eoa).
    pub fn new(page_size: PageSize, store_eoa: u64) -> Self {
        Self {
            page_size,
            eoa_up: store_eoa,
            eoa_down: store_eoa,
        }
    }

    /// Returns the EOA as last set by the client.
    #[inline]
    pub fn eoa_up(&self) -> u64 {
        self.eoa_up
    }

    /// Returns the EOA the store is expected to report.
    #[inline]
    pub fn eoa_down(&self) -> u64 {
        self.eoa_down
    }

    /// Rounds a client EOA up to the next page boundary.
    pub fn translate(&self, addr: u64) -> CacheResult<u64> {
        self.page_size
            .align_up(addr)
            .ok_or(CacheError::AddressOverflow { addr, len: 0 })
    }

    /// Records a client EOA and its page-aligned store counterpart.
    pub fn record(&mut self, eoa_up: u64, eoa_down: u64) {
        self.eoa_up = eoa_up;
        self.eoa_down = eoa_down;
    }

    /// Checks the store's EOA against the recorded one and returns the
    /// client EOA.
    pub fn check(&self, actual: u64) -> Result<u64, IntegrityError> {
        if actual != self.eoa_down {
            return Err(IntegrityError::EoaMismatch {
                expected: self.eoa_down,
                actual,
            });
        }
        Ok(self.eoa_up)
    }
}

impl<S: PageStore> PageBuffer<S> {
    /// Sets the end-of-address.
    ///
    /// The backing store receives `addr` rounded up to a page boundary.
    pub fn set_eoa(&mut self, addr: u64) -> CacheResult<()> {
        self.check_open()?;
        let eoa_down = self.eoa.translate(addr)?;
        self.store.set_eoa(eoa_down)?;
        self.eoa.record(addr, eoa_down);
        debug!(eoa = addr, store_eoa = eoa_down, "set end of address");
        Ok(())
    }

    /// Returns the end-of-address last set through the cache.
    ///
    /// Fails with an integrity error if the backing store's EOA was changed
    /// behind the cache's back.
    pub fn get_eoa(&self) -> CacheResult<u64> {
        self.check_open()?;
        let actual = self.store.eoa();
        self.eoa.check(actual).map_err(|e| {
            warn!(expected = self.eoa.eoa_down(), actual, "backing store EOA mismatch");
            e.into()
        })
    }

    /// Returns the backing store's end-of-file, untranslated.
    pub fn get_eof(&self) -> CacheResult<u64> {
        self.check_open()?;
        Ok(self.store.eof()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagebuf_common::config::CacheConfig;
    use pagebuf_store::MemoryStore;

    fn open() -> PageBuffer<MemoryStore> {
        PageBuffer::open(MemoryStore::new(), CacheConfig::new(4096, 2)).unwrap()
    }

    #[test]
    fn test_translate_rounds_up() {
        let eoa = EoaTranslator::new(PageSize::new(4096).unwrap(), 0);
        assert_eq!(eoa.translate(0).unwrap(), 0);
        assert_eq!(eoa.translate(1).unwrap(), 4096);
        assert_eq!(eoa.translate(4096).unwrap(), 4096);
        assert_eq!(eoa.translate(4097).unwrap(), 8192);
        assert!(matches!(
            eoa.translate(u64::MAX),
            Err(CacheError::AddressOverflow { addr: u64::MAX, .. })
        ));
    }

    #[test]
    fn test_check() {
        let mut eoa = EoaTranslator::new(PageSize::new(4096).unwrap(), 0);
        eoa.record(5000, 8192);
        assert_eq!(eoa.check(8192), Ok(5000));
        assert_eq!(
            eoa.check(4096),
            Err(IntegrityError::EoaMismatch {
                expected: 8192,
                actual: 4096
            })
        );
    }

    #[test]
    fn test_set_and_get_eoa() {
        let mut cache = open();
        cache.set_eoa(5000).unwrap();
        assert_eq!(cache.store().eoa(), 8192);
        assert_eq!(cache.get_eoa().unwrap(), 5000);

        cache.set_eoa(8192).unwrap();
        assert_eq!(cache.store().eoa(), 8192);
        assert_eq!(cache.get_eoa().unwrap(), 8192);
    }

    #[test]
    fn test_eoa_changed_behind_cache() {
        let mut cache = open();
        cache.set_eoa(100).unwrap();
        cache.store_mut().set_eoa(12_288).unwrap();

        let err = cache.get_eoa().unwrap_err();
        assert!(err.is_integrity());
        assert!(matches!(
            err,
            CacheError::Integrity(IntegrityError::EoaMismatch {
                expected: 4096,
                actual: 12_288
            })
        ));
    }

    #[test]
    fn test_initial_eoa_from_store() {
        let mut store = MemoryStore::new();
        store.set_eoa(3000).unwrap();
        let cache = PageBuffer::open(store, CacheConfig::new(4096, 2)).unwrap();
        assert_eq!(cache.get_eoa().unwrap(), 3000);
    }

    #[test]
    fn test_eof_forwarded() {
        let mut cache = open();
        assert_eq!(cache.get_eof().unwrap(), 0);
        cache.write(0, &[1u8; 10]).unwrap();
        // Still only in the cache.
        assert_eq!(cache.get_eof().unwrap(), 0);
        cache.flush().unwrap();
        assert_eq!(cache.get_eof().unwrap(), 4096);
    }
}
