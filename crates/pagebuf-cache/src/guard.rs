//! Busy guard for page buffer copies.
//!
//! Every copy into or out of a page buffer, and every load from or
//! write-back to the backing store, runs while a [`BusyGuard`] is held.
//! The guard sets `BUSY` on construction and clears it when dropped, so
//! an early return can never leave a page stuck busy.

use super::page::{PageFlags, PageHeader};

/// Exclusive, busy-marked access to one page buffer.
pub struct BusyGuard<'a> {
    page: &'a mut PageHeader,
}

impl<'a> BusyGuard<'a> {
    /// Marks `page` busy.
    ///
    /// Panics in debug builds if the page is already busy: that means the
    /// cache re-entered itself on the same page.
    pub fn new(page: &'a mut PageHeader) -> Self {
        debug_assert!(!page.is_busy(), "page {} is already busy", page.offset());
        page.flags_mut().insert(PageFlags::BUSY);
        Self { page }
    }

    /// Returns the page's backing address.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.page.offset()
    }

    /// Returns the whole page for loading or write-back.
    #[inline]
    pub fn buffer(&self) -> &[u8] {
        self.page.data()
    }

    /// Returns the whole page for loading from the backing store.
    #[inline]
    pub fn buffer_mut(&mut self) -> &mut [u8] {
        self.page.data_mut()
    }

    /// Copies `dst.len()` bytes starting at `in_page` out of the page.
    pub fn copy_out(&mut self, in_page: usize, dst: &mut [u8]) {
        self.page.flags_mut().insert(PageFlags::READ);
        dst.copy_from_slice(&self.page.data()[in_page..in_page + dst.len()]);
    }

    /// Copies `src` into the page at `in_page` and marks it dirty.
    pub fn copy_in(&mut self, in_page: usize, src: &[u8]) {
        self.page.flags_mut().insert(PageFlags::WRITE);
        self.page.data_mut()[in_page..in_page + src.len()].copy_from_slice(src);
        self.page.mark_dirty();
    }

    /// Clears the dirty flag after a successful write-back.
    #[inline]
    pub fn clear_dirty(&mut self) {
        self.page.clear_dirty();
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.page
            .flags_mut()
            .remove(PageFlags::BUSY | PageFlags::READ | PageFlags::WRITE);
    }
}

impl std::fmt::Debug for BusyGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusyGuard")
            .field("offset", &self.page.offset())
            .field("flags", &self.page.flags())
            .finish()
    }
}
