//! Page headers - the unit of caching.

use std::fmt;

use bitflags::bitflags;

/// Handle to a page header - index into the page buffer's header arena.
///
/// Handles stay valid for the lifetime of the cache: headers are recycled
/// in place, never freed, until close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageHandle(usize);

impl PageHandle {
    /// Creates a new page handle.
    #[inline]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the raw arena index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for PageHandle {
    fn from(index: usize) -> Self {
        Self::new(index)
    }
}

impl fmt::Display for PageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

bitflags! {
    /// State flags of a cached page.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PageFlags: u8 {
        /// Buffer differs from the backing store.
        const DIRTY = 1 << 0;
        /// Buffer is being copied into, out of, or loaded.
        const BUSY = 1 << 1;
        /// Superseded by a direct write; must not be read or flushed.
        const INVALID = 1 << 2;
        /// A copy out of the buffer is in progress.
        const READ = 1 << 3;
        /// A copy into the buffer is in progress.
        const WRITE = 1 << 4;
    }
}

/// One cached page: its backing address, buffer and state flags.
///
/// Hash chain and replacement list membership are tracked by the index
/// and list themselves, keyed by [`PageHandle`].
pub struct PageHeader {
    /// Page-aligned backing store address.
    offset: u64,
    /// Exactly one page of bytes.
    data: Box<[u8]>,
    /// State flags.
    flags: PageFlags,
}

impl PageHeader {
    /// Creates an unassigned page header that owns `data`.
    pub fn new(data: Box<[u8]>) -> Self {
        Self {
            offset: 0,
            data,
            flags: PageFlags::empty(),
        }
    }

    /// Returns the page-aligned backing address.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Returns the page contents.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the page size in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the page buffer has no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the current flags.
    #[inline]
    pub fn flags(&self) -> PageFlags {
        self.flags
    }

    /// Returns true if the page has unflushed modifications.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.flags.contains(PageFlags::DIRTY)
    }

    /// Returns true if a copy or load is in progress.
    #[inline]
    pub fn is_busy(&self) -> bool {
        self.flags.contains(PageFlags::BUSY)
    }

    /// Returns true if the page was superseded by a direct write.
    #[inline]
    pub fn is_invalid(&self) -> bool {
        self.flags.contains(PageFlags::INVALID)
    }

    /// Returns true if the page must be written back before reuse.
    #[inline]
    pub fn needs_write_back(&self) -> bool {
        self.is_dirty() && !self.is_invalid()
    }

    /// Marks the page dirty.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.flags.insert(PageFlags::DIRTY);
    }

    /// Clears the dirty flag after a successful write-back.
    #[inline]
    pub fn clear_dirty(&mut self) {
        self.flags.remove(PageFlags::DIRTY);
    }

    /// Marks the page invalid and drops any pending modification.
    pub fn invalidate(&mut self) {
        self.flags.remove(PageFlags::DIRTY);
        self.flags.insert(PageFlags::INVALID);
    }

    /// Reassigns the header to a new backing address, clearing all state.
    pub fn reset(&mut self, offset: u64) {
        debug_assert!(!self.is_busy(), "resetting busy page {}", self.offset);
        self.offset = offset;
        self.flags = PageFlags::empty();
    }

    pub(crate) fn flags_mut(&mut self) -> &mut PageFlags {
        &mut self.flags
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl fmt::Debug for PageHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageHeader")
            .field("offset", &self.offset)
            .field("size", &self.data.len())
            .field("flags", &self.flags)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> PageHeader {
        PageHeader::new(vec![0u8; 512].into_boxed_slice())
    }

    #[test]
    fn test_new_header() {
        let page = header();
        assert_eq!(page.len(), 512);
        assert_eq!(page.flags(), PageFlags::empty());
        assert!(!page.is_dirty());
        assert!(!page.needs_write_back());
    }

    #[test]
    fn test_dirty_tracking() {
        let mut page = header();
        page.mark_dirty();
        assert!(page.is_dirty());
        assert!(page.needs_write_back());

        page.clear_dirty();
        assert!(!page.is_dirty());
    }

    #[test]
    fn test_invalidate_drops_dirty() {
        let mut page = header();
        page.mark_dirty();
        page.invalidate();

        assert!(page.is_invalid());
        assert!(!page.is_dirty());
        assert!(!page.needs_write_back());
    }

    #[test]
    fn test_reset() {
        let mut page = header();
        page.reset(4096);
        page.mark_dirty();
        page.invalidate();

        page.reset(8192);
        assert_eq!(page.offset(), 8192);
        assert_eq!(page.flags(), PageFlags::empty());
    }

    #[test]
    fn test_handle() {
        let handle = PageHandle::from(3);
        assert_eq!(handle.index(), 3);
        assert_eq!(handle.to_string(), "#3");
    }
}
