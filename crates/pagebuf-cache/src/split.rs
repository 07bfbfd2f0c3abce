//! Splitting of client requests at page boundaries.
//!
//! An arbitrary `(address, length)` range is cut into at most three pieces:
//!
//! ```text
//!   address                                              address + length
//!      │                                                        │
//!  ┌───┼──────┬────────────┬────────────┬────────────┬──────────┼───┐
//!  │   │ head │   middle   │   middle   │   middle   │   tail   │   │
//!  └───┴──────┴────────────┴────────────┴────────────┴──────────┴───┘
//!  page        page         page         page         page
//! ```
//!
//! The head and tail are partial pages and always go through the cache.
//! The middle is a run of whole pages that may bypass it.

use pagebuf_common::types::{PageNumber, PageSize};
use tracing::trace;

use super::error::{CacheError, CacheResult};

/// A transfer within a single page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialPage {
    /// Page-aligned address of the page.
    pub page: u64,
    /// Offset of the first byte within the page.
    pub in_page: usize,
    /// Number of bytes to transfer.
    pub len: usize,
    /// Offset of the first byte within the client buffer.
    pub buf_offset: usize,
}

impl PartialPage {
    /// Returns the client buffer range this piece covers.
    #[inline]
    pub fn buf_range(&self) -> std::ops::Range<usize> {
        self.buf_offset..self.buf_offset + self.len
    }
}

/// A run of whole pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRun {
    /// Page-aligned address of the first page.
    pub start: u64,
    /// Number of pages.
    pub pages: usize,
    /// Offset of the first byte within the client buffer.
    pub buf_offset: usize,
}

impl PageRun {
    /// Returns the address of the `i`th page of the run.
    #[inline]
    pub fn page(&self, page_size: PageSize, i: usize) -> u64 {
        let first = page_size.page_number(self.start);
        page_size.page_offset(PageNumber::new(first.as_u64() + i as u64))
    }

    /// Returns the offset of the `i`th page within the client buffer.
    #[inline]
    pub fn buf_offset_of(&self, page_size: PageSize, i: usize) -> usize {
        self.buf_offset + i * page_size.bytes()
    }

    /// Returns the number of bytes the run covers.
    #[inline]
    pub fn bytes(&self, page_size: PageSize) -> usize {
        self.pages << page_size.shift()
    }
}

/// A client request cut at page boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestSplit {
    /// Leading partial page, when `address` is unaligned.
    pub head: Option<PartialPage>,
    /// Whole pages between head and tail.
    pub middle: Option<PageRun>,
    /// Trailing partial page, when the request does not end on a boundary.
    pub tail: Option<PartialPage>,
}

impl RequestSplit {
    /// Cuts `(addr, len)` at the boundaries of `page_size` pages.
    ///
    /// Fails with [`CacheError::AddressOverflow`] if the range, rounded out to
    /// whole pages, does not fit in the 64-bit address space.
    pub fn new(page_size: PageSize, addr: u64, len: usize) -> CacheResult<Self> {
        let mut split = Self::default();
        if len == 0 {
            return Ok(split);
        }
        addr.checked_add(len as u64)
            .and_then(|end| page_size.align_up(end))
            .ok_or(CacheError::AddressOverflow { addr, len })?;

        let page_bytes = page_size.bytes();
        let mut cursor = addr;
        let mut buf_offset = 0;
        let mut remaining = len;

        if !page_size.is_aligned(addr) {
            let in_page = page_size.offset_in_page(addr);
            let n = remaining.min(page_bytes - in_page);
            split.head = Some(PartialPage {
                page: page_size.align_down(addr),
                in_page,
                len: n,
                buf_offset,
            });
            cursor += n as u64;
            buf_offset += n;
            remaining -= n;
        }

        let pages = remaining >> page_size.shift();
        if pages > 0 {
            split.middle = Some(PageRun {
                start: cursor,
                pages,
                buf_offset,
            });
            let n = pages << page_size.shift();
            cursor += n as u64;
            buf_offset += n;
            remaining -= n;
        }

        if remaining > 0 {
            split.tail = Some(PartialPage {
                page: cursor,
                in_page: 0,
                len: remaining,
                buf_offset,
            });
        }

        trace!(addr, len, ?split, "split request");
        Ok(split)
    }

    /// Returns true if the request touches no page.
    pub fn is_empty(&self) -> bool {
        self.head.is_none() && self.middle.is_none() && self.tail.is_none()
    }
}
