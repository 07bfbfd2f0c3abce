//! Page geometry types.
//!
//! All address arithmetic the cache performs (page boundaries, in-page
//! offsets, EOA rounding) goes through [`PageSize`], so the power-of-two
//! requirement is checked exactly once, when the value is built.

use std::fmt;

use crate::config::{ConfigError, ConfigResult};
use crate::constants::MAX_PAGE_SIZE;

/// Page number: a backing-store address shifted right by `log2(page_size)`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PageNumber(u64);

impl PageNumber {
    /// Creates a new `PageNumber` from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(n: u64) -> Self {
        Self(n)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for PageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageNumber({})", self.0)
    }
}

impl fmt::Display for PageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated, power-of-two page size.
///
/// # Example
///
/// ```rust
/// use pagebuf_common::types::PageSize;
///
/// let ps = PageSize::new(4096).unwrap();
/// assert_eq!(ps.shift(), 12);
/// assert_eq!(ps.align_down(4097), 4096);
/// assert_eq!(ps.align_up(4097), Some(8192));
/// assert_eq!(ps.offset_in_page(4097), 1);
///
/// assert!(PageSize::new(3000).is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageSize {
    shift: u32,
}

impl PageSize {
    /// Validates `bytes` and builds a page size from it.
    ///
    /// Fails with [`ConfigError::InvalidPageSize`] unless `bytes` is a power
    /// of two no larger than [`MAX_PAGE_SIZE`].
    pub fn new(bytes: usize) -> ConfigResult<Self> {
        if !bytes.is_power_of_two() || bytes > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidPageSize { page_size: bytes });
        }
        Ok(Self {
            shift: bytes.trailing_zeros(),
        })
    }

    /// Returns the page size in bytes.
    #[inline]
    #[must_use]
    pub const fn bytes(self) -> usize {
        1usize << self.shift
    }

    /// Returns the page size in bytes as a `u64`.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        1u64 << self.shift
    }

    /// Returns `log2(page_size)`.
    #[inline]
    #[must_use]
    pub const fn shift(self) -> u32 {
        self.shift
    }

    #[inline]
    const fn mask(self) -> u64 {
        self.as_u64() - 1
    }

    /// Returns the number of the page containing `addr`.
    #[inline]
    #[must_use]
    pub const fn page_number(self, addr: u64) -> PageNumber {
        PageNumber(addr >> self.shift)
    }

    /// Returns the address of the first byte of page `page`.
    #[inline]
    #[must_use]
    pub const fn page_offset(self, page: PageNumber) -> u64 {
        page.0 << self.shift
    }

    /// Rounds `addr` down to the start of its page.
    #[inline]
    #[must_use]
    pub const fn align_down(self, addr: u64) -> u64 {
        addr & !self.mask()
    }

    /// Rounds `addr` up to the next page boundary, or returns `None` if that
    /// boundary is not representable.
    #[inline]
    #[must_use]
    pub const fn align_up(self, addr: u64) -> Option<u64> {
        match addr.checked_add(self.mask()) {
            Some(v) => Some(v & !self.mask()),
            None => None,
        }
    }

    /// Returns the offset of `addr` within its page.
    #[inline]
    #[must_use]
    pub const fn offset_in_page(self, addr: u64) -> usize {
        (addr & self.mask()) as usize
    }

    /// Returns true if `addr` sits on a page boundary.
    #[inline]
    #[must_use]
    pub const fn is_aligned(self, addr: u64) -> bool {
        addr & self.mask() == 0
    }
}

impl fmt::Debug for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageSize({})", self.bytes())
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bytes())
    }
}

impl TryFrom<usize> for PageSize {
    type Error = ConfigError;

    fn try_from(bytes: usize) -> ConfigResult<Self> {
        Self::new(bytes)
    }
}

impl From<PageSize> for usize {
    fn from(ps: PageSize) -> Self {
        ps.bytes()
    }
}
