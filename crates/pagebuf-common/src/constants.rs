//! Constants shared across the pagebuf crates.

// =============================================================================
// Page Constants
// =============================================================================

/// Default page size in bytes (4 KB).
///
/// Matches the typical OS page size and SSD block size.
pub const DEFAULT_PAGE_SIZE: usize = 4 * 1024;

/// Largest accepted page size in bytes (1 GB).
pub const MAX_PAGE_SIZE: usize = 1024 * 1024 * 1024;

// =============================================================================
// Cache Constants
// =============================================================================

/// Default number of resident pages.
pub const DEFAULT_MAX_NUM_PAGES: usize = 256;

/// Smallest hash index, in buckets.
pub const MIN_HASH_BUCKETS: usize = 16;

/// Largest hash index, in buckets.
pub const MAX_HASH_BUCKETS: usize = 1 << 20;

/// Numeric code of the LRU replacement policy.
pub const LRU_POLICY_CODE: u32 = 0;
