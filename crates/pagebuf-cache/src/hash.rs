//! Hash index - page offset to page header lookup.
//!
//! A fixed power-of-two array of buckets. Each bucket is a doubly linked
//! chain of page handles; the chain links live in a side table indexed by
//! handle so removal is O(1) without a walk.

use pagebuf_common::types::PageSize;
use tracing::trace;

use super::page::PageHandle;

/// Chain membership of one page handle.
#[derive(Debug, Clone, Copy, Default)]
struct ChainLink {
    offset: u64,
    prev: Option<PageHandle>,
    next: Option<PageHandle>,
    /// Bucket the handle is chained into, `None` when not indexed.
    bucket: Option<usize>,
}

/// Outcome of a [`HashIndex::search`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    /// The matching page, if any.
    pub handle: Option<PageHandle>,
    /// Number of chain entries compared.
    pub depth: usize,
}

/// Bucketed index from page-aligned offset to page handle.
///
/// Holds no page data and keeps no statistics; the controller accounts
/// for the probe depths and chain lengths this index reports.
pub struct HashIndex {
    heads: Box<[Option<PageHandle>]>,
    depths: Box<[usize]>,
    links: Vec<ChainLink>,
    page_size: PageSize,
    mask: u64,
    len: usize,
}

impl HashIndex {
    /// Creates an empty index with `buckets` buckets for pages of `page_size`.
    ///
    /// `buckets` must be a power of two; configuration validation enforces it.
    pub fn new(buckets: usize, page_size: PageSize) -> Self {
        debug_assert!(buckets.is_power_of_two());
        Self {
            heads: vec![None; buckets].into_boxed_slice(),
            depths: vec![0; buckets].into_boxed_slice(),
            links: Vec::new(),
            page_size,
            mask: buckets as u64 - 1,
            len: 0,
        }
    }

    /// Returns the bucket for `offset`: page number modulo bucket count.
    #[inline]
    pub fn hash(&self, offset: u64) -> usize {
        (self.page_size.page_number(offset).as_u64() & self.mask) as usize
    }

    /// Returns the number of buckets.
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.heads.len()
    }

    /// Returns the number of indexed pages.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no page is indexed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the chain length of `bucket`.
    pub fn bucket_depth(&self, bucket: usize) -> usize {
        self.depths[bucket]
    }

    /// Returns true if `handle` is chained into a bucket.
    pub fn contains(&self, handle: PageHandle) -> bool {
        self.links
            .get(handle.index())
            .is_some_and(|link| link.bucket.is_some())
    }

    /// Prepends `handle` to the chain for `offset`.
    ///
    /// Returns the new length of that chain.
    pub fn insert(&mut self, handle: PageHandle, offset: u64) -> usize {
        debug_assert!(!self.contains(handle), "page {} already indexed", handle);

        let bucket = self.hash(offset);
        let old_head = self.heads[bucket];
        if let Some(head) = old_head {
            self.link_mut(head).prev = Some(handle);
        }
        *self.link_mut(handle) = ChainLink {
            offset,
            prev: None,
            next: old_head,
            bucket: Some(bucket),
        };
        self.heads[bucket] = Some(handle);
        self.depths[bucket] += 1;
        self.len += 1;

        trace!(handle = %handle, offset, bucket, depth = self.depths[bucket], "indexed page");
        self.depths[bucket]
    }

    /// Unlinks `handle` from its chain. Returns false if it was not indexed.
    pub fn remove(&mut self, handle: PageHandle) -> bool {
        let Some(link) = self.links.get(handle.index()).copied() else {
            return false;
        };
        let Some(bucket) = link.bucket else {
            return false;
        };

        match link.prev {
            Some(prev) => self.link_mut(prev).next = link.next,
            None => self.heads[bucket] = link.next,
        }
        if let Some(next) = link.next {
            self.link_mut(next).prev = link.prev;
        }
        *self.link_mut(handle) = ChainLink::default();
        self.depths[bucket] -= 1;
        self.len -= 1;

        trace!(handle = %handle, offset = link.offset, bucket, "unindexed page");
        true
    }

    /// Walks the chain for `offset` looking for an exact match.
    pub fn search(&self, offset: u64) -> Probe {
        let mut cursor = self.heads[self.hash(offset)];
        let mut depth = 0;
        while let Some(handle) = cursor {
            depth += 1;
            let link = &self.links[handle.index()];
            if link.offset == offset {
                return Probe {
                    handle: Some(handle),
                    depth,
                };
            }
            cursor = link.next;
        }
        Probe {
            handle: None,
            depth,
        }
    }

    /// Empties every bucket.
    pub fn clear(&mut self) {
        self.heads.fill(None);
        self.depths.fill(0);
        self.links.clear();
        self.len = 0;
    }

    fn link_mut(&mut self, handle: PageHandle) -> &mut ChainLink {
        let index = handle.index();
        if index >= self.links.len() {
            self.links.resize(index + 1, ChainLink::default());
        }
        &mut self.links[index]
    }
}

impl std::fmt::Debug for HashIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashIndex")
            .field("buckets", &self.heads.len())
            .field("len", &self.len)
            .field("max_depth", &self.depths.iter().max().copied().unwrap_or(0))
            .finish()
    }
}
