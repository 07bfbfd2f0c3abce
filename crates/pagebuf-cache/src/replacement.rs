//! LRU replacement list.
//!
//! Resident pages ordered from most recently used (head) to least recently
//! used (tail). Links are kept in a side table indexed by page handle, so
//! every operation except victim selection is O(1).
//!
//! Victim selection starts at the tail. A busy tail page is rotated to the
//! head and the new tail examined, at most once per resident page:
//!
//! ```text
//!  head (MRU)                          tail (LRU)
//!    ┌───┐   ┌───┐   ┌───┐   ┌───┐   ┌───┐
//!    │ E │ ⇄ │ D │ ⇄ │ C │ ⇄ │ B │ ⇄ │ A │ ← examined first
//!    └───┘   └───┘   └───┘   └───┘   └───┘
//! ```

use super::page::PageHandle;

#[derive(Debug, Clone, Copy, Default)]
struct ListLink {
    prev: Option<PageHandle>,
    next: Option<PageHandle>,
    linked: bool,
}

/// A page chosen for eviction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Victim {
    /// The least recently used page that was not busy.
    pub handle: PageHandle,
    /// Busy pages rotated to the head before the victim was found.
    pub skipped: usize,
}

/// Doubly linked LRU list over page handles.
#[derive(Debug, Default)]
pub struct ReplacementList {
    links: Vec<ListLink>,
    head: Option<PageHandle>,
    tail: Option<PageHandle>,
    len: usize,
}

impl ReplacementList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of listed pages.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the list is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the most recently used page.
    #[inline]
    pub fn head(&self) -> Option<PageHandle> {
        self.head
    }

    /// Returns the least recently used page.
    #[inline]
    pub fn tail(&self) -> Option<PageHandle> {
        self.tail
    }

    /// Returns true if `handle` is listed.
    pub fn contains(&self, handle: PageHandle) -> bool {
        self.links
            .get(handle.index())
            .is_some_and(|link| link.linked)
    }

    /// Inserts `handle` as the most recently used page.
    pub fn prepend(&mut self, handle: PageHandle) {
        debug_assert!(!self.contains(handle), "page {} already listed", handle);
        let old_head = self.head;
        *self.link_mut(handle) = ListLink {
            prev: None,
            next: old_head,
            linked: true,
        };
        match old_head {
            Some(head) => self.link_mut(head).prev = Some(handle),
            None => self.tail = Some(handle),
        }
        self.head = Some(handle);
        self.len += 1;
    }

    /// Inserts `handle` as the least recently used page.
    pub fn append(&mut self, handle: PageHandle) {
        debug_assert!(!self.contains(handle), "page {} already listed", handle);
        let old_tail = self.tail;
        *self.link_mut(handle) = ListLink {
            prev: old_tail,
            next: None,
            linked: true,
        };
        match old_tail {
            Some(tail) => self.link_mut(tail).next = Some(handle),
            None => self.head = Some(handle),
        }
        self.tail = Some(handle);
        self.len += 1;
    }

    /// Unlinks `handle`. Returns false if it was not listed.
    pub fn remove(&mut self, handle: PageHandle) -> bool {
        if !self.contains(handle) {
            return false;
        }
        let link = self.links[handle.index()];
        match link.prev {
            Some(prev) => self.link_mut(prev).next = link.next,
            None => self.head = link.next,
        }
        match link.next {
            Some(next) => self.link_mut(next).prev = link.prev,
            None => self.tail = link.prev,
        }
        self.links[handle.index()] = ListLink::default();
        self.len -= 1;
        true
    }

    /// Marks `handle` as the most recently used page.
    pub fn touch(&mut self, handle: PageHandle) {
        if self.head == Some(handle) {
            return;
        }
        self.remove(handle);
        self.prepend(handle);
    }

    /// Finds the least recently used page for which `is_busy` is false.
    ///
    /// Busy tail pages are moved to the head as they are passed over. The
    /// scan examines each listed page at most once and returns `None` when
    /// all of them are busy. The victim stays listed; the caller detaches it
    /// once any write-back has succeeded.
    pub fn select_victim(&mut self, mut is_busy: impl FnMut(PageHandle) -> bool) -> Option<Victim> {
        let mut skipped = 0;
        for _ in 0..self.len {
            let tail = self.tail?;
            if !is_busy(tail) {
                return Some(Victim {
                    handle: tail,
                    skipped,
                });
            }
            self.touch(tail);
            skipped += 1;
        }
        None
    }

    /// Iterates from most to least recently used.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    /// Empties the list.
    pub fn clear(&mut self) {
        self.links.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    fn link_mut(&mut self, handle: PageHandle) -> &mut ListLink {
        let index = handle.index();
        if index >= self.links.len() {
            self.links.resize(index + 1, ListLink::default());
        }
        &mut self.links[index]
    }
}

/// Iterator over a [`ReplacementList`], most recently used first.
pub struct Iter<'a> {
    list: &'a ReplacementList,
    cursor: Option<PageHandle>,
}

impl Iterator for Iter<'_> {
    type Item = PageHandle;

    fn next(&mut self) -> Option<PageHandle> {
        let current = self.cursor?;
        self.cursor = self.list.links[current.index()].next;
        Some(current)
    }
}

impl<'a> IntoIterator for &'a ReplacementList {
    type Item = PageHandle;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}
