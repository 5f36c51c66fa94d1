//! Per-process page table
//!
//! Maps virtual page numbers to frame indices. Entries hold frame indices
//! only, never references into the frame table; the VMM owns the frames.
//! An entry exists exactly while its page is mapped: eviction and unmapping
//! drop it, so a later fault on the same page can map it afresh.

use std::collections::BTreeMap;

use crate::types::{Address, ProcessId, Size};

/// One virtual-to-physical mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTableEntry {
    /// Frame index in the VMM's frame table.
    pub frame: usize,
    /// Whether the page is resident.
    pub present: bool,
    /// Set on every access.
    pub referenced: bool,
    /// Set on write accesses.
    pub modified: bool,
    /// Owning process.
    pub pid: ProcessId,
}

/// Page table for a single process.
#[derive(Debug, Clone)]
pub struct PageTable {
    pid: ProcessId,
    page_size: Size,
    entries: BTreeMap<Address, PageTableEntry>,
}

impl PageTable {
    /// Empty table for `pid`. The page size is validated by the VMM before
    /// any table is built.
    pub fn new(pid: ProcessId, page_size: Size) -> Self {
        debug_assert!(page_size > 0);
        Self { pid, page_size, entries: BTreeMap::new() }
    }

    /// Owning process.
    #[must_use]
    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    /// Page size this table was built for.
    #[must_use]
    pub fn page_size(&self) -> Size {
        self.page_size
    }

    /// Map `virtual_page` to `frame`. Fails if the page is already mapped.
    pub fn add_mapping(&mut self, virtual_page: Address, frame: usize) -> bool {
        if self.entries.contains_key(&virtual_page) {
            return false;
        }
        self.entries.insert(
            virtual_page,
            PageTableEntry {
                frame,
                present: true,
                referenced: false,
                modified: false,
                pid: self.pid,
            },
        );
        true
    }

    /// Drop the mapping for `virtual_page`. Fails if it does not exist.
    pub fn remove_mapping(&mut self, virtual_page: Address) -> bool {
        self.entries.remove(&virtual_page).is_some()
    }

    /// Whether `virtual_page` is mapped and resident.
    #[must_use]
    pub fn is_present(&self, virtual_page: Address) -> bool {
        self.entries.get(&virtual_page).is_some_and(|e| e.present)
    }

    /// Frame backing `virtual_page`, if resident.
    #[must_use]
    pub fn frame_of(&self, virtual_page: Address) -> Option<usize> {
        self.entries.get(&virtual_page).filter(|e| e.present).map(|e| e.frame)
    }

    /// Set the referenced bit on a mapped page.
    pub fn set_referenced(&mut self, virtual_page: Address, referenced: bool) {
        if let Some(entry) = self.entries.get_mut(&virtual_page) {
            entry.referenced = referenced;
        }
    }

    /// Set the modified bit on a mapped page.
    pub fn set_modified(&mut self, virtual_page: Address, modified: bool) {
        if let Some(entry) = self.entries.get_mut(&virtual_page) {
            entry.modified = modified;
        }
    }

    /// Drop every entry backed by `frame`. Returns how many were dropped.
    pub fn invalidate_frame(&mut self, frame: usize) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !(entry.present && entry.frame == frame));
        before - self.entries.len()
    }

    /// Resident page count.
    #[must_use]
    pub fn present_pages(&self) -> usize {
        self.entries.values().filter(|e| e.present).count()
    }

    /// Resident pages with the modified bit set.
    #[must_use]
    pub fn modified_pages(&self) -> usize {
        self.entries.values().filter(|e| e.present && e.modified).count()
    }

    /// Iterate over `(virtual_page, entry)` in page order.
    pub fn entries(&self) -> impl Iterator<Item = (&Address, &PageTableEntry)> {
        self.entries.iter()
    }

    /// Drop every mapping.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
