//! Append-only files of fixed-width items packed into counted pages.
//!
//! Items are numbered from 0 across the whole file. Every page except the
//! last is full, so item `i` lives on page `i / per_page` in slot
//! `i % per_page`.

use crate::disk::DiskManager;
use crate::relation::IndexCounts;
use sigfile_common::page::{FileKind, ItemPage, PageId};
use sigfile_common::{Result, SigFileError};
use std::sync::Arc;

/// Where an appended item landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Appended {
    /// Item number within the file.
    pub index: u32,
    /// Page holding the item.
    pub page_num: u32,
    /// Slot within the page.
    pub slot: u32,
    /// True if a page was allocated for this item.
    pub new_page: bool,
}

/// One paged file of fixed-width items.
pub(crate) struct ItemFile {
    disk: Arc<DiskManager>,
    kind: FileKind,
    width: usize,
    per_page: u32,
}

impl ItemFile {
    pub(crate) fn new(disk: Arc<DiskManager>, kind: FileKind, width: usize, per_page: u32) -> Self {
        Self {
            disk,
            kind,
            width,
            per_page,
        }
    }

    pub(crate) fn width(&self) -> usize {
        self.width
    }

    pub(crate) fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Returns (page, slot) of item `index`.
    #[inline]
    pub(crate) fn locate(&self, index: u32) -> (u32, u32) {
        (index / self.per_page, index % self.per_page)
    }

    pub(crate) fn page_id(&self, page_num: u32) -> PageId {
        PageId::new(self.kind, page_num)
    }

    pub(crate) fn read_page(&self, page_num: u32) -> Result<ItemPage> {
        self.disk.read_page(self.page_id(page_num))
    }

    pub(crate) fn write_page(&self, page_num: u32, page: &ItemPage) -> Result<()> {
        self.disk.write_page(self.page_id(page_num), page)
    }

    /// Allocates an empty page and counts it.
    pub(crate) fn allocate_page(&self, counts: &mut IndexCounts) -> Result<u32> {
        let page_id = self.disk.allocate_page(self.kind)?;
        counts.pages += 1;
        Ok(page_id.page_num)
    }

    fn check_width(&self, item: &[u8]) -> Result<()> {
        if item.len() != self.width {
            return Err(SigFileError::SignatureWidthMismatch {
                expected: self.width * 8,
                actual: item.len() * 8,
            });
        }
        Ok(())
    }

    /// Appends to the last page, allocating a new one if it is full.
    ///
    /// Counts are only bumped for work that reached the disk.
    pub(crate) fn append(&self, item: &[u8], counts: &mut IndexCounts) -> Result<Appended> {
        self.check_width(item)?;

        let last = counts
            .pages
            .checked_sub(1)
            .ok_or_else(|| SigFileError::Internal(format!("{} file has no pages", self.kind)))?;

        let mut page = self.read_page(last)?;
        let (page_num, new_page) = if page.item_count() >= self.per_page {
            let page_num = self.allocate_page(counts)?;
            page = ItemPage::new(self.disk.page_size());
            (page_num, true)
        } else {
            (last, false)
        };

        let slot = page.push_item(item)?;
        self.write_page(page_num, &page)?;

        let index = counts.items;
        counts.items += 1;

        Ok(Appended {
            index,
            page_num,
            slot,
            new_page,
        })
    }

    /// Reads item `index`.
    pub(crate) fn read(&self, index: u32, counts: &IndexCounts) -> Result<Vec<u8>> {
        if index >= counts.items {
            return Err(SigFileError::EntryOutOfRange {
                index,
                count: counts.items,
            });
        }
        let (page_num, slot) = self.locate(index);
        let page = self.read_page(page_num)?;
        Ok(page.item(slot, self.width)?.to_vec())
    }

    /// Overwrites item `index` in place.
    pub(crate) fn write(&self, index: u32, item: &[u8], counts: &IndexCounts) -> Result<()> {
        self.check_width(item)?;
        if index >= counts.items {
            return Err(SigFileError::EntryOutOfRange {
                index,
                count: counts.items,
            });
        }
        let (page_num, slot) = self.locate(index);
        let mut page = self.read_page(page_num)?;
        page.put_item(slot, item)?;
        self.write_page(page_num, &page)
    }

    /// Reads every item in order, one page read per page.
    pub(crate) fn scan(&self, counts: &IndexCounts) -> Result<Vec<Vec<u8>>> {
        let mut items = Vec::with_capacity(counts.items as usize);
        for page_num in 0..counts.pages {
            let page = self.read_page(page_num)?;
            for slot in 0..page.item_count() {
                items.push(page.item(slot, self.width)?.to_vec());
            }
        }
        Ok(items)
    }
}
