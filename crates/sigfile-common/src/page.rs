//! Page structures for signature-indexed relations.
//!
//! Every paged file of a relation is a sequence of fixed-size pages. A page
//! holds a counted run of fixed-width items packed with no padding:
//!
//! ```text
//! +--------------------+
//! | item_count (4, LE) |
//! +--------------------+
//! | item 0             |
//! | item 1             |
//! | ...                |
//! | item cap-1         |
//! +--------------------+
//! ```

use crate::error::{Result, SigFileError};
use serde::{Deserialize, Serialize};

/// Default page size in bytes (1 KB).
pub const DEFAULT_PAGE_SIZE: usize = 1024;

/// Size of the per-page header holding the item count.
pub const PAGE_HEADER_SIZE: usize = 4;

/// The five files that make up one relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FileKind {
    /// Configuration and statistics record.
    Info = 0,
    /// Tuple data pages.
    Data = 1,
    /// Tuple signatures.
    TupleSig = 2,
    /// Page signatures.
    PageSig = 3,
    /// Bit-slice rows.
    BitSlice = 4,
}

impl FileKind {
    /// All paged files, in creation order.
    pub const PAGED: [FileKind; 4] = [
        FileKind::Data,
        FileKind::TupleSig,
        FileKind::PageSig,
        FileKind::BitSlice,
    ];

    /// Returns the file name suffix.
    pub fn suffix(&self) -> &'static str {
        match self {
            FileKind::Info => "info",
            FileKind::Data => "data",
            FileKind::TupleSig => "tsig",
            FileKind::PageSig => "psig",
            FileKind::BitSlice => "bsig",
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Identifier for a page within one of a relation's files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId {
    /// File holding the page.
    pub file: FileKind,
    /// Page number within the file (0-indexed).
    pub page_num: u32,
}

impl PageId {
    /// Creates a new PageId.
    pub fn new(file: FileKind, page_num: u32) -> Self {
        Self { file, page_num }
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file, self.page_num)
    }
}

/// Returns how many items of `item_width` bytes fit on one page.
pub fn items_per_page(page_size: usize, item_width: usize) -> usize {
    if item_width == 0 || page_size <= PAGE_HEADER_SIZE {
        return 0;
    }
    (page_size - PAGE_HEADER_SIZE) / item_width
}

/// An in-memory copy of one fixed-size page of fixed-width items.
#[derive(Clone, PartialEq, Eq)]
pub struct ItemPage {
    data: Box<[u8]>,
}

impl ItemPage {
    /// Creates an empty, zero-filled page.
    pub fn new(page_size: usize) -> Self {
        Self {
            data: vec![0u8; page_size].into_boxed_slice(),
        }
    }

    /// Creates a page from raw bytes.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            data: data.into_boxed_slice(),
        }
    }

    /// Returns the raw page data.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the page size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Returns the number of items stored on the page.
    pub fn item_count(&self) -> u32 {
        u32::from_le_bytes([self.data[0], self.data[1], self.data[2], self.data[3]])
    }

    fn set_item_count(&mut self, count: u32) {
        self.data[..PAGE_HEADER_SIZE].copy_from_slice(&count.to_le_bytes());
    }

    fn item_range(&self, slot: u32, width: usize) -> Result<std::ops::Range<usize>> {
        let start = PAGE_HEADER_SIZE + slot as usize * width;
        let end = start + width;
        if width == 0 || end > self.data.len() {
            return Err(SigFileError::Internal(format!(
                "slot {} of width {} outside {}-byte page",
                slot,
                width,
                self.data.len()
            )));
        }
        Ok(start..end)
    }

    /// Returns the bytes of the item in `slot`.
    pub fn item(&self, slot: u32, width: usize) -> Result<&[u8]> {
        let range = self.item_range(slot, width)?;
        Ok(&self.data[range])
    }

    /// Overwrites the item in `slot` without changing the item count.
    pub fn put_item(&mut self, slot: u32, item: &[u8]) -> Result<()> {
        let range = self.item_range(slot, item.len())?;
        self.data[range].copy_from_slice(item);
        Ok(())
    }

    /// Appends an item after the last one and bumps the item count.
    ///
    /// Returns the slot written.
    pub fn push_item(&mut self, item: &[u8]) -> Result<u32> {
        let slot = self.item_count();
        if items_per_page(self.data.len(), item.len()) <= slot as usize {
            return Err(SigFileError::PageFull);
        }
        self.put_item(slot, item)?;
        self.set_item_count(slot + 1);
        Ok(slot)
    }
}

impl std::fmt::Debug for ItemPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemPage")
            .field("size", &self.data.len())
            .field("item_count", &self.item_count())
            .finish()
    }
}
