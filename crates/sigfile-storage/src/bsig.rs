//! Bit-slice index: the page signatures transposed.
//!
//! Row `b` is a `bm`-bit string whose bit `j` is set iff data page `j`'s
//! signature has bit `b` set. All `pm` rows are allocated zeroed when the
//! relation is created; afterwards only cell values change.
//!
//! ```text
//!            data page ->
//!            0 1 2 3 ... bm-1
//! row 0    [ 0 1 0 0 ...  0 ]
//! row 1    [ 1 1 0 1 ...  0 ]
//! ...
//! row pm-1 [ 0 0 1 0 ...  0 ]
//! ```

use crate::bits::Bits;
use crate::disk::DiskManager;
use crate::item_file::ItemFile;
use crate::relation::IndexCounts;
use sigfile_common::page::{FileKind, ItemPage};
use sigfile_common::{Result, SigFileError};
use std::sync::Arc;
use tracing::trace;

/// Fixed-capacity transposed index over page signatures.
pub struct BitSliceIndex {
    file: ItemFile,
    disk: Arc<DiskManager>,
    pm: u32,
    bm: u32,
}

impl BitSliceIndex {
    /// Creates an index of `pm` rows of `bm` bits, `per_page` rows to a page.
    pub fn new(disk: Arc<DiskManager>, pm: u32, bm: u32, per_page: u32) -> Self {
        Self {
            file: ItemFile::new(disk.clone(), FileKind::BitSlice, bm as usize / 8, per_page),
            disk,
            pm,
            bm,
        }
    }

    /// Returns how many rows fit on one page.
    pub fn per_page(&self) -> u32 {
        self.file.per_page()
    }

    /// Writes all `pm` zeroed rows into `ceil(pm / per_page)` fresh pages.
    ///
    /// The last page holds whatever rows remain and may be partly filled.
    pub fn initialize(&self, counts: &mut IndexCounts) -> Result<()> {
        let per_page = self.file.per_page();
        let pages = self.pm.div_ceil(per_page);
        let zero = Bits::new(self.bm as usize);

        for page_index in 0..pages {
            let rows = per_page.min(self.pm - page_index * per_page);
            let page_num = self.file.allocate_page(counts)?;

            let mut page = ItemPage::new(self.disk.page_size());
            for _ in 0..rows {
                page.push_item(zero.as_bytes())?;
            }
            self.file.write_page(page_num, &page)?;
            counts.items += rows;
        }

        Ok(())
    }

    /// Sets column `page_index` in every row whose bit is set in `signature`.
    ///
    /// Each touched bit-slice page is read and written once. Bits already
    /// set are left alone, so propagating the same signature again changes
    /// nothing. Returns the number of cells that changed.
    pub fn propagate(&self, signature: &Bits, page_index: u32, counts: &IndexCounts) -> Result<usize> {
        if page_index >= self.bm {
            return Err(SigFileError::BitSliceCapacityExceeded {
                page_index,
                capacity: self.bm,
            });
        }
        if signature.len() != self.pm as usize {
            return Err(SigFileError::SignatureWidthMismatch {
                expected: self.pm as usize,
                actual: signature.len(),
            });
        }

        let width = self.file.width();
        let mut current: Option<(u32, ItemPage, bool)> = None;
        let mut changed = 0;

        for bit in signature.iter_ones() {
            let bit = bit as u32;
            if bit >= counts.items {
                return Err(SigFileError::EntryOutOfRange {
                    index: bit,
                    count: counts.items,
                });
            }
            let (page_num, slot) = self.file.locate(bit);

            if current.as_ref().map(|(num, _, _)| *num) != Some(page_num) {
                if let Some((num, page, true)) = current.take() {
                    self.file.write_page(num, &page)?;
                }
                current = Some((page_num, self.file.read_page(page_num)?, false));
            }

            if let Some((_, page, dirty)) = current.as_mut() {
                let mut row = Bits::from_bytes(page.item(slot, width)?);
                if !row.get(page_index as usize) {
                    row.set(page_index as usize)?;
                    page.put_item(slot, row.as_bytes())?;
                    *dirty = true;
                    changed += 1;
                    trace!(row = bit, column = page_index, "bit-slice cell set");
                }
            }
        }

        if let Some((num, page, true)) = current {
            self.file.write_page(num, &page)?;
        }

        Ok(changed)
    }

    /// Reads row `bit`.
    pub fn row(&self, bit: u32, counts: &IndexCounts) -> Result<Bits> {
        Ok(Bits::from_bytes(&self.file.read(bit, counts)?))
    }

    /// Reads all rows in bit order.
    pub fn rows(&self, counts: &IndexCounts) -> Result<Vec<Bits>> {
        Ok(self
            .file
            .scan(counts)?
            .iter()
            .map(|bytes| Bits::from_bytes(bytes))
            .collect())
    }

    /// Returns the data pages whose signatures contain every bit of `query`.
    ///
    /// The result has one bit per column; columns at or beyond `npages`
    /// are cleared.
    pub fn candidate_pages(&self, query: &Bits, npages: u32, counts: &IndexCounts) -> Result<Bits> {
        let mut matches = Bits::new(self.bm as usize);
        for column in 0..npages.min(self.bm) {
            matches.set(column as usize)?;
        }
        for bit in query.iter_ones() {
            matches.and_with(&self.row(bit as u32, counts)?)?;
        }
        Ok(matches)
    }
}
