//! Page signature index: one OR-accumulated signature per data page.

use crate::bits::Bits;
use crate::disk::DiskManager;
use crate::item_file::ItemFile;
use crate::relation::IndexCounts;
use sigfile_common::page::FileKind;
use sigfile_common::{Result, SigFileError};
use std::sync::Arc;
use tracing::trace;

/// Store of page signatures, entry `j` describing data page `j`.
///
/// An entry is created for the first tuple stored while its data page has
/// none and is OR-ed in place for every later tuple on that page, so it
/// always covers the page signatures of the tuples stored there.
pub struct PageSignatureIndex {
    file: ItemFile,
}

impl PageSignatureIndex {
    /// Creates an index over `pm`-bit signatures, `per_page` to a page.
    pub fn new(disk: Arc<DiskManager>, pm: u32, per_page: u32) -> Self {
        Self {
            file: ItemFile::new(disk, FileKind::PageSig, pm as usize / 8, per_page),
        }
    }

    /// Returns how many signatures fit on one page.
    pub fn per_page(&self) -> u32 {
        self.file.per_page()
    }

    /// Folds a tuple's page signature into the index.
    ///
    /// When `starts_page` is set the data page has no entry yet and the
    /// signature becomes a new one. Otherwise it is OR-ed into the last
    /// entry. Returns the entry number touched.
    pub fn merge_or_append(
        &self,
        signature: &Bits,
        starts_page: bool,
        counts: &mut IndexCounts,
    ) -> Result<u32> {
        if starts_page {
            let appended = self.file.append(signature.as_bytes(), counts)?;
            trace!(entry = appended.index, page = appended.page_num, "page signature appended");
            return Ok(appended.index);
        }

        let last = counts.items.checked_sub(1).ok_or_else(|| {
            SigFileError::Internal("no page signature to merge into".to_string())
        })?;

        let mut accumulated = self.get(last, counts)?;
        accumulated.or_with(signature)?;
        self.file.write(last, accumulated.as_bytes(), counts)?;
        trace!(entry = last, "page signature merged");

        Ok(last)
    }

    /// Reads the signature of data page `index`.
    pub fn get(&self, index: u32, counts: &IndexCounts) -> Result<Bits> {
        Ok(Bits::from_bytes(&self.file.read(index, counts)?))
    }

    /// Reads every page signature in data page order.
    pub fn scan(&self, counts: &IndexCounts) -> Result<Vec<Bits>> {
        Ok(self
            .file
            .scan(counts)?
            .iter()
            .map(|bytes| Bits::from_bytes(bytes))
            .collect())
    }
}
