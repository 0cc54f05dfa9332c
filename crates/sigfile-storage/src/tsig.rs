//! Tuple signature index: one signature per tuple, in insertion order.

use crate::bits::Bits;
use crate::disk::DiskManager;
use crate::item_file::{Appended, ItemFile};
use crate::relation::IndexCounts;
use sigfile_common::page::FileKind;
use sigfile_common::Result;
use std::sync::Arc;

/// Append-only store of tuple signatures.
///
/// Signature `i` belongs to the `i`-th inserted tuple.
pub struct TupleSignatureIndex {
    file: ItemFile,
}

impl TupleSignatureIndex {
    /// Creates an index over `tm`-bit signatures, `per_page` to a page.
    pub fn new(disk: Arc<DiskManager>, tm: u32, per_page: u32) -> Self {
        Self {
            file: ItemFile::new(disk, FileKind::TupleSig, tm as usize / 8, per_page),
        }
    }

    /// Returns how many signatures fit on one page.
    pub fn per_page(&self) -> u32 {
        self.file.per_page()
    }

    /// Appends a tuple signature.
    pub fn append(&self, signature: &Bits, counts: &mut IndexCounts) -> Result<Appended> {
        self.file.append(signature.as_bytes(), counts)
    }

    /// Reads the signature of tuple `index`.
    pub fn get(&self, index: u32, counts: &IndexCounts) -> Result<Bits> {
        Ok(Bits::from_bytes(&self.file.read(index, counts)?))
    }

    /// Reads every tuple signature in insertion order.
    pub fn scan(&self, counts: &IndexCounts) -> Result<Vec<Bits>> {
        Ok(self
            .file
            .scan(counts)?
            .iter()
            .map(|bytes| Bits::from_bytes(bytes))
            .collect())
    }
}
