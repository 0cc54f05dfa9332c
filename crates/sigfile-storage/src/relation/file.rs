//! Relation lifecycle and the insertion pipeline.
//!
//! A relation named `r` lives in five files of the data directory:
//! `r.info` (header record), `r.data` (tuples), `r.tsig` (tuple
//! signatures), `r.psig` (page signatures) and `r.bsig` (bit-slices).

use super::header::{IndexCounts, RelationHeader, RelationParams, RelationStats};
use super::report::RelationReport;
use crate::bits::Bits;
use crate::bsig::BitSliceIndex;
use crate::disk::{DiskManager, DiskManagerConfig};
use crate::item_file::ItemFile;
use crate::psig::PageSignatureIndex;
use crate::signature::SignatureCodec;
use crate::tsig::TupleSignatureIndex;
use crate::tuple::Tuple;
use sigfile_common::config::{RelationConfig, StorageConfig};
use sigfile_common::page::FileKind;
use sigfile_common::{Result, SigFileError};
use std::fs::File;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// An open relation.
///
/// Statistics are kept in memory while the relation is open and written to
/// the `.info` file by [`Relation::close`]. A relation has a single owner;
/// opening the same relation twice at once is not supported.
pub struct Relation {
    /// Relation name.
    name: String,
    /// Disk manager shared by the five files.
    disk: Arc<DiskManager>,
    /// Parameters fixed at creation.
    params: RelationParams,
    /// Counters updated on every insertion.
    stats: RelationStats,
    /// Signature derivation.
    codec: SignatureCodec,
    /// Tuple data pages.
    data: ItemFile,
    /// Tuple signatures.
    tsig: TupleSignatureIndex,
    /// Page signatures.
    psig: PageSignatureIndex,
    /// Bit-slices.
    bsig: BitSliceIndex,
}

impl Relation {
    /// Creates a new relation and leaves it closed.
    ///
    /// Fails with a configuration error, before touching the disk, if any
    /// derived per-page capacity is too small. If a later step fails the
    /// partially written files are removed.
    pub fn create(storage: &StorageConfig, name: &str, config: &RelationConfig) -> Result<()> {
        let params = RelationParams::from_config(config, storage.page_size)?;

        if Self::exists(storage, name) {
            return Err(SigFileError::RelationExists(name.to_string()));
        }

        let mut relation = Self::assemble(storage, name, params, RelationStats::default())?;
        if let Err(err) = relation.initialize() {
            warn!(relation = name, error = %err, "relation creation failed, removing files");
            if let Err(cleanup) = relation.disk.delete_files() {
                warn!(relation = name, error = %cleanup, "removing partial relation files failed");
            }
            return Err(err);
        }

        info!(
            relation = name,
            nattrs = params.nattrs,
            scheme = params.scheme.name(),
            tm = params.tm,
            pm = params.pm,
            bm = params.bm,
            bsig_pages = relation.stats.bsigs.pages,
            "relation created"
        );
        relation.close()
    }

    /// Returns true if the relation's `.info` file exists and is readable.
    pub fn exists(storage: &StorageConfig, name: &str) -> bool {
        File::open(DiskManager::relation_path(&storage.data_dir, name, FileKind::Info)).is_ok()
    }

    /// Opens an existing relation from its `.info` record.
    ///
    /// Parameters are trusted as stored and capacities are not re-validated
    /// against the creation limits. A header whose sizes cannot address any
    /// page is rejected as corrupted.
    pub fn open(storage: &StorageConfig, name: &str) -> Result<Self> {
        let path = DiskManager::relation_path(&storage.data_dir, name, FileKind::Info);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(SigFileError::RelationNotFound(name.to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        let header = RelationHeader::from_bytes(&bytes)?;

        let relation = Self::assemble(storage, name, header.params, header.stats)?;
        info!(
            relation = name,
            tuples = header.stats.ntuples(),
            pages = header.stats.npages(),
            "relation opened"
        );
        Ok(relation)
    }

    /// Writes the current statistics to the `.info` file and releases
    /// every file.
    pub fn close(self) -> Result<()> {
        let header = RelationHeader {
            params: self.params,
            stats: self.stats,
        };
        self.disk.write_info(&header.to_bytes())?;
        self.disk.close_all()?;

        info!(
            relation = %self.name,
            tuples = self.stats.ntuples(),
            pages = self.stats.npages(),
            "relation closed"
        );
        Ok(())
    }

    fn assemble(
        storage: &StorageConfig,
        name: &str,
        params: RelationParams,
        stats: RelationStats,
    ) -> Result<Self> {
        let config = DiskManagerConfig::from_storage(storage, params.page_size as usize);
        let disk = Arc::new(DiskManager::new(config, name)?);

        Ok(Self {
            name: name.to_string(),
            codec: SignatureCodec::new(
                params.nattrs,
                params.scheme,
                params.tm,
                params.pm,
                params.tuples_per_page(),
            ),
            data: ItemFile::new(
                disk.clone(),
                FileKind::Data,
                params.tuple_size as usize,
                params.tuples_per_page() as u32,
            ),
            tsig: TupleSignatureIndex::new(disk.clone(), params.tm, params.tsigs_per_page() as u32),
            psig: PageSignatureIndex::new(disk.clone(), params.pm, params.psigs_per_page() as u32),
            bsig: BitSliceIndex::new(disk.clone(), params.pm, params.bm, params.bsigs_per_page() as u32),
            disk,
            params,
            stats,
        })
    }

    /// Lays out a fresh relation: one empty page in each of the data, tsig
    /// and psig files, and every bit-slice row zeroed.
    fn initialize(&mut self) -> Result<()> {
        self.disk.create_files()?;
        self.data.allocate_page(&mut self.stats.data)?;
        for (kind, counts) in [
            (FileKind::TupleSig, &mut self.stats.tsigs),
            (FileKind::PageSig, &mut self.stats.psigs),
        ] {
            self.disk.allocate_page(kind)?;
            counts.pages += 1;
        }
        self.bsig.initialize(&mut self.stats.bsigs)?;

        let header = RelationHeader {
            params: self.params,
            stats: self.stats,
        };
        self.disk.write_info(&header.to_bytes())
    }

    /// Inserts a tuple and updates all three signature indexes.
    ///
    /// Returns the data page the tuple landed on. A tuple that would need
    /// a data page beyond the bit-slice capacity is refused before anything
    /// is written. Failures after the tuple is stored (I/O, page limits)
    /// are not rolled back and may leave the indexes behind the data file.
    pub fn insert(&mut self, tuple: &Tuple) -> Result<u32> {
        tuple.validate(self.params.nattrs, self.params.tuple_size as usize)?;

        let target = self.next_data_page();
        if target >= self.params.bm {
            warn!(
                relation = %self.name,
                page_index = target,
                capacity = self.params.bm,
                "bit-slice capacity reached, insert refused"
            );
            return Err(SigFileError::BitSliceCapacityExceeded {
                page_index: target,
                capacity: self.params.bm,
            });
        }

        // 1. tuple into the last data page, or a new one
        let placed = self.data.append(tuple.as_bytes(), &mut self.stats.data)?;
        let page_index = placed.page_num;

        // 2. tuple signature
        let tsig = self.codec.tuple_signature(tuple)?;
        self.tsig.append(&tsig, &mut self.stats.tsigs)?;

        // 3. page signature, new entry while the data page has none
        let starts_page = self.stats.psigs.items < self.stats.data.pages;
        let entry_target = if starts_page {
            Some(self.stats.psigs.items)
        } else {
            self.stats.psigs.items.checked_sub(1)
        };
        if entry_target != Some(page_index) {
            return Err(SigFileError::Internal(format!(
                "page signatures ({}) out of step with data page {}",
                self.stats.psigs.items, page_index
            )));
        }
        let psig = self.codec.page_signature(tuple)?;
        let entry = self
            .psig
            .merge_or_append(&psig, starts_page, &mut self.stats.psigs)?;

        // 4. bit-slices from the accumulated page signature
        let accumulated = self.psig.get(entry, &self.stats.psigs)?;
        let changed = self
            .bsig
            .propagate(&accumulated, page_index, &self.stats.bsigs)?;

        debug!(
            relation = %self.name,
            page = page_index,
            slot = placed.slot,
            new_page = placed.new_page,
            bsig_cells = changed,
            "tuple inserted"
        );
        Ok(page_index)
    }

    /// Data page the next tuple will land on.
    fn next_data_page(&self) -> u32 {
        let data = &self.stats.data;
        let capacity = u64::from(data.pages) * self.params.tuples_per_page() as u64;
        if u64::from(data.items) >= capacity {
            data.pages
        } else {
            data.pages.saturating_sub(1)
        }
    }

    /// Returns the relation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the immutable parameters.
    pub fn params(&self) -> &RelationParams {
        &self.params
    }

    /// Returns the current statistics.
    pub fn stats(&self) -> &RelationStats {
        &self.stats
    }

    /// Returns the signature codec of this relation.
    pub fn codec(&self) -> &SignatureCodec {
        &self.codec
    }

    /// Reads the tuples stored on data page `page_num`.
    pub fn tuples_on_page(&self, page_num: u32) -> Result<Vec<Tuple>> {
        if page_num >= self.stats.data.pages {
            return Err(SigFileError::PageNotFound {
                page_id: self.data.page_id(page_num).to_string(),
            });
        }
        let page = self.data.read_page(page_num)?;
        (0..page.item_count())
            .map(|slot| {
                let bytes = page.item(slot, self.data.width())?;
                Ok(Tuple::from_bytes(bytes.to_vec()))
            })
            .collect()
    }

    /// Reads the signature of the `index`-th inserted tuple.
    pub fn tuple_signature(&self, index: u32) -> Result<Bits> {
        self.tsig.get(index, &self.stats.tsigs)
    }

    /// Reads every tuple signature in insertion order.
    pub fn tuple_signatures(&self) -> Result<Vec<Bits>> {
        self.tsig.scan(&self.stats.tsigs)
    }

    /// Reads the signature of data page `page_num`.
    pub fn page_signature(&self, page_num: u32) -> Result<Bits> {
        self.psig.get(page_num, &self.stats.psigs)
    }

    /// Reads every page signature in data page order.
    pub fn page_signatures(&self) -> Result<Vec<Bits>> {
        self.psig.scan(&self.stats.psigs)
    }

    /// Reads every bit-slice row in bit order.
    pub fn bit_slices(&self) -> Result<Vec<Bits>> {
        self.bsig.rows(&self.stats.bsigs)
    }

    /// Re-applies a page signature to the bit-slices of `page_num`.
    ///
    /// Returns the number of cells that changed.
    pub fn propagate_page_signature(&self, signature: &Bits, page_num: u32) -> Result<usize> {
        self.bsig.propagate(signature, page_num, &self.stats.bsigs)
    }

    /// Returns the data pages whose bit-slices contain every bit of a page
    /// signature built from `query`.
    pub fn candidate_pages(&self, query: &Tuple) -> Result<Vec<u32>> {
        let sig = self.codec.page_signature(query)?;
        let matches = self
            .bsig
            .candidate_pages(&sig, self.stats.npages(), &self.stats.bsigs)?;
        Ok(matches.iter_ones().map(|page| page as u32).collect())
    }

    /// Returns per-file counts.
    pub fn counts(&self, kind: FileKind) -> Option<IndexCounts> {
        match kind {
            FileKind::Info => None,
            FileKind::Data => Some(self.stats.data),
            FileKind::TupleSig => Some(self.stats.tsigs),
            FileKind::PageSig => Some(self.stats.psigs),
            FileKind::BitSlice => Some(self.stats.bsigs),
        }
    }

    /// Builds the diagnostic report.
    pub fn report(&self) -> RelationReport {
        RelationReport::new(self.params, self.stats)
    }
}

impl std::fmt::Debug for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relation")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("stats", &self.stats)
            .finish()
    }
}
