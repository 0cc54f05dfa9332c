//! Signature-file index storage.
//!
//! This crate provides:
//! - Disk manager for page-level file I/O over a relation's five files
//! - Fixed-width tuples packed into counted data pages
//! - Superimposed-coding tuple and page signatures
//! - Tuple signature, page signature and bit-slice indexes
//! - Relation lifecycle (create/open/close) and the insertion pipeline

mod bits;
mod bsig;
mod disk;
mod item_file;
mod psig;
mod relation;
mod signature;
mod tsig;
mod tuple;

pub use bits::Bits;
pub use bsig::BitSliceIndex;
pub use disk::{DiskManager, DiskManagerConfig};
pub use item_file::Appended;
pub use psig::PageSignatureIndex;
pub use relation::constants;
pub use relation::{
    IndexCounts, Relation, RelationHeader, RelationParams, RelationReport, RelationStats,
};
pub use signature::{concatenated_spans, SignatureCodec};
pub use tsig::TupleSignatureIndex;
pub use tuple::{tuple_size, Tuple, ATTR_SEPARATOR, TUPLE_ATTR_SIZE, TUPLE_BASE_SIZE};
