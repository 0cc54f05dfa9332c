//! Relation header and capacity constants.

/// Magic bytes opening every `.info` record.
pub const INFO_MAGIC: [u8; 4] = *b"SIGF";

/// Version of the `.info` record layout.
pub const INFO_VERSION: u16 = 1;

/// Size of the `.info` record in bytes.
pub const INFO_RECORD_SIZE: usize = 72;

/// Offset of the statistics counters in the `.info` record.
pub const INFO_STATS_OFFSET: usize = 40;

/// Minimum tuples and tuple signatures per page.
pub const MIN_ITEMS_PER_PAGE: usize = 1;

/// Minimum page signatures and bit-slice rows per page.
pub const MIN_INDEX_ITEMS_PER_PAGE: usize = 2;
