//! Relations: the five files of a signature-indexed table.
//!
//! This module provides:
//! - RelationParams / RelationStats: immutable configuration and mutable
//!   counters, persisted together in the `.info` record
//! - Relation: create/open/close lifecycle and the insertion pipeline
//! - RelationReport: human-readable diagnostics

pub mod constants;
mod file;
mod header;
mod report;

pub use file::Relation;
pub use header::{IndexCounts, RelationHeader, RelationParams, RelationStats};
pub use report::RelationReport;
