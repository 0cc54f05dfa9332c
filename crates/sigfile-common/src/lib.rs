//! Signature-file common types, errors, and configuration.
//!
//! This crate provides shared definitions used by the signature index
//! storage engine.

pub mod config;
pub mod error;
pub mod page;

pub use config::{RelationConfig, SigScheme, StorageConfig};
pub use error::{Result, SigFileError};
pub use page::{FileKind, ItemPage, PageId, DEFAULT_PAGE_SIZE, PAGE_HEADER_SIZE};
