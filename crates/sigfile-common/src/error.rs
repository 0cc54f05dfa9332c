//! Error types for signature-indexed relations.

use thiserror::Error;

/// Result type alias using SigFileError.
pub type Result<T> = std::result::Result<T, SigFileError>;

/// Errors that can occur in relation and index operations.
#[derive(Debug, Error)]
pub enum SigFileError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    IoError(String),

    // Page errors
    #[error("Page not found: {page_id}")]
    PageNotFound { page_id: String },

    #[error("Page full, unable to add item")]
    PageFull,

    #[error("File {file} reached its page limit of {limit}")]
    FilePageLimit { file: String, limit: u32 },

    // Tuple errors
    #[error("Invalid tuple: {0}")]
    InvalidTuple(String),

    #[error("Tuple width mismatch: expected {expected}, got {actual}")]
    TupleWidthMismatch { expected: usize, actual: usize },

    // Index errors
    #[error("Bit-slice capacity exceeded: page index {page_index} >= {capacity}")]
    BitSliceCapacityExceeded { page_index: u32, capacity: u32 },

    #[error("Signature width mismatch: expected {expected} bits, got {actual}")]
    SignatureWidthMismatch { expected: usize, actual: usize },

    #[error("Index entry out of range: {index} (count {count})")]
    EntryOutOfRange { index: u32, count: u32 },

    // Relation errors
    #[error("Relation not found: {0}")]
    RelationNotFound(String),

    #[error("Relation already exists: {0}")]
    RelationExists(String),

    #[error("Relation header corrupted: {0}")]
    HeaderCorrupted(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid parameter: {name} = {value}")]
    InvalidParameter { name: String, value: String },

    #[error("{index} capacity too small: {capacity} per page (min {min})")]
    CapacityTooSmall {
        index: &'static str,
        capacity: usize,
        min: usize,
    },

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SigFileError {
    /// Returns true for errors raised while validating a relation's
    /// configuration at creation time.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SigFileError::ConfigError(_)
                | SigFileError::InvalidParameter { .. }
                | SigFileError::CapacityTooSmall { .. }
        )
    }

    /// Returns true for errors raised because no further page could be
    /// allocated or addressed.
    pub fn is_resource_exhausted(&self) -> bool {
        matches!(
            self,
            SigFileError::FilePageLimit { .. } | SigFileError::BitSliceCapacityExceeded { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_io_error_conversion() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: SigFileError = io_err.into();
        assert!(matches!(err, SigFileError::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_page_errors_display() {
        let err = SigFileError::PageNotFound {
            page_id: "psig:3".to_string(),
        };
        assert_eq!(err.to_string(), "Page not found: psig:3");

        let err = SigFileError::FilePageLimit {
            file: "rel.tsig".to_string(),
            limit: 4,
        };
        assert_eq!(err.to_string(), "File rel.tsig reached its page limit of 4");
    }

    #[test]
    fn test_tuple_errors_display() {
        let err = SigFileError::TupleWidthMismatch {
            expected: 28,
            actual: 30,
        };
        assert_eq!(err.to_string(), "Tuple width mismatch: expected 28, got 30");
    }

    #[test]
    fn test_capacity_errors_display() {
        let err = SigFileError::CapacityTooSmall {
            index: "psig",
            capacity: 1,
            min: 2,
        };
        assert_eq!(err.to_string(), "psig capacity too small: 1 per page (min 2)");

        let err = SigFileError::BitSliceCapacityExceeded {
            page_index: 8,
            capacity: 8,
        };
        assert_eq!(
            err.to_string(),
            "Bit-slice capacity exceeded: page index 8 >= 8"
        );
    }

    #[test]
    fn test_error_classes() {
        assert!(SigFileError::CapacityTooSmall {
            index: "bsig",
            capacity: 0,
            min: 2
        }
        .is_config_error());
        assert!(SigFileError::ConfigError("nattrs".to_string()).is_config_error());
        assert!(!SigFileError::PageFull.is_config_error());

        assert!(SigFileError::BitSliceCapacityExceeded {
            page_index: 8,
            capacity: 8
        }
        .is_resource_exhausted());
        assert!(SigFileError::FilePageLimit {
            file: "r.data".to_string(),
            limit: 1
        }
        .is_resource_exhausted());
        assert!(!SigFileError::Internal("x".to_string()).is_resource_exhausted());
    }

    #[test]
    fn test_relation_errors_display() {
        let err = SigFileError::RelationNotFound("emp".to_string());
        assert_eq!(err.to_string(), "Relation not found: emp");

        let err = SigFileError::RelationExists("emp".to_string());
        assert_eq!(err.to_string(), "Relation already exists: emp");

        let err = SigFileError::HeaderCorrupted("bad magic".to_string());
        assert_eq!(err.to_string(), "Relation header corrupted: bad magic");
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<u32> {
            Ok(7)
        }

        fn returns_err() -> Result<u32> {
            Err(SigFileError::Internal("test".to_string()))
        }

        assert!(returns_ok().is_ok());
        assert!(returns_err().is_err());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SigFileError>();
    }
}
