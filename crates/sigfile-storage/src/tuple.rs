//! Fixed-width tuple representation.
//!
//! A tuple is a run of `tuple_size(nattrs)` bytes holding its attribute
//! values separated by commas and right-padded with spaces:
//!
//! ```text
//! 1000001,Alice Smith         ,a3-001
//! ```

use bytes::Bytes;
use sigfile_common::{Result, SigFileError};

/// Width of a two-attribute tuple.
pub const TUPLE_BASE_SIZE: usize = 28;

/// Width added by each attribute after the second (separator included).
pub const TUPLE_ATTR_SIZE: usize = 7;

/// Attribute separator.
pub const ATTR_SEPARATOR: u8 = b',';

/// Padding byte after the last attribute.
const PADDING: u8 = b' ';

/// Returns the byte width of a tuple with `nattrs` attributes.
pub fn tuple_size(nattrs: u32) -> usize {
    TUPLE_BASE_SIZE + TUPLE_ATTR_SIZE * (nattrs as usize).saturating_sub(2)
}

/// A tuple (row) stored in a relation's data file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    data: Bytes,
}

impl Tuple {
    /// Wraps already-encoded tuple bytes.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Encodes attribute values into a tuple of exactly `width` bytes.
    pub fn from_values<S: AsRef<str>>(values: &[S], width: usize) -> Result<Self> {
        let mut data = Vec::with_capacity(width);
        for (i, value) in values.iter().enumerate() {
            let value = value.as_ref().as_bytes();
            if value.contains(&ATTR_SEPARATOR) {
                return Err(SigFileError::InvalidTuple(format!(
                    "attribute {} contains a separator",
                    i
                )));
            }
            if i > 0 {
                data.push(ATTR_SEPARATOR);
            }
            data.extend_from_slice(value);
        }

        if data.len() > width {
            return Err(SigFileError::TupleWidthMismatch {
                expected: width,
                actual: data.len(),
            });
        }
        data.resize(width, PADDING);

        Ok(Self {
            data: Bytes::from(data),
        })
    }

    /// Returns the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the encoded width.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true for a zero-width tuple.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterates attribute values with trailing padding removed.
    pub fn attributes(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.data
            .split(|&b| b == ATTR_SEPARATOR)
            .map(trim_padding)
    }

    /// Checks the tuple matches a relation's width and attribute count.
    pub fn validate(&self, nattrs: u32, width: usize) -> Result<()> {
        if self.data.len() != width {
            return Err(SigFileError::TupleWidthMismatch {
                expected: width,
                actual: self.data.len(),
            });
        }
        let count = self.attributes().count();
        if count != nattrs as usize {
            return Err(SigFileError::InvalidTuple(format!(
                "expected {} attributes, found {}",
                nattrs, count
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for Tuple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&String::from_utf8_lossy(trim_padding(&self.data)))
    }
}

fn trim_padding(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|&b| b != PADDING && b != 0)
        .map_or(0, |pos| pos + 1);
    &bytes[..end]
}
