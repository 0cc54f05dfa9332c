//! Configuration structures for signature-indexed relations.

use crate::error::{Result, SigFileError};
use crate::page::DEFAULT_PAGE_SIZE;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage configuration shared by every relation in a data directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the relation files.
    pub data_dir: PathBuf,
    /// Page size in bytes, used for every paged file of a new relation.
    pub page_size: usize,
    /// Enable fsync after page writes.
    pub fsync_enabled: bool,
    /// Upper bound on pages per file (None = unbounded).
    pub max_pages_per_file: Option<u32>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            page_size: DEFAULT_PAGE_SIZE,
            fsync_enabled: true,
            max_pages_per_file: None,
        }
    }
}

/// Superimposed-coding scheme used to build signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SigScheme {
    /// Each attribute owns a disjoint span of the signature.
    Concatenated,
    /// Each attribute sets `bits_per_attr` bits anywhere in the signature.
    Simple { bits_per_attr: u32 },
}

impl SigScheme {
    /// Returns the one-byte tag stored in the relation header.
    pub fn tag(&self) -> u8 {
        match self {
            SigScheme::Concatenated => b'c',
            SigScheme::Simple { .. } => b's',
        }
    }

    /// Rebuilds a scheme from its header tag and stored bits-per-attribute.
    pub fn from_tag(tag: u8, bits_per_attr: u32) -> Option<Self> {
        match tag {
            b'c' => Some(SigScheme::Concatenated),
            b's' => Some(SigScheme::Simple { bits_per_attr }),
            _ => None,
        }
    }

    /// Returns the bits-per-attribute parameter (0 for concatenated coding).
    pub fn bits_per_attr(&self) -> u32 {
        match self {
            SigScheme::Concatenated => 0,
            SigScheme::Simple { bits_per_attr } => *bits_per_attr,
        }
    }

    /// Short name used in reports.
    pub fn name(&self) -> &'static str {
        match self {
            SigScheme::Concatenated => "catc",
            SigScheme::Simple { .. } => "simc",
        }
    }
}

impl Default for SigScheme {
    fn default() -> Self {
        SigScheme::Simple { bits_per_attr: 10 }
    }
}

/// Parameters chosen when a relation is created.
///
/// Bit widths are given in bits and rounded up to whole bytes on creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelationConfig {
    /// Number of attributes per tuple.
    pub nattrs: u32,
    /// Target false-match probability guiding signature density.
    pub false_match_rate: f32,
    /// Signature coding scheme.
    pub scheme: SigScheme,
    /// Tuple signature width in bits.
    pub tm: u32,
    /// Page signature width in bits.
    pub pm: u32,
    /// Bit-slice width in bits; also the maximum number of data pages.
    pub bm: u32,
}

impl Default for RelationConfig {
    fn default() -> Self {
        Self {
            nattrs: 3,
            false_match_rate: 0.001,
            scheme: SigScheme::default(),
            tm: 48,
            pm: 1256,
            bm: 256,
        }
    }
}

impl RelationConfig {
    /// Sizes a simple-coding relation for a target false-match rate.
    ///
    /// `tuples_per_page` is the data page capacity the page signatures must
    /// absorb before they saturate.
    pub fn simple_sized(
        nattrs: u32,
        false_match_rate: f32,
        tuples_per_page: u32,
        bm: u32,
    ) -> Self {
        let k = optimal_bits_per_item(false_match_rate);
        Self {
            nattrs,
            false_match_rate,
            scheme: SigScheme::Simple { bits_per_attr: k },
            tm: optimal_width(nattrs, k),
            pm: optimal_width(nattrs.saturating_mul(tuples_per_page), k),
            bm,
        }
    }

    /// Sizes a concatenated-coding relation for a target false-match rate.
    pub fn concatenated_sized(
        nattrs: u32,
        false_match_rate: f32,
        tuples_per_page: u32,
        bm: u32,
    ) -> Self {
        let k = optimal_bits_per_item(false_match_rate);
        Self {
            nattrs,
            false_match_rate,
            scheme: SigScheme::Concatenated,
            tm: optimal_width(nattrs, k),
            pm: optimal_width(nattrs.saturating_mul(tuples_per_page), k),
            bm,
        }
    }

    /// Returns a copy with every bit width rounded up to a multiple of 8.
    ///
    /// Fails if a width has no multiple of 8 representable as `u32`.
    pub fn byte_aligned(&self) -> Result<Self> {
        let align = |name: &str, bits: u32| {
            round_up_to_byte(bits).ok_or_else(|| SigFileError::InvalidParameter {
                name: name.to_string(),
                value: bits.to_string(),
            })
        };
        Ok(Self {
            tm: align("tm", self.tm)?,
            pm: align("pm", self.pm)?,
            bm: align("bm", self.bm)?,
            ..*self
        })
    }
}

/// Rounds a bit count up to the next multiple of 8, or `None` on overflow.
pub fn round_up_to_byte(bits: u32) -> Option<u32> {
    match bits % 8 {
        0 => Some(bits),
        rem => bits.checked_add(8 - rem),
    }
}

/// Largest bit width that is a multiple of 8.
const MAX_ALIGNED_WIDTH: u32 = u32::MAX - 7;

/// Bits set per item minimising false matches: ln(1/p) / ln 2 = -log2(p).
fn optimal_bits_per_item(false_match_rate: f32) -> u32 {
    let p = f64::from(false_match_rate).clamp(f64::MIN_POSITIVE, 0.5);
    (-p.log2()).ceil().max(1.0) as u32
}

/// Signature width for `items` items at `k` bits each: n * k / ln 2.
fn optimal_width(items: u32, k: u32) -> u32 {
    let width = (f64::from(items) * f64::from(k) / std::f64::consts::LN_2).ceil();
    let width = width.clamp(8.0, f64::from(MAX_ALIGNED_WIDTH)) as u32;
    round_up_to_byte(width).unwrap_or(MAX_ALIGNED_WIDTH)
}
