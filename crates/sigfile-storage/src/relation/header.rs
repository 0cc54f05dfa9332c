//! Relation configuration, statistics, and their `.info` record.

use super::constants::{
    INFO_MAGIC, INFO_RECORD_SIZE, INFO_STATS_OFFSET, INFO_VERSION, MIN_INDEX_ITEMS_PER_PAGE,
    MIN_ITEMS_PER_PAGE,
};
use crate::tuple::tuple_size;
use sigfile_common::config::{RelationConfig, SigScheme};
use sigfile_common::page::{items_per_page, PAGE_HEADER_SIZE};
use sigfile_common::{Result, SigFileError};

/// Item and page counts of one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexCounts {
    /// Number of items stored.
    pub items: u32,
    /// Number of pages in the file.
    pub pages: u32,
}

/// Immutable parameters of a relation, fixed at creation.
///
/// All bit widths are multiples of 8.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelationParams {
    /// Page size of every paged file.
    pub page_size: u32,
    /// Attributes per tuple.
    pub nattrs: u32,
    /// Target false-match probability.
    pub false_match_rate: f32,
    /// Signature coding scheme.
    pub scheme: SigScheme,
    /// Tuple signature width in bits.
    pub tm: u32,
    /// Page signature width in bits.
    pub pm: u32,
    /// Bit-slice width in bits (maximum data pages).
    pub bm: u32,
    /// Tuple width in bytes.
    pub tuple_size: u32,
}

impl RelationParams {
    /// Derives and validates parameters for a new relation.
    ///
    /// Bit widths are rounded up to whole bytes before any capacity is
    /// derived.
    pub fn from_config(config: &RelationConfig, page_size: usize) -> Result<Self> {
        let config = config.byte_aligned()?;

        if config.nattrs < 2 {
            return Err(invalid("nattrs", config.nattrs));
        }
        if !(config.false_match_rate > 0.0 && config.false_match_rate < 1.0) {
            return Err(invalid("false_match_rate", config.false_match_rate));
        }
        for (name, bits) in [("tm", config.tm), ("pm", config.pm), ("bm", config.bm)] {
            if bits == 0 {
                return Err(invalid(name, bits));
            }
        }
        match config.scheme {
            SigScheme::Simple { bits_per_attr: 0 } => {
                return Err(invalid("bits_per_attr", 0));
            }
            SigScheme::Concatenated if config.tm < config.nattrs || config.pm < config.nattrs => {
                return Err(SigFileError::ConfigError(format!(
                    "concatenated signatures need at least {} bits",
                    config.nattrs
                )));
            }
            _ => {}
        }
        let page_size_u32 = u32::try_from(page_size)
            .ok()
            .filter(|&size| size as usize > PAGE_HEADER_SIZE)
            .ok_or_else(|| invalid("page_size", page_size))?;

        let params = Self {
            page_size: page_size_u32,
            nattrs: config.nattrs,
            false_match_rate: config.false_match_rate,
            scheme: config.scheme,
            tm: config.tm,
            pm: config.pm,
            bm: config.bm,
            tuple_size: tuple_size(config.nattrs) as u32,
        };

        check_capacity("data", params.tuples_per_page(), MIN_ITEMS_PER_PAGE)?;
        check_capacity("tsig", params.tsigs_per_page(), MIN_ITEMS_PER_PAGE)?;
        check_capacity("psig", params.psigs_per_page(), MIN_INDEX_ITEMS_PER_PAGE)?;
        check_capacity("bsig", params.bsigs_per_page(), MIN_INDEX_ITEMS_PER_PAGE)?;

        Ok(params)
    }

    fn per_page(&self, width: u32) -> usize {
        items_per_page(self.page_size as usize, width as usize)
    }

    /// Tuples per data page.
    pub fn tuples_per_page(&self) -> usize {
        self.per_page(self.tuple_size)
    }

    /// Tuple signatures per page.
    pub fn tsigs_per_page(&self) -> usize {
        self.per_page(self.tm / 8)
    }

    /// Page signatures per page.
    pub fn psigs_per_page(&self) -> usize {
        self.per_page(self.pm / 8)
    }

    /// Bit-slice rows per page.
    pub fn bsigs_per_page(&self) -> usize {
        self.per_page(self.bm / 8)
    }

    /// Bits per attribute under simple coding (0 for concatenated).
    pub fn tk(&self) -> u32 {
        self.scheme.bits_per_attr()
    }
}

fn invalid(name: &str, value: impl std::fmt::Display) -> SigFileError {
    SigFileError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
    }
}

fn check_capacity(index: &'static str, capacity: usize, min: usize) -> Result<()> {
    if capacity < min {
        return Err(SigFileError::CapacityTooSmall {
            index,
            capacity,
            min,
        });
    }
    Ok(())
}

/// Mutable counters of a relation, one pair per paged file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelationStats {
    /// Tuples and data pages.
    pub data: IndexCounts,
    /// Tuple signatures and their pages.
    pub tsigs: IndexCounts,
    /// Page signatures and their pages.
    pub psigs: IndexCounts,
    /// Bit-slice rows and their pages.
    pub bsigs: IndexCounts,
}

impl RelationStats {
    /// Number of tuples stored.
    pub fn ntuples(&self) -> u32 {
        self.data.items
    }

    /// Number of data pages.
    pub fn npages(&self) -> u32 {
        self.data.pages
    }
}

/// The `.info` record: parameters plus statistics.
///
/// Layout (72 bytes, little-endian):
/// - magic: 4 bytes (`SIGF`)
/// - version: 2 bytes
/// - scheme tag: 1 byte (`c` or `s`)
/// - reserved: 1 byte
/// - page_size, nattrs, false_match_rate (f32 bits), tk, tm, pm, bm,
///   tuple_size: 4 bytes each
/// - tuples, data pages, tsigs, tsig pages, psigs, psig pages, bsigs,
///   bsig pages: 4 bytes each
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelationHeader {
    /// Immutable parameters.
    pub params: RelationParams,
    /// Counters at the time of writing.
    pub stats: RelationStats,
}

impl RelationHeader {
    /// Size of the header record in bytes.
    pub const SIZE: usize = INFO_RECORD_SIZE;

    /// Serializes the header to bytes.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let p = &self.params;
        let s = &self.stats;

        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&INFO_MAGIC);
        buf[4..6].copy_from_slice(&INFO_VERSION.to_le_bytes());
        buf[6] = p.scheme.tag();
        // byte 7 is reserved (already zeroed)

        let words = [
            p.page_size,
            p.nattrs,
            p.false_match_rate.to_bits(),
            p.tk(),
            p.tm,
            p.pm,
            p.bm,
            p.tuple_size,
            s.data.items,
            s.data.pages,
            s.tsigs.items,
            s.tsigs.pages,
            s.psigs.items,
            s.psigs.pages,
            s.bsigs.items,
            s.bsigs.pages,
        ];
        for (i, word) in words.iter().enumerate() {
            let offset = 8 + i * 4;
            buf[offset..offset + 4].copy_from_slice(&word.to_le_bytes());
        }
        buf
    }

    /// Deserializes the header from bytes.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() != Self::SIZE {
            return Err(SigFileError::HeaderCorrupted(format!(
                "expected {} bytes, found {}",
                Self::SIZE,
                buf.len()
            )));
        }
        if buf[0..4] != INFO_MAGIC {
            return Err(SigFileError::HeaderCorrupted("bad magic".to_string()));
        }
        let version = u16::from_le_bytes([buf[4], buf[5]]);
        if version != INFO_VERSION {
            return Err(SigFileError::HeaderCorrupted(format!(
                "unsupported version {}",
                version
            )));
        }

        let word = |i: usize| {
            let offset = 8 + i * 4;
            u32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
        };
        let scheme = SigScheme::from_tag(buf[6], word(3)).ok_or_else(|| {
            SigFileError::HeaderCorrupted(format!("unknown scheme tag {:#04x}", buf[6]))
        })?;
        let counts = |i: usize| IndexCounts {
            items: word(i),
            pages: word(i + 1),
        };
        let first_stat = (INFO_STATS_OFFSET - 8) / 4;

        let params = RelationParams {
            page_size: word(0),
            nattrs: word(1),
            false_match_rate: f32::from_bits(word(2)),
            scheme,
            tm: word(4),
            pm: word(5),
            bm: word(6),
            tuple_size: word(7),
        };
        if params.page_size as usize <= PAGE_HEADER_SIZE {
            return Err(SigFileError::HeaderCorrupted(format!(
                "page size {} too small",
                params.page_size
            )));
        }
        for (name, bits) in [("tm", params.tm), ("pm", params.pm), ("bm", params.bm)] {
            if bits % 8 != 0 {
                return Err(SigFileError::HeaderCorrupted(format!(
                    "{} of {} bits is not byte aligned",
                    name, bits
                )));
            }
        }
        // every file must address at least one item per page
        for (index, capacity) in [
            ("data", params.tuples_per_page()),
            ("tsig", params.tsigs_per_page()),
            ("psig", params.psigs_per_page()),
            ("bsig", params.bsigs_per_page()),
        ] {
            if capacity == 0 {
                return Err(SigFileError::HeaderCorrupted(format!(
                    "{} holds no items per page",
                    index
                )));
            }
        }

        Ok(Self {
            params,
            stats: RelationStats {
                data: counts(first_stat),
                tsigs: counts(first_stat + 2),
                psigs: counts(first_stat + 4),
                bsigs: counts(first_stat + 6),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigfile_common::DEFAULT_PAGE_SIZE;

    fn config(tm: u32, pm: u32, bm: u32) -> RelationConfig {
        RelationConfig {
            nattrs: 3,
            false_match_rate: 0.01,
            scheme: SigScheme::Simple { bits_per_attr: 4 },
            tm,
            pm,
            bm,
        }
    }

    #[test]
    fn test_params_round_widths() {
        let params = RelationParams::from_config(&config(13, 60, 30), DEFAULT_PAGE_SIZE).unwrap();
        assert_eq!(params.tm, 16);
        assert_eq!(params.pm, 64);
        assert_eq!(params.bm, 32);
        assert_eq!(params.tuple_size, 35);
    }

    #[test]
    fn test_params_capacities() {
        let params = RelationParams::from_config(&config(16, 64, 32), 1024).unwrap();
        assert_eq!(params.tuples_per_page(), 1020 / 35);
        assert_eq!(params.tsigs_per_page(), 1020 / 2);
        assert_eq!(params.psigs_per_page(), 1020 / 8);
        assert_eq!(params.bsigs_per_page(), 1020 / 4);
    }

    #[test]
    fn test_params_reject_coarse_psig() {
        // 4096-bit page signatures: (1024 - 4) / 512 = 1 per page
        let err = RelationParams::from_config(&config(16, 4096, 32), 1024).unwrap_err();
        assert!(matches!(
            err,
            SigFileError::CapacityTooSmall {
                index: "psig",
                capacity: 1,
                min: 2
            }
        ));
    }

    #[test]
    fn test_params_reject_coarse_bsig() {
        // (1024 - 4) / 1000 = 1 row per page
        let err = RelationParams::from_config(&config(16, 64, 8000), 1024).unwrap_err();
        assert!(matches!(
            err,
            SigFileError::CapacityTooSmall { index: "bsig", capacity: 1, .. }
        ));

        // rows wider than the page
        let err = RelationParams::from_config(&config(16, 64, 9000), 1024).unwrap_err();
        assert!(matches!(
            err,
            SigFileError::CapacityTooSmall { index: "bsig", capacity: 0, .. }
        ));
    }

    #[test]
    fn test_params_reject_bad_values() {
        let mut bad = config(16, 64, 32);
        bad.nattrs = 1;
        assert!(RelationParams::from_config(&bad, 1024).unwrap_err().is_config_error());

        let mut bad = config(16, 64, 32);
        bad.false_match_rate = 1.5;
        assert!(RelationParams::from_config(&bad, 1024).unwrap_err().is_config_error());

        assert!(RelationParams::from_config(&config(0, 64, 32), 1024)
            .unwrap_err()
            .is_config_error());

        let mut bad = config(16, 64, 32);
        bad.scheme = SigScheme::Simple { bits_per_attr: 0 };
        assert!(RelationParams::from_config(&bad, 1024).unwrap_err().is_config_error());

        assert!(RelationParams::from_config(&config(16, 64, 32), 4)
            .unwrap_err()
            .is_config_error());
    }

    #[test]
    fn test_params_concatenated_needs_span_per_attr() {
        let mut cfg = config(8, 64, 32);
        cfg.nattrs = 10;
        cfg.scheme = SigScheme::Concatenated;
        assert!(matches!(
            RelationParams::from_config(&cfg, 1024),
            Err(SigFileError::ConfigError(_))
        ));
    }

    #[test]
    fn test_header_layout() {
        let params = RelationParams::from_config(&config(16, 64, 32), 1024).unwrap();
        let header = RelationHeader {
            params,
            stats: RelationStats::default(),
        };
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), 72);
        assert_eq!(&bytes[0..4], b"SIGF");
        assert_eq!(bytes[6], b's');
        assert_eq!(u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]), 1024);
    }

    #[test]
    fn test_header_roundtrip() {
        let params = RelationParams::from_config(&config(16, 64, 32), 1024).unwrap();
        let header = RelationHeader {
            params,
            stats: RelationStats {
                data: IndexCounts { items: 100, pages: 4 },
                tsigs: IndexCounts { items: 100, pages: 1 },
                psigs: IndexCounts { items: 4, pages: 1 },
                bsigs: IndexCounts { items: 64, pages: 1 },
            },
        };
        let decoded = RelationHeader::from_bytes(&header.to_bytes()).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(decoded.to_bytes(), header.to_bytes());
    }

    #[test]
    fn test_header_concatenated_roundtrip() {
        let mut cfg = config(16, 64, 32);
        cfg.scheme = SigScheme::Concatenated;
        let params = RelationParams::from_config(&cfg, 1024).unwrap();
        let header = RelationHeader {
            params,
            stats: RelationStats::default(),
        };
        let decoded = RelationHeader::from_bytes(&header.to_bytes()).unwrap();
        assert_eq!(decoded.params.scheme, SigScheme::Concatenated);
        assert_eq!(decoded.params.tk(), 0);
    }

    #[test]
    fn test_header_rejects_corruption() {
        let params = RelationParams::from_config(&config(16, 64, 32), 1024).unwrap();
        let bytes = RelationHeader {
            params,
            stats: RelationStats::default(),
        }
        .to_bytes();

        assert!(RelationHeader::from_bytes(&bytes[..40]).is_err());

        let mut bad_magic = bytes;
        bad_magic[0] = b'X';
        assert!(matches!(
            RelationHeader::from_bytes(&bad_magic),
            Err(SigFileError::HeaderCorrupted(_))
        ));

        let mut bad_scheme = bytes;
        bad_scheme[6] = b'q';
        assert!(RelationHeader::from_bytes(&bad_scheme).is_err());

        let mut bad_version = bytes;
        bad_version[4] = 9;
        assert!(RelationHeader::from_bytes(&bad_version).is_err());
    }

    #[test]
    fn test_header_rejects_zero_sizes() {
        let params = RelationParams::from_config(&config(16, 64, 32), 1024).unwrap();
        let bytes = RelationHeader {
            params,
            stats: RelationStats::default(),
        }
        .to_bytes();

        // page_size, tm, pm, bm, tuple_size
        for offset in [8, 24, 28, 32, 36] {
            let mut zeroed = bytes;
            zeroed[offset..offset + 4].copy_from_slice(&0u32.to_le_bytes());
            assert!(
                matches!(
                    RelationHeader::from_bytes(&zeroed),
                    Err(SigFileError::HeaderCorrupted(_))
                ),
                "offset {}",
                offset
            );
        }

        let mut tiny_page = bytes;
        tiny_page[8..12].copy_from_slice(&4u32.to_le_bytes());
        assert!(RelationHeader::from_bytes(&tiny_page).is_err());

        let mut unaligned = bytes;
        unaligned[24..28].copy_from_slice(&13u32.to_le_bytes());
        assert!(RelationHeader::from_bytes(&unaligned).is_err());

        // tuples wider than a page
        let mut wide = bytes;
        wide[36..40].copy_from_slice(&2048u32.to_le_bytes());
        assert!(RelationHeader::from_bytes(&wide).is_err());
    }

    #[test]
    fn test_params_reject_unalignable_width() {
        let err = RelationParams::from_config(&config(u32::MAX, 64, 32), 1024).unwrap_err();
        assert!(err.is_config_error());
    }
}
