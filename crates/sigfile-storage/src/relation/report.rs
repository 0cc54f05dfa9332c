//! Human-readable relation diagnostics.

use super::header::{RelationParams, RelationStats};
use sigfile_common::config::SigScheme;
use std::fmt;

/// Snapshot of a relation's parameters and counters.
///
/// Renders as:
///
/// ```text
/// Global Info:
/// Dynamic:
///   #items:  tuples: 100  tsigs: 100  psigs: 4  bsigs: 64
///   #pages:  tuples: 4  tsigs: 1  psigs: 1  bsigs: 1
/// Static:
///   tups   #attrs: 3  size: 35 bytes  max/page: 29
///   sigs   simc  bits/attr: 4
///   tsigs  size: 16 bits (2 bytes)  max/page: 510
///   psigs  size: 64 bits (8 bytes)  max/page: 127
///   bsigs  size: 32 bits (4 bytes)  max/page: 255
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelationReport {
    /// Parameters fixed at creation.
    pub params: RelationParams,
    /// Counters at the time of the snapshot.
    pub stats: RelationStats,
}

impl RelationReport {
    /// Creates a report from a parameter and counter snapshot.
    pub fn new(params: RelationParams, stats: RelationStats) -> Self {
        Self { params, stats }
    }
}

impl fmt::Display for RelationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.params;
        let s = &self.stats;

        writeln!(f, "Global Info:")?;
        writeln!(f, "Dynamic:")?;
        writeln!(
            f,
            "  #items:  tuples: {}  tsigs: {}  psigs: {}  bsigs: {}",
            s.data.items, s.tsigs.items, s.psigs.items, s.bsigs.items
        )?;
        writeln!(
            f,
            "  #pages:  tuples: {}  tsigs: {}  psigs: {}  bsigs: {}",
            s.data.pages, s.tsigs.pages, s.psigs.pages, s.bsigs.pages
        )?;
        writeln!(f, "Static:")?;
        writeln!(
            f,
            "  tups   #attrs: {}  size: {} bytes  max/page: {}",
            p.nattrs,
            p.tuple_size,
            p.tuples_per_page()
        )?;
        write!(f, "  sigs   {}", p.scheme.name())?;
        if let SigScheme::Simple { bits_per_attr } = p.scheme {
            write!(f, "  bits/attr: {}", bits_per_attr)?;
        }
        writeln!(f)?;

        for (label, bits, per_page) in [
            ("tsigs", p.tm, p.tsigs_per_page()),
            ("psigs", p.pm, p.psigs_per_page()),
            ("bsigs", p.bm, p.bsigs_per_page()),
        ] {
            writeln!(
                f,
                "  {}  size: {} bits ({} bytes)  max/page: {}",
                label,
                bits,
                bits / 8,
                per_page
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::IndexCounts;
    use sigfile_common::config::RelationConfig;

    fn params(scheme: SigScheme) -> RelationParams {
        let config = RelationConfig {
            nattrs: 3,
            false_match_rate: 0.01,
            scheme,
            tm: 16,
            pm: 64,
            bm: 32,
        };
        RelationParams::from_config(&config, 1024).unwrap()
    }

    #[test]
    fn test_report_simple() {
        let stats = RelationStats {
            data: IndexCounts { items: 100, pages: 4 },
            tsigs: IndexCounts { items: 100, pages: 1 },
            psigs: IndexCounts { items: 4, pages: 1 },
            bsigs: IndexCounts { items: 64, pages: 1 },
        };
        let text = RelationReport::new(params(SigScheme::Simple { bits_per_attr: 4 }), stats).to_string();
        let expected = "\
Global Info:
Dynamic:
  #items:  tuples: 100  tsigs: 100  psigs: 4  bsigs: 64
  #pages:  tuples: 4  tsigs: 1  psigs: 1  bsigs: 1
Static:
  tups   #attrs: 3  size: 35 bytes  max/page: 29
  sigs   simc  bits/attr: 4
  tsigs  size: 16 bits (2 bytes)  max/page: 510
  psigs  size: 64 bits (8 bytes)  max/page: 127
  bsigs  size: 32 bits (4 bytes)  max/page: 255
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_report_concatenated_omits_bits_per_attr() {
        let text = RelationReport::new(params(SigScheme::Concatenated), RelationStats::default()).to_string();
        assert!(text.contains("  sigs   catc\n"));
        assert!(!text.contains("bits/attr"));
    }
}
