//! Superimposed-coding signatures for tuples and pages.
//!
//! Each attribute value is hashed into a codeword: `k` distinct bit
//! positions drawn from successive seeded xxh3 hashes of the value. A
//! signature is the OR of its attributes' codewords.
//!
//! - Simple coding: every codeword spans the whole signature and sets
//!   `bits_per_attr` bits.
//! - Concatenated coding: the signature is cut into one span per attribute
//!   (the first attribute takes the remainder) and each attribute only
//!   sets bits inside its own span.
//!
//! Tuple and page signatures are derived independently using different
//! hash salts, so a page signature is never a widened tuple signature.

use crate::bits::Bits;
use crate::tuple::Tuple;
use sigfile_common::config::SigScheme;
use sigfile_common::Result;
use xxhash_rust::xxh3::xxh3_64_with_seed;

/// Salt for tuple signature codewords.
const TUPLE_SALT: u64 = 0x7473_6967_0000_0000;

/// Salt for page signature codewords.
const PAGE_SALT: u64 = 0x7073_6967_0000_0000;

/// Attribute value that contributes no bits (unknown in a query).
pub const WILDCARD: &[u8] = b"?";

/// Derives tuple and page signatures for one relation.
#[derive(Debug, Clone)]
pub struct SignatureCodec {
    nattrs: usize,
    scheme: SigScheme,
    tm: usize,
    pm: usize,
    tuples_per_page: usize,
}

impl SignatureCodec {
    /// Creates a codec for `nattrs`-attribute tuples with signature widths
    /// `tm` and `pm` bits.
    pub fn new(
        nattrs: u32,
        scheme: SigScheme,
        tm: u32,
        pm: u32,
        tuples_per_page: usize,
    ) -> Self {
        Self {
            nattrs: nattrs as usize,
            scheme,
            tm: tm as usize,
            pm: pm as usize,
            tuples_per_page: tuples_per_page.max(1),
        }
    }

    /// Builds the `tm`-bit signature of a tuple.
    pub fn tuple_signature(&self, tuple: &Tuple) -> Result<Bits> {
        self.build(tuple, self.tm, TUPLE_SALT, |span| span / 2)
    }

    /// Builds the `pm`-bit page signature contribution of a tuple.
    pub fn page_signature(&self, tuple: &Tuple) -> Result<Bits> {
        let per_page = self.tuples_per_page;
        self.build(tuple, self.pm, PAGE_SALT, move |span| span / (2 * per_page))
    }

    /// Superimposes every attribute's codeword into a `width`-bit string.
    ///
    /// `concat_bits` gives the bits set per attribute for a concatenated
    /// span of the given size.
    fn build(
        &self,
        tuple: &Tuple,
        width: usize,
        salt: u64,
        concat_bits: impl Fn(usize) -> usize,
    ) -> Result<Bits> {
        let mut sig = Bits::new(width);

        match self.scheme {
            SigScheme::Simple { bits_per_attr } => {
                for attr in tuple.attributes().take(self.nattrs) {
                    superimpose(&mut sig, attr, 0, width, bits_per_attr as usize, salt)?;
                }
            }
            SigScheme::Concatenated => {
                let spans = concatenated_spans(width, self.nattrs);
                for (attr, (offset, span)) in tuple.attributes().take(self.nattrs).zip(spans) {
                    let k = concat_bits(span).max(1);
                    superimpose(&mut sig, attr, offset, span, k, salt)?;
                }
            }
        }

        Ok(sig)
    }
}

/// Returns (offset, len) of each attribute's span under concatenated coding.
///
/// Spans are `width / nattrs` bits; the first absorbs the remainder.
pub fn concatenated_spans(width: usize, nattrs: usize) -> Vec<(usize, usize)> {
    if nattrs == 0 {
        return Vec::new();
    }
    let span = width / nattrs;
    let first = width - span * (nattrs - 1);

    let mut spans = Vec::with_capacity(nattrs);
    spans.push((0, first));
    for i in 1..nattrs {
        spans.push((first + (i - 1) * span, span));
    }
    spans
}

/// Sets `k` distinct hashed bits of `attr` within `sig[offset..offset + span]`.
fn superimpose(
    sig: &mut Bits,
    attr: &[u8],
    offset: usize,
    span: usize,
    k: usize,
    salt: u64,
) -> Result<()> {
    if attr == WILDCARD || span == 0 {
        return Ok(());
    }

    let k = k.min(span);
    let mut codeword = Bits::new(span);
    let mut set = 0;
    let mut round = 0u64;
    while set < k {
        let pos = (xxh3_64_with_seed(attr, salt.wrapping_add(round)) % span as u64) as usize;
        round += 1;
        if !codeword.get(pos) {
            codeword.set(pos)?;
            sig.set(offset + pos)?;
            set += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuple(values: &[&str]) -> Tuple {
        Tuple::from_values(values, crate::tuple::tuple_size(values.len() as u32)).unwrap()
    }

    fn simple(tk: u32) -> SigScheme {
        SigScheme::Simple { bits_per_attr: tk }
    }

    #[test]
    fn test_simple_widths() {
        let codec = SignatureCodec::new(3, simple(4), 64, 256, 10);
        let t = tuple(&["1000001", "alice", "a3-001"]);
        let tsig = codec.tuple_signature(&t).unwrap();
        let psig = codec.page_signature(&t).unwrap();
        assert_eq!(tsig.len(), 64);
        assert_eq!(psig.len(), 256);
    }

    #[test]
    fn test_simple_bit_counts() {
        let codec = SignatureCodec::new(3, simple(4), 512, 512, 10);
        let t = tuple(&["1000001", "alice", "a3-001"]);
        let tsig = codec.tuple_signature(&t).unwrap();
        // three codewords of 4 bits each, possibly overlapping
        assert!(tsig.count_ones() >= 4);
        assert!(tsig.count_ones() <= 12);
    }

    #[test]
    fn test_deterministic() {
        let codec = SignatureCodec::new(2, simple(3), 64, 128, 10);
        let t = tuple(&["42", "bob"]);
        assert_eq!(
            codec.tuple_signature(&t).unwrap(),
            codec.tuple_signature(&t).unwrap()
        );
        assert_eq!(
            codec.page_signature(&t).unwrap(),
            codec.page_signature(&t).unwrap()
        );
    }

    #[test]
    fn test_tuple_and_page_signatures_independent() {
        let codec = SignatureCodec::new(2, simple(6), 128, 128, 10);
        let t = tuple(&["42", "bob"]);
        assert_ne!(
            codec.tuple_signature(&t).unwrap(),
            codec.page_signature(&t).unwrap()
        );
    }

    #[test]
    fn test_different_values_differ() {
        let codec = SignatureCodec::new(2, simple(6), 256, 256, 10);
        let a = codec.tuple_signature(&tuple(&["1", "alice"])).unwrap();
        let b = codec.tuple_signature(&tuple(&["2", "bob"])).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wildcard_contributes_nothing() {
        let codec = SignatureCodec::new(2, simple(4), 64, 64, 10);
        let full = codec.tuple_signature(&tuple(&["1", "alice"])).unwrap();
        let partial = codec.tuple_signature(&tuple(&["?", "alice"])).unwrap();
        let empty = codec.tuple_signature(&tuple(&["?", "?"])).unwrap();

        assert_eq!(empty.count_ones(), 0);
        assert!(partial.is_subset_of(&full).unwrap());
    }

    #[test]
    fn test_k_clamped_to_width() {
        let codec = SignatureCodec::new(2, simple(100), 8, 8, 1);
        let sig = codec.tuple_signature(&tuple(&["a", "b"])).unwrap();
        assert_eq!(sig.count_ones(), 8);
    }

    #[test]
    fn test_concatenated_spans() {
        assert_eq!(concatenated_spans(16, 3), vec![(0, 6), (6, 5), (11, 5)]);
        assert_eq!(concatenated_spans(64, 4), vec![(0, 16), (16, 16), (32, 16), (48, 16)]);
        assert!(concatenated_spans(8, 0).is_empty());
    }

    #[test]
    fn test_concatenated_bits_stay_in_span() {
        let codec = SignatureCodec::new(2, SigScheme::Concatenated, 64, 64, 4);
        let only_first = codec.tuple_signature(&tuple(&["1000001", "?"])).unwrap();
        let only_second = codec.tuple_signature(&tuple(&["?", "alice"])).unwrap();

        assert!(only_first.iter_ones().all(|pos| pos < 32));
        assert!(only_second.iter_ones().all(|pos| pos >= 32));
        // half of a 32-bit span
        assert_eq!(only_first.count_ones(), 16);
        assert_eq!(only_second.count_ones(), 16);
    }

    #[test]
    fn test_concatenated_page_density() {
        let codec = SignatureCodec::new(2, SigScheme::Concatenated, 64, 128, 4);
        let psig = codec.page_signature(&tuple(&["1000001", "alice"])).unwrap();
        // 64-bit spans, 64 / (2 * 4) = 8 bits each
        assert_eq!(psig.count_ones(), 16);
    }
}
