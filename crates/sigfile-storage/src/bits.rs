//! Fixed-width bit strings.
//!
//! Bit `i` lives in byte `i / 8` under mask `1 << (i % 8)`. Widths are
//! always whole bytes, so a `Bits` value is stored on a page verbatim.

use sigfile_common::{Result, SigFileError};

/// A fixed-width bit string.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Bits {
    nbits: usize,
    bytes: Vec<u8>,
}

impl Bits {
    /// Creates an all-zero bit string of `nbits` bits.
    ///
    /// `nbits` is rounded up to a whole number of bytes.
    pub fn new(nbits: usize) -> Self {
        let nbytes = nbits.div_ceil(8);
        Self {
            nbits: nbytes * 8,
            bytes: vec![0u8; nbytes],
        }
    }

    /// Wraps raw bytes as a bit string of `bytes.len() * 8` bits.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            nbits: bytes.len() * 8,
            bytes: bytes.to_vec(),
        }
    }

    /// Returns the width in bits.
    pub fn len(&self) -> usize {
        self.nbits
    }

    /// Returns true for a zero-width bit string.
    pub fn is_empty(&self) -> bool {
        self.nbits == 0
    }

    /// Returns the storage bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the width in bytes.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if bit `pos` is set. Positions past the end read as 0.
    #[inline]
    pub fn get(&self, pos: usize) -> bool {
        pos < self.nbits && self.bytes[pos / 8] & (1u8 << (pos % 8)) != 0
    }

    /// Sets bit `pos`.
    #[inline]
    pub fn set(&mut self, pos: usize) -> Result<()> {
        if pos >= self.nbits {
            return Err(SigFileError::Internal(format!(
                "bit {} outside {}-bit string",
                pos, self.nbits
            )));
        }
        self.bytes[pos / 8] |= 1u8 << (pos % 8);
        Ok(())
    }

    /// Clears bit `pos`.
    pub fn clear(&mut self, pos: usize) -> Result<()> {
        if pos >= self.nbits {
            return Err(SigFileError::Internal(format!(
                "bit {} outside {}-bit string",
                pos, self.nbits
            )));
        }
        self.bytes[pos / 8] &= !(1u8 << (pos % 8));
        Ok(())
    }

    fn check_width(&self, other: &Bits) -> Result<()> {
        if self.nbits != other.nbits {
            return Err(SigFileError::SignatureWidthMismatch {
                expected: self.nbits,
                actual: other.nbits,
            });
        }
        Ok(())
    }

    /// ORs `other` into `self`.
    pub fn or_with(&mut self, other: &Bits) -> Result<()> {
        self.check_width(other)?;
        for (dst, src) in self.bytes.iter_mut().zip(&other.bytes) {
            *dst |= *src;
        }
        Ok(())
    }

    /// ANDs `other` into `self`.
    pub fn and_with(&mut self, other: &Bits) -> Result<()> {
        self.check_width(other)?;
        for (dst, src) in self.bytes.iter_mut().zip(&other.bytes) {
            *dst &= *src;
        }
        Ok(())
    }

    /// Returns true if every bit set in `self` is also set in `other`.
    pub fn is_subset_of(&self, other: &Bits) -> Result<bool> {
        self.check_width(other)?;
        Ok(self
            .bytes
            .iter()
            .zip(&other.bytes)
            .all(|(a, b)| a & !b == 0))
    }

    /// Returns the number of set bits.
    pub fn count_ones(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Iterates the positions of set bits in ascending order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.bytes
            .iter()
            .enumerate()
            .filter(|&(_, &byte)| byte != 0)
            .flat_map(|(i, &byte)| {
                (0..8)
                    .filter(move |bit| byte & (1u8 << *bit) != 0)
                    .map(move |bit| i * 8 + bit)
            })
    }
}

impl std::fmt::Debug for Bits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Bits({})", self)
    }
}

/// Renders the most significant bit first.
impl std::fmt::Display for Bits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for pos in (0..self.nbits).rev() {
            f.write_str(if self.get(pos) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_rounds_to_bytes() {
        let bits = Bits::new(13);
        assert_eq!(bits.len(), 16);
        assert_eq!(bits.byte_len(), 2);
        assert_eq!(bits.count_ones(), 0);
        assert!(Bits::new(0).is_empty());
    }

    #[test]
    fn test_set_get_clear() {
        let mut bits = Bits::new(16);
        bits.set(0).unwrap();
        bits.set(9).unwrap();
        bits.set(15).unwrap();
        assert!(bits.get(0));
        assert!(bits.get(9));
        assert!(bits.get(15));
        assert!(!bits.get(1));
        assert_eq!(bits.as_bytes(), &[0b0000_0001, 0b1000_0010]);

        bits.clear(9).unwrap();
        assert!(!bits.get(9));
        assert_eq!(bits.count_ones(), 2);
    }

    #[test]
    fn test_out_of_range() {
        let mut bits = Bits::new(8);
        assert!(bits.set(8).is_err());
        assert!(bits.clear(8).is_err());
        assert!(!bits.get(100));
    }

    #[test]
    fn test_or_and() {
        let mut a = Bits::from_bytes(&[0b1010_0000]);
        let b = Bits::from_bytes(&[0b0000_0101]);
        a.or_with(&b).unwrap();
        assert_eq!(a.as_bytes(), &[0b1010_0101]);

        a.and_with(&Bits::from_bytes(&[0b1000_0001])).unwrap();
        assert_eq!(a.as_bytes(), &[0b1000_0001]);
    }

    #[test]
    fn test_width_mismatch() {
        let mut a = Bits::new(8);
        let b = Bits::new(16);
        assert!(matches!(
            a.or_with(&b),
            Err(SigFileError::SignatureWidthMismatch {
                expected: 8,
                actual: 16
            })
        ));
        assert!(a.is_subset_of(&b).is_err());
    }

    #[test]
    fn test_subset() {
        let small = Bits::from_bytes(&[0b0000_0110]);
        let large = Bits::from_bytes(&[0b0100_0111]);
        assert!(small.is_subset_of(&large).unwrap());
        assert!(!large.is_subset_of(&small).unwrap());
    }

    #[test]
    fn test_iter_ones() {
        let mut bits = Bits::new(24);
        for pos in [1, 7, 8, 23] {
            bits.set(pos).unwrap();
        }
        assert_eq!(bits.iter_ones().collect::<Vec<_>>(), vec![1, 7, 8, 23]);
    }

    #[test]
    fn test_display_msb_first() {
        let mut bits = Bits::new(8);
        bits.set(0).unwrap();
        bits.set(6).unwrap();
        assert_eq!(bits.to_string(), "01000001");
    }

    proptest! {
        #[test]
        fn or_is_commutative(a in proptest::collection::vec(any::<u8>(), 4), b in proptest::collection::vec(any::<u8>(), 4)) {
            let mut ab = Bits::from_bytes(&a);
            ab.or_with(&Bits::from_bytes(&b)).unwrap();
            let mut ba = Bits::from_bytes(&b);
            ba.or_with(&Bits::from_bytes(&a)).unwrap();
            prop_assert_eq!(ab, ba);
        }

        #[test]
        fn or_is_idempotent(a in proptest::collection::vec(any::<u8>(), 1..16)) {
            let once = Bits::from_bytes(&a);
            let mut twice = once.clone();
            twice.or_with(&once).unwrap();
            prop_assert_eq!(twice, once);
        }

        #[test]
        fn operands_are_subsets_of_or(a in proptest::collection::vec(any::<u8>(), 8), b in proptest::collection::vec(any::<u8>(), 8)) {
            let x = Bits::from_bytes(&a);
            let y = Bits::from_bytes(&b);
            let mut union = x.clone();
            union.or_with(&y).unwrap();
            prop_assert!(x.is_subset_of(&union).unwrap());
            prop_assert!(y.is_subset_of(&union).unwrap());
        }

        #[test]
        fn iter_ones_matches_count(a in proptest::collection::vec(any::<u8>(), 0..32)) {
            let bits = Bits::from_bytes(&a);
            let ones: Vec<usize> = bits.iter_ones().collect();
            prop_assert_eq!(ones.len(), bits.count_ones());
            prop_assert!(ones.iter().all(|&pos| bits.get(pos)));
        }
    }
}
