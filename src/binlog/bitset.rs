//! Fixed-capacity bit vector used for the used/null/nullable column flags.
//!
//! Bit `i` lives in byte `i / 8` at position `i % 8`, least significant bit
//! first, which is the order the binlog writes column flags in.

use bytes::Buf;
use serde::{Serialize, Serializer};
use std::fmt;

use super::codec::ensure_remaining;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bitset {
    bytes: Vec<u8>,
    capacity: usize,
}

/// Number of bytes needed to hold `bits` bits.
pub fn byte_len(bits: usize) -> usize {
    (bits + 7) / 8
}

impl Bitset {
    /// Creates a zeroed bitset holding `capacity` bits.
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0; byte_len(capacity)],
            capacity,
        }
    }

    /// Builds a bitset from its wire bytes.
    ///
    /// Only the first `ceil(capacity / 8)` bytes are used; padding bits past
    /// `capacity` in the last byte are dropped.
    pub fn from_bytes(bytes: &[u8], capacity: usize) -> Result<Self> {
        let len = byte_len(capacity);
        if bytes.len() < len {
            return Err(Error::TruncatedRead {
                needed: len,
                available: bytes.len(),
            });
        }

        let mut set = Self {
            bytes: bytes[..len].to_vec(),
            capacity,
        };
        set.mask_padding();
        Ok(set)
    }

    /// Reads a `capacity`-bit bitset from an event body.
    pub fn read<B: Buf>(buf: &mut B, capacity: usize) -> Result<Self> {
        let len = byte_len(capacity);
        ensure_remaining(buf, len)?;

        let mut bytes = vec![0; len];
        buf.copy_to_slice(&mut bytes);

        let mut set = Self { bytes, capacity };
        set.mask_padding();
        Ok(set)
    }

    fn mask_padding(&mut self) {
        let used = self.capacity % 8;
        if used != 0 {
            if let Some(last) = self.bytes.last_mut() {
                *last &= (1u8 << used) - 1;
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns bit `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= capacity`.
    pub fn bit(&self, i: usize) -> bool {
        self.check_index(i);
        self.bytes[i / 8] & (1 << (i % 8)) != 0
    }

    pub fn set(&mut self, i: usize) {
        self.check_index(i);
        self.bytes[i / 8] |= 1 << (i % 8);
    }

    pub fn clear(&mut self, i: usize) {
        self.check_index(i);
        self.bytes[i / 8] &= !(1 << (i % 8));
    }

    pub fn clear_all(&mut self) {
        self.bytes.iter_mut().for_each(|b| *b = 0);
    }

    fn check_index(&self, i: usize) {
        assert!(
            i < self.capacity,
            "bit index {} out of range for bitset of capacity {}",
            i,
            self.capacity
        );
    }

    pub fn count_ones(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Indices of the set bits, in ascending order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.capacity).filter(move |&i| self.bit(i))
    }

    /// Copies bits `start..end` into a new bitset indexed from 0.
    pub fn sub_range(&self, start: usize, end: usize) -> Result<Bitset> {
        if end <= start || end > self.capacity {
            return Err(Error::InvalidBitRange { start, end });
        }

        let mut out = Bitset::new(end - start);
        for i in start..end {
            if self.bit(i) {
                out.set(i - start);
            }
        }
        Ok(out)
    }

    /// Bitwise AND of two bitsets of equal capacity.
    pub fn and(&self, other: &Bitset) -> Result<Bitset> {
        self.check_same_capacity(other)?;

        let bytes = self
            .bytes
            .iter()
            .zip(&other.bytes)
            .map(|(a, b)| a & b)
            .collect();
        Ok(Bitset {
            bytes,
            capacity: self.capacity,
        })
    }

    /// Bits set in `self` and clear in `other`.
    pub fn and_not(&self, other: &Bitset) -> Result<Bitset> {
        self.and(&other.complement())
    }

    /// Flips every bit within the capacity.
    pub fn complement(&self) -> Bitset {
        let mut out = Bitset {
            bytes: self.bytes.iter().map(|b| !b).collect(),
            capacity: self.capacity,
        };
        out.mask_padding();
        out
    }

    fn check_same_capacity(&self, other: &Bitset) -> Result<()> {
        if self.capacity != other.capacity {
            return Err(Error::BitsetCapacityMismatch {
                left: self.capacity,
                right: other.capacity,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Bitset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.capacity {
            f.write_str(if self.bit(i) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl Serialize for Bitset {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
