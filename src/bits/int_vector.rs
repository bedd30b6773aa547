//! Fixed-width bit-packed integer vector.
//!
//! Values are packed LSB-first into 64-bit words, each using `width` bits,
//! where `width` is the bit length of the largest value. A value may straddle
//! two words.

use crate::error::{Error, Result};
use crate::storage::{Backing, Table};
use crate::utils::encoding::{write_u32_le, write_u64_le};
use std::io::{self, Write};

/// Bit-packed unsigned integers over a backing table.
pub struct IntVector {
    words: Table,
    width: u32,
    len: usize,
}

impl std::fmt::Debug for IntVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntVector")
            .field("len", &self.len)
            .field("width", &self.width)
            .finish()
    }
}

impl IntVector {
    /// Pack `values` using the smallest width that fits the maximum.
    pub fn from_slice(values: &[u64]) -> Self {
        let max = values.iter().copied().max().unwrap_or(0);
        let width = 64 - max.leading_zeros();
        let mut words = vec![0u64; Self::word_count(values.len(), width)];

        if width > 0 {
            for (i, &value) in values.iter().enumerate() {
                let bit = i * width as usize;
                let (word, offset) = (bit / 64, bit % 64);
                words[word] |= value << offset;
                if offset + width as usize > 64 {
                    words[word + 1] |= value >> (64 - offset);
                }
            }
        }

        Self {
            words: Box::new(words),
            width,
            len: values.len(),
        }
    }

    /// Reconstruct a vector from stored words, checking the shape only.
    pub fn from_parts(words: Table, width: u32, len: usize) -> Result<Self> {
        if width > 64 {
            return Err(Error::corruption(format!("int vector width {} exceeds 64", width)));
        }
        let expected = len
            .checked_mul(width as usize)
            .map(|bits| bits.div_ceil(64));
        if expected != Some(words.len()) {
            return Err(Error::corruption(format!(
                "int vector of {} x {} bits needs {:?} words, found {}",
                len,
                width,
                expected,
                words.len()
            )));
        }
        Ok(Self { words, width, len })
    }

    /// Number of words needed for `len` values of `width` bits.
    pub fn word_count(len: usize, width: u32) -> usize {
        (len * width as usize).div_ceil(64)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bits per value.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Value at `index`. Panics if `index >= len()`.
    #[inline]
    pub fn get(&self, index: usize) -> u64 {
        assert!(index < self.len, "index {} out of {}", index, self.len);
        if self.width == 0 {
            return 0;
        }
        let width = self.width as usize;
        let bit = index * width;
        let (word, offset) = (bit / 64, bit % 64);
        let mut value = self.words.get(word) >> offset;
        if offset + width > 64 {
            value |= self.words.get(word + 1) << (64 - offset);
        }
        if width == 64 {
            value
        } else {
            value & ((1u64 << width) - 1)
        }
    }

    /// Packed words.
    pub fn words(&self) -> &dyn Backing {
        self.words.as_ref()
    }

    /// Bytes used by the packed words.
    pub fn size_in_bytes(&self) -> usize {
        self.words.size_in_bytes()
    }

    /// Write `len`, `width`, a reserved u32 and the packed words, little-endian.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_u64_le(writer, self.len as u64)?;
        write_u32_le(writer, self.width)?;
        write_u32_le(writer, 0)?;
        for i in 0..self.words.len() {
            write_u64_le(writer, self.words.get(i))?;
        }
        Ok(())
    }

    /// Size in bytes of [`write_to`](Self::write_to) output.
    pub fn encoded_len(&self) -> usize {
        16 + self.words.len() * 8
    }
}
