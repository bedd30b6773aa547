//! Succinct bit vector with rank/select support.
//!
//! Uses an interleaved (blocked) layout so a rank query touches one block.
//!
//! # Layout
//!
//! Each 512-bit block is stored as 10 x 64-bit words:
//! - Word 0: Absolute rank (number of 1s before this block)
//! - Word 1: Relative ranks (7 x 9-bit cumulative counts within the block)
//! - Word 2-9: Raw data (512 bits)
//!
//! A trailing sentinel block carries the total number of ones. The rank
//! directory is part of the stored words, so a mapped vector answers queries
//! without rebuilding anything.

use crate::error::{Error, Result};
use crate::storage::Table;
use crate::utils::encoding::write_u64_le;
use std::io::{self, Write};

const BLOCK_BITS: usize = 512;
const BLOCK_WORDS: usize = 10;

/// A rank/select bit vector over a backing table.
pub struct BitVector {
    /// Interleaved data: [abs_rank, rel_ranks, data0, ..., data7, ...]
    storage: Table,
    len: usize,
}

impl std::fmt::Debug for BitVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitVector")
            .field("len", &self.len)
            .field("ones", &self.count_ones())
            .finish()
    }
}

impl BitVector {
    /// Build a vector from packed bits (bit `i` is `bits[i / 64] >> (i % 64)`).
    pub fn new(bits: &[u64], len: usize) -> Self {
        let num_blocks = len.div_ceil(BLOCK_BITS);
        let mut storage = vec![0u64; num_blocks * BLOCK_WORDS + BLOCK_WORDS];
        let mut total_rank = 0u64;

        for i in 0..num_blocks {
            let base = i * BLOCK_WORDS;
            storage[base] = total_rank;

            let mut relative_ranks = 0u64;
            let mut current_rel = 0u64;

            for j in 0..8 {
                let data_idx = i * 8 + j;
                let mut word = bits.get(data_idx).copied().unwrap_or(0);
                // Bits past `len` must not leak into the counts
                let first_bit = data_idx * 64;
                if first_bit + 64 > len {
                    let keep = len.saturating_sub(first_bit);
                    word = if keep == 0 { 0 } else { word & (u64::MAX >> (64 - keep)) };
                }
                storage[base + 2 + j] = word;

                if j > 0 {
                    relative_ranks |= current_rel << (9 * (j - 1));
                }
                current_rel += word.count_ones() as u64;
            }
            storage[base + 1] = relative_ranks;
            total_rank += current_rel;
        }

        // Sentinel
        storage[num_blocks * BLOCK_WORDS] = total_rank;

        Self {
            storage: Box::new(storage),
            len,
        }
    }

    /// Build a vector from an iterator of bits.
    pub fn from_bools<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let mut words = Vec::new();
        let mut len = 0usize;
        for bit in iter {
            if len % 64 == 0 {
                words.push(0u64);
            }
            if bit {
                words[len / 64] |= 1u64 << (len % 64);
            }
            len += 1;
        }
        Self::new(&words, len)
    }

    /// Reconstruct a vector from stored words.
    ///
    /// The rank directory is recomputed from the data words and must match
    /// the stored one; bits past `len` must be clear.
    pub fn from_parts(storage: Table, len: usize) -> Result<Self> {
        let expected = Self::storage_words(len);
        if expected != Some(storage.len()) {
            return Err(Error::corruption(format!(
                "bit vector of {} bits needs {:?} words, found {}",
                len,
                expected,
                storage.len()
            )));
        }

        let num_blocks = len.div_ceil(BLOCK_BITS);
        let mut total_rank = 0u64;
        for i in 0..num_blocks {
            let base = i * BLOCK_WORDS;
            let mut relative_ranks = 0u64;
            let mut current_rel = 0u64;
            for j in 0..8 {
                let word = storage.get(base + 2 + j);
                let first_bit = (i * 8 + j) * 64;
                if first_bit + 64 > len {
                    let keep = len.saturating_sub(first_bit);
                    let mask = if keep == 0 { 0 } else { u64::MAX >> (64 - keep) };
                    if word & !mask != 0 {
                        return Err(Error::corruption("bit vector has bits set past its length"));
                    }
                }
                if j > 0 {
                    relative_ranks |= current_rel << (9 * (j - 1));
                }
                current_rel += word.count_ones() as u64;
            }
            if storage.get(base) != total_rank || storage.get(base + 1) != relative_ranks {
                return Err(Error::corruption(format!("bit vector rank directory damaged in block {}", i)));
            }
            total_rank += current_rel;
        }
        if storage.get(num_blocks * BLOCK_WORDS) != total_rank {
            return Err(Error::corruption("bit vector total rank damaged"));
        }

        Ok(Self { storage, len })
    }

    /// Number of words the stored form occupies for `len` bits.
    pub fn storage_words(len: usize) -> Option<usize> {
        len.div_ceil(BLOCK_BITS)
            .checked_mul(BLOCK_WORDS)
            .and_then(|w| w.checked_add(BLOCK_WORDS))
    }

    /// Return the total number of bits in the vector.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Return true if the bit-vector has length 0.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total number of set bits.
    pub fn count_ones(&self) -> usize {
        self.storage.get(self.storage.len() - BLOCK_WORDS) as usize
    }

    /// Bytes used by the stored words.
    pub fn size_in_bytes(&self) -> usize {
        self.storage.size_in_bytes()
    }

    /// Write `len` followed by the stored words, little-endian.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_u64_le(writer, self.len as u64)?;
        for i in 0..self.storage.len() {
            write_u64_le(writer, self.storage.get(i))?;
        }
        Ok(())
    }

    /// Size in bytes of [`write_to`](Self::write_to) output.
    pub fn encoded_len(&self) -> usize {
        8 + self.storage.len() * 8
    }

    /// Return true if the bit at index `i` is set.
    #[inline]
    pub fn get(&self, i: usize) -> bool {
        if i >= self.len {
            return false;
        }
        let block_idx = i / BLOCK_BITS;
        let word_in_block = (i % BLOCK_BITS) / 64;
        let bit_in_word = i % 64;
        let word = self.storage.get(block_idx * BLOCK_WORDS + 2 + word_in_block);
        (word & (1u64 << bit_in_word)) != 0
    }

    /// Return the number of set bits in the range [0, i).
    pub fn rank1(&self, i: usize) -> usize {
        if i == 0 {
            return 0;
        }
        let i = i.min(self.len);
        let block_idx = i / BLOCK_BITS;
        let sub_block_idx = (i % BLOCK_BITS) / 64;
        let bit_offset = i % 64;

        let base = block_idx * BLOCK_WORDS;
        let mut rank = self.storage.get(base) as usize;

        if sub_block_idx > 0 {
            let relative_ranks = self.storage.get(base + 1);
            rank += ((relative_ranks >> (9 * (sub_block_idx - 1))) & 0x1FF) as usize;
        }

        if bit_offset > 0 {
            let word = self.storage.get(base + 2 + sub_block_idx);
            rank += (word & ((1u64 << bit_offset) - 1)).count_ones() as usize;
        }

        rank
    }

    /// Return the number of unset bits in the range [0, i).
    pub fn rank0(&self, i: usize) -> usize {
        i.min(self.len) - self.rank1(i)
    }

    /// Return the position of the $k$-th set bit (0-indexed).
    pub fn select1(&self, k: usize) -> Option<usize> {
        if k >= self.count_ones() {
            return None;
        }

        // Last block whose absolute rank is <= k holds the answer
        let num_blocks = self.storage.len() / BLOCK_WORDS;
        let mut lo = 0usize;
        let mut hi = num_blocks;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.storage.get(mid * BLOCK_WORDS) as usize <= k {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        let block_idx = lo - 1;
        let base = block_idx * BLOCK_WORDS;
        let mut remaining = k - self.storage.get(base) as usize;

        let relative_ranks = self.storage.get(base + 1);
        let mut sub_block_idx = 0;
        for j in 1..8 {
            let rel_rank = ((relative_ranks >> (9 * (j - 1))) & 0x1FF) as usize;
            if rel_rank <= remaining {
                sub_block_idx = j;
            } else {
                break;
            }
        }
        if sub_block_idx > 0 {
            remaining -= ((relative_ranks >> (9 * (sub_block_idx - 1))) & 0x1FF) as usize;
        }

        let word = self.storage.get(base + 2 + sub_block_idx);
        Some(block_idx * BLOCK_BITS + sub_block_idx * 64 + select_in_word(word, remaining))
    }
}

/// Position of the k-th set bit of `word` (k < popcount).
#[inline]
fn select_in_word(mut word: u64, k: usize) -> usize {
    for _ in 0..k {
        word &= word - 1;
    }
    word.trailing_zeros() as usize
}
