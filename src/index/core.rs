//! Succinct core index
//!
//! Compressed suffix array over a byte sequence, answering `extract`,
//! `count` and `search` without decompressing the data.
//!
//! The text `T` gets a unique sentinel appended (length `m = n + 1`). All
//! suffixes are sorted; rank `r` names the r-th smallest suffix. The index
//! keeps:
//!
//! - the sorted alphabet and the first rank of every column (all suffixes
//!   starting with the same byte form one column), which yields the first
//!   byte of any suffix from its rank
//! - the next-pointer array `psi[r] = ISA[SA[r] + 1]`, increasing inside each
//!   column, stored as zigzag varint deltas in blocks with sampled heads
//! - suffix-array values that are multiples of the SA rate, located by a
//!   rank/select bit vector over ranks
//! - every ISA-rate-th inverse suffix-array value
//!
//! Walking `psi` from a rank reads the text forward one byte per step, so
//! extraction starts at the nearest ISA sample and searches narrow a rank
//! range backward from the last pattern byte.

use crate::bits::{BitVector, IntVector};
use crate::error::{Error, Result};
use crate::storage::{Backing, Table, upper_bound};
use crate::utils::encoding::{decode_varint_with, zigzag_decode};
use rayon::prelude::*;
use std::ops::Range;

/// Searches resolving more ranks than this locate them in parallel
pub const PARALLEL_LOCATE_THRESHOLD: u64 = 1_000;

/// Immutable compressed full-text index over one byte sequence.
pub struct SuccinctCore {
    /// Length of the indexed data (sentinel excluded)
    data_len: u64,
    /// Sorted distinct bytes
    alphabet: Table,
    /// Column start ranks: sentinel column, one per alphabet byte, then `m`
    columns: Table,
    /// Ranks whose suffix-array value is sampled
    sa_marks: BitVector,
    /// Sampled suffix-array values divided by the SA rate, in rank order
    sa_samples: IntVector,
    /// ISA values at positions `0, isa_rate, 2 * isa_rate, ...`
    isa_samples: IntVector,
    /// psi value at the start of each NPA block
    npa_samples: IntVector,
    /// Byte offset of each NPA block in `npa_deltas`
    npa_offsets: IntVector,
    npa_deltas: Table,
    sa_rate: u32,
    isa_rate: u32,
    npa_rate: u32,
    /// Column of each byte value, 0 when absent
    column_of: [u16; 256],
}

impl std::fmt::Debug for SuccinctCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuccinctCore")
            .field("data_len", &self.data_len)
            .field("alphabet_size", &self.alphabet.len())
            .field("sa_rate", &self.sa_rate)
            .field("isa_rate", &self.isa_rate)
            .field("npa_rate", &self.npa_rate)
            .finish()
    }
}

impl SuccinctCore {
    /// Assemble a core from its tables, checking that their shapes agree.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_tables(
        data_len: u64,
        alphabet: Table,
        columns: Table,
        sa_marks: BitVector,
        sa_samples: IntVector,
        isa_samples: IntVector,
        npa_samples: IntVector,
        npa_offsets: IntVector,
        npa_deltas: Table,
        (sa_rate, isa_rate, npa_rate): (u32, u32, u32),
    ) -> Result<Self> {
        let m = data_len
            .checked_add(1)
            .ok_or_else(|| Error::corruption("data length overflows"))? as usize;
        let sigma = alphabet.len() + 1;
        let check = |ok: bool, what: &str| {
            if ok {
                Ok(())
            } else {
                Err(Error::corruption(what.to_string()))
            }
        };

        check(sa_rate > 0 && isa_rate > 0 && npa_rate > 0, "sampling rate of zero")?;
        check(columns.len() == sigma + 1, "column table does not match alphabet")?;
        check(
            columns.get(0) == 0 && columns.get(1) == 1 && columns.get(sigma) == m as u64,
            "column table does not cover the data",
        )?;
        check(
            (1..=sigma).all(|c| columns.get(c - 1) < columns.get(c)),
            "column table is not strictly increasing",
        )?;
        check(
            (1..alphabet.len()).all(|i| alphabet.get(i - 1) < alphabet.get(i)),
            "alphabet is not sorted",
        )?;
        check(sa_marks.len() == m, "SA sample marks do not match data length")?;
        check(
            sa_samples.len() == sa_marks.count_ones(),
            "SA sample count does not match marks",
        )?;
        check(
            isa_samples.len() == m.div_ceil(isa_rate as usize),
            "ISA sample count does not match data length",
        )?;
        check(
            npa_samples.len() == m.div_ceil(npa_rate as usize) && npa_offsets.len() == npa_samples.len(),
            "NPA block count does not match data length",
        )?;
        check(
            npa_offsets.is_empty() || npa_offsets.get(npa_offsets.len() - 1) <= npa_deltas.len() as u64,
            "NPA block offsets run past the delta table",
        )?;
        check(
            (1..npa_offsets.len()).all(|i| npa_offsets.get(i - 1) <= npa_offsets.get(i)),
            "NPA block offsets are not non-decreasing",
        )?;
        check(
            (0..npa_samples.len()).all(|i| npa_samples.get(i) < m as u64),
            "NPA block sample outside the rank space",
        )?;
        check(
            (0..isa_samples.len()).all(|i| isa_samples.get(i) < m as u64),
            "ISA sample outside the rank space",
        )?;
        check(
            (0..sa_samples.len()).all(|i| {
                sa_samples
                    .get(i)
                    .checked_mul(sa_rate as u64)
                    .is_some_and(|pos| pos <= data_len)
            }),
            "SA sample beyond the data length",
        )?;

        let mut column_of = [0u16; 256];
        for i in 0..alphabet.len() {
            column_of[alphabet.get(i) as usize] = i as u16 + 1;
        }

        Ok(Self {
            data_len,
            alphabet,
            columns,
            sa_marks,
            sa_samples,
            isa_samples,
            npa_samples,
            npa_offsets,
            npa_deltas,
            sa_rate,
            isa_rate,
            npa_rate,
            column_of,
        })
    }

    /// Number of indexed bytes.
    pub fn original_size(&self) -> u64 {
        self.data_len
    }

    /// Number of distinct byte values in the data.
    pub fn alphabet_size(&self) -> usize {
        self.alphabet.len()
    }

    /// Bytes occupied by the compressed tables.
    pub fn compressed_size(&self) -> usize {
        self.alphabet.size_in_bytes()
            + self.columns.size_in_bytes()
            + self.sa_marks.size_in_bytes()
            + self.sa_samples.size_in_bytes()
            + self.isa_samples.size_in_bytes()
            + self.npa_samples.size_in_bytes()
            + self.npa_offsets.size_in_bytes()
            + self.npa_deltas.size_in_bytes()
    }

    /// Sampling rates (SA, ISA, NPA).
    pub fn sampling_rates(&self) -> (u32, u32, u32) {
        (self.sa_rate, self.isa_rate, self.npa_rate)
    }

    /// Number of suffixes, sentinel included
    #[inline]
    fn suffix_count(&self) -> u64 {
        self.data_len + 1
    }

    /// Next pointer of `rank`: the rank of the suffix starting one byte later.
    pub fn lookup_npa(&self, rank: u64) -> u64 {
        let rate = self.npa_rate as u64;
        let block = (rank / rate) as usize;
        let mut value = self.npa_samples.get(block) as i64;
        let mut pos = self.npa_offsets.get(block) as usize;
        let deltas = self.npa_deltas.as_ref();

        for _ in 0..rank % rate {
            let decoded = decode_varint_with(|i| {
                let at = pos + i;
                (at < deltas.len()).then(|| deltas.get(at) as u8)
            });
            // A damaged delta stream ends the walk at the last good value
            let Some((zigzag, used)) = decoded else { break };
            value = value.wrapping_add(zigzag_decode(zigzag));
            pos += used;
        }
        // Keep walks over a damaged delta stream inside the rank space
        value.clamp(0, self.data_len as i64) as u64
    }

    /// Text position of the suffix with rank `rank`.
    pub fn lookup_sa(&self, rank: u64) -> u64 {
        let m = self.suffix_count();
        let mut rank = rank;
        let mut steps = 0u64;
        // A sample is at most sa_rate - 1 steps away
        while !self.sa_marks.get(rank as usize) && steps < self.sa_rate as u64 {
            rank = self.lookup_npa(rank);
            steps += 1;
        }
        if !self.sa_marks.get(rank as usize) {
            // Only a damaged next-pointer table walks past every sample
            return 0;
        }
        let sample = self.sa_samples.get(self.sa_marks.rank1(rank as usize));
        let pos = sample * self.sa_rate as u64;
        (pos + m - steps % m) % m
    }

    /// Rank of the suffix starting at text position `pos` (`pos <= n`).
    pub fn lookup_isa(&self, pos: u64) -> u64 {
        let rate = self.isa_rate as u64;
        let mut rank = self.isa_samples.get((pos / rate) as usize);
        for _ in 0..pos % rate {
            rank = self.lookup_npa(rank);
        }
        rank
    }

    /// First byte of the suffix with rank `rank`, `None` for the sentinel.
    pub fn char_at_rank(&self, rank: u64) -> Option<u8> {
        let column = upper_bound(self.columns.as_ref(), rank) - 1;
        if column == 0 {
            None
        } else {
            Some(self.alphabet.get(column - 1) as u8)
        }
    }

    fn check_range(&self, offset: u64, length: u64) -> Result<()> {
        match offset.checked_add(length) {
            Some(end) if end <= self.data_len => Ok(()),
            _ => Err(Error::OutOfRange {
                offset,
                length,
                data_len: self.data_len,
            }),
        }
    }

    /// Byte at `offset`.
    pub fn char_at(&self, offset: u64) -> Result<u8> {
        self.check_range(offset, 1)?;
        let rank = self.lookup_isa(offset);
        // Every offset below data_len names a real byte
        Ok(self.char_at_rank(rank).unwrap_or_default())
    }

    /// `length` bytes starting at `offset`.
    pub fn extract(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        self.check_range(offset, length)?;
        let mut out = Vec::with_capacity(length as usize);
        if length == 0 {
            return Ok(out);
        }

        let mut rank = self.lookup_isa(offset);
        for _ in 0..length {
            match self.char_at_rank(rank) {
                Some(byte) => out.push(byte),
                None => break,
            }
            rank = self.lookup_npa(rank);
        }
        Ok(out)
    }

    /// Bytes from `offset` up to, not including, the first `delimiter` or the end of data.
    pub fn extract_until(&self, offset: u64, delimiter: u8) -> Result<Vec<u8>> {
        self.check_range(offset, 0)?;
        let mut out = Vec::new();
        if offset == self.data_len {
            return Ok(out);
        }

        let mut rank = self.lookup_isa(offset);
        for _ in offset..self.data_len {
            match self.char_at_rank(rank) {
                Some(byte) if byte != delimiter => out.push(byte),
                _ => break,
            }
            rank = self.lookup_npa(rank);
        }
        Ok(out)
    }

    /// Half-open rank range of the suffixes prefixed by `pattern`.
    ///
    /// Backward search: start from the column of the last byte, then for each
    /// earlier byte keep the ranks of its column whose next pointer lands in
    /// the current range. psi is increasing inside a column, so both ends are
    /// binary searches. The empty pattern matches every non-sentinel suffix.
    pub fn rank_range(&self, pattern: &[u8]) -> Range<u64> {
        let m = self.suffix_count();
        let Some((&last, rest)) = pattern.split_last() else {
            return 1..m;
        };
        let Some(mut range) = self.column_range(last) else {
            return 0..0;
        };

        for &byte in rest.iter().rev() {
            let Some(column) = self.column_range(byte) else {
                return 0..0;
            };
            let lo = self.first_pointing_at(column.clone(), range.start);
            let hi = self.first_pointing_at(lo..column.end, range.end);
            if lo >= hi {
                return 0..0;
            }
            range = lo..hi;
        }
        range
    }

    /// Ranks of the suffixes starting with `byte`.
    fn column_range(&self, byte: u8) -> Option<Range<u64>> {
        let column = self.column_of[byte as usize] as usize;
        if column == 0 {
            return None;
        }
        Some(self.columns.get(column)..self.columns.get(column + 1))
    }

    /// First rank in `ranks` (one column) whose next pointer is `>= target`.
    fn first_pointing_at(&self, ranks: Range<u64>, target: u64) -> u64 {
        let (mut lo, mut hi) = (ranks.start, ranks.end);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.lookup_npa(mid) < target {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Number of occurrences of `pattern`; `n` for the empty pattern.
    pub fn count(&self, pattern: &[u8]) -> u64 {
        let range = self.rank_range(pattern);
        range.end - range.start
    }

    /// Return true if `pattern` occurs in the data.
    pub fn contains(&self, pattern: &[u8]) -> bool {
        !self.rank_range(pattern).is_empty()
    }

    /// Offsets of every occurrence of `pattern`, ascending.
    ///
    /// The empty pattern yields every offset `0..n`.
    pub fn search(&self, pattern: &[u8]) -> Vec<u64> {
        let range = self.rank_range(pattern);
        let mut offsets: Vec<u64> = if range.end - range.start > PARALLEL_LOCATE_THRESHOLD {
            range.into_par_iter().map(|rank| self.lookup_sa(rank)).collect()
        } else {
            range.map(|rank| self.lookup_sa(rank)).collect()
        };
        offsets.sort_unstable();
        offsets
    }

    pub(crate) fn alphabet(&self) -> &dyn Backing {
        self.alphabet.as_ref()
    }

    pub(crate) fn columns(&self) -> &dyn Backing {
        self.columns.as_ref()
    }

    pub(crate) fn sa_marks(&self) -> &BitVector {
        &self.sa_marks
    }

    pub(crate) fn sa_samples(&self) -> &IntVector {
        &self.sa_samples
    }

    pub(crate) fn isa_samples(&self) -> &IntVector {
        &self.isa_samples
    }

    pub(crate) fn npa_samples(&self) -> &IntVector {
        &self.npa_samples
    }

    pub(crate) fn npa_offsets(&self) -> &IntVector {
        &self.npa_offsets
    }

    pub(crate) fn npa_deltas(&self) -> &dyn Backing {
        self.npa_deltas.as_ref()
    }
}
