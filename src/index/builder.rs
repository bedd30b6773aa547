//! Succinct core construction
//!
//! Builds the compressed tables from raw bytes by:
//! 1. Mapping each byte to its column (rank in the sorted alphabet), with a
//!    unique sentinel column 0 appended at the end of the text
//! 2. Sorting all suffixes by prefix doubling with radix passes
//! 3. Deriving the next-pointer array (psi) from the suffix array and its inverse
//! 4. Sampling the suffix array, the inverse suffix array and psi
//!
//! Only the sampled and delta-coded tables survive; the full arrays are
//! dropped before [`build`] returns.

use super::core::SuccinctCore;
use super::types::{MAX_ALPHABET_SIZE, PARALLEL_THRESHOLD, Source, SuccinctConfig};
use crate::bits::{BitVector, IntVector};
use crate::error::{Error, Result};
use crate::utils::encoding::{encode_varint_u64, zigzag_encode};
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

/// Build a succinct core over every byte of `source`.
pub fn build<S: Source + ?Sized>(source: &S, config: &SuccinctConfig) -> Result<SuccinctCore> {
    config.validate()?;
    let n = source.len();
    if n == 0 {
        return Err(Error::construction("cannot index empty data"));
    }

    let started = Instant::now();
    let (alphabet, text) = map_to_columns(source, config)?;
    debug!(data_len = n, alphabet_size = alphabet.len(), "mapped input to columns");

    let sigma = alphabet.len() + 1;
    let sa = build_suffix_array(&text, sigma);
    debug!(elapsed_ms = started.elapsed().as_millis() as u64, "sorted suffixes");

    let columns = column_starts(&text, sigma);
    drop(text);

    let isa = invert(&sa);
    let psi = next_pointers(&sa, &isa);

    let sa_rate = config.sa_sampling_rate as usize;
    let (sa_marks, sa_samples) = sample_suffix_array(&sa, sa_rate);
    drop(sa);

    let isa_rate = config.isa_sampling_rate as usize;
    let isa_samples: Vec<u64> = isa.iter().step_by(isa_rate).map(|&r| r as u64).collect();
    drop(isa);

    let npa_rate = config.npa_sampling_rate as usize;
    let npa = encode_next_pointers(&psi, npa_rate);
    drop(psi);

    let core = SuccinctCore::from_tables(
        n as u64,
        Box::new(alphabet),
        Box::new(columns),
        sa_marks,
        IntVector::from_slice(&sa_samples),
        IntVector::from_slice(&isa_samples),
        IntVector::from_slice(&npa.samples),
        IntVector::from_slice(&npa.offsets),
        Box::new(npa.deltas),
        (
            config.sa_sampling_rate,
            config.isa_sampling_rate,
            config.npa_sampling_rate,
        ),
    )?;

    info!(
        data_len = n,
        compressed_bytes = core.compressed_size(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "built succinct core"
    );
    Ok(core)
}

/// Sorted distinct bytes of the input and the input rewritten as column
/// numbers (`1..=alphabet.len()`), terminated by the sentinel column `0`.
fn map_to_columns<S: Source + ?Sized>(source: &S, config: &SuccinctConfig) -> Result<(Vec<u8>, Vec<u16>)> {
    let n = source.len();
    let mut present = [false; 256];
    for i in 0..n {
        present[source.get(i) as usize] = true;
    }

    let alphabet: Vec<u8> = (0..=255u8).filter(|&b| present[b as usize]).collect();
    let limit = config.alphabet_size_hint.unwrap_or(MAX_ALPHABET_SIZE);
    if alphabet.len() as u32 > limit {
        return Err(Error::construction(format!(
            "input has {} distinct bytes, more than the configured bound of {}",
            alphabet.len(),
            limit
        )));
    }

    let mut column_of = [0u16; 256];
    for (c, &b) in alphabet.iter().enumerate() {
        column_of[b as usize] = c as u16 + 1;
    }

    let mut text = Vec::with_capacity(n + 1);
    text.extend((0..n).map(|i| column_of[source.get(i) as usize]));
    text.push(0);
    Ok((alphabet, text))
}

/// Build the suffix array of `text` by prefix doubling.
///
/// Each round orders suffixes by their first `2k` symbols using two stable
/// counting-sort passes over the ranks of the previous round, so the whole
/// construction is O(n log n). `text` must end with a unique smallest symbol.
pub(crate) fn build_suffix_array(text: &[u16], sigma: usize) -> Vec<usize> {
    let n = text.len();
    if n == 0 {
        return Vec::new();
    }

    let mut sa = vec![0usize; n];
    let symbols: Vec<usize> = text.iter().map(|&s| s as usize).collect();
    counting_sort(&symbols, 0..n, sigma, &mut sa);

    let mut rank = vec![0usize; n];
    for j in 1..n {
        let step = (symbols[sa[j]] != symbols[sa[j - 1]]) as usize;
        rank[sa[j]] = rank[sa[j - 1]] + step;
    }
    drop(symbols);

    let mut classes = rank[sa[n - 1]] + 1;
    let mut next_rank = vec![0usize; n];
    let mut by_second = Vec::with_capacity(n);
    let mut k = 1;

    while classes < n {
        // Suffixes shorter than k have an empty second half and sort first
        by_second.clear();
        by_second.extend(n.saturating_sub(k)..n);
        by_second.extend(sa.iter().filter(|&&s| s >= k).map(|&s| s - k));

        counting_sort(&rank, by_second.iter().copied(), classes, &mut sa);

        let key = |i: usize| (rank[i], if i + k < n { rank[i + k] + 1 } else { 0 });
        next_rank[sa[0]] = 0;
        for j in 1..n {
            let step = (key(sa[j]) != key(sa[j - 1])) as usize;
            next_rank[sa[j]] = next_rank[sa[j - 1]] + step;
        }
        std::mem::swap(&mut rank, &mut next_rank);

        classes = rank[sa[n - 1]] + 1;
        k *= 2;
    }

    sa
}

/// Stable counting sort of the positions yielded by `order` by `keys[pos]`.
fn counting_sort<I: Iterator<Item = usize>>(keys: &[usize], order: I, classes: usize, out: &mut [usize]) {
    let mut starts = vec![0usize; classes + 1];
    for &key in keys {
        starts[key + 1] += 1;
    }
    for c in 0..classes {
        starts[c + 1] += starts[c];
    }
    for pos in order {
        let key = keys[pos];
        out[starts[key]] = pos;
        starts[key] += 1;
    }
}

/// First rank of every column, followed by the total length.
fn column_starts(text: &[u16], sigma: usize) -> Vec<u64> {
    let mut starts = vec![0u64; sigma + 1];
    for &s in text {
        starts[s as usize + 1] += 1;
    }
    for c in 0..sigma {
        starts[c + 1] += starts[c];
    }
    starts
}

fn invert(sa: &[usize]) -> Vec<usize> {
    let mut isa = vec![0usize; sa.len()];
    for (rank, &pos) in sa.iter().enumerate() {
        isa[pos] = rank;
    }
    isa
}

/// psi[r] is the rank of the suffix one position after the suffix of rank r.
fn next_pointers(sa: &[usize], isa: &[usize]) -> Vec<usize> {
    let m = sa.len();
    let next = |&pos: &usize| isa[if pos + 1 == m { 0 } else { pos + 1 }];
    if m > PARALLEL_THRESHOLD {
        sa.par_iter().map(next).collect()
    } else {
        sa.iter().map(next).collect()
    }
}

/// Marks ranks whose suffix-array value is a multiple of `rate` and stores
/// those values divided by `rate`, in rank order.
fn sample_suffix_array(sa: &[usize], rate: usize) -> (BitVector, Vec<u64>) {
    let marks = BitVector::from_bools(sa.iter().map(|&pos| pos % rate == 0));
    let samples = sa
        .iter()
        .filter(|&&pos| pos % rate == 0)
        .map(|&pos| (pos / rate) as u64)
        .collect();
    (marks, samples)
}

/// Delta-coded next-pointer array.
pub(crate) struct EncodedNextPointers {
    /// psi value at the start of each block
    pub samples: Vec<u64>,
    /// Byte offset of each block's deltas
    pub offsets: Vec<u64>,
    /// Zigzag varint deltas between consecutive psi values within a block
    pub deltas: Vec<u8>,
}

/// psi is increasing inside each column, so within a block most deltas are
/// small and positive; the drop at a column boundary is zigzag-coded.
pub(crate) fn encode_next_pointers(psi: &[usize], rate: usize) -> EncodedNextPointers {
    let blocks = psi.len().div_ceil(rate);
    let mut samples = Vec::with_capacity(blocks);
    let mut offsets = Vec::with_capacity(blocks);
    let mut deltas = Vec::with_capacity(psi.len());

    for block in psi.chunks(rate) {
        samples.push(block[0] as u64);
        offsets.push(deltas.len() as u64);
        for pair in block.windows(2) {
            let delta = pair[1] as i64 - pair[0] as i64;
            encode_varint_u64(zigzag_encode(delta), &mut deltas);
        }
    }

    EncodedNextPointers {
        samples,
        offsets,
        deltas,
    }
}
