//! Index layout reader
//!
//! Decodes the layout written by [`IndexWriter`](super::writer::IndexWriter)
//! in either storage mode. Both modes split the layout into the same nine
//! sections and decode them with the same code; they differ only in where
//! a section's bytes live:
//!
//! - [`StorageMode::MemoryOnly`]: sections are read into owned buffers and
//!   every table is copied into an owned vector
//! - [`StorageMode::MemoryMapped`]: sections are ranges of a read-only map,
//!   tables are views decoded on access
//!
//! Header, table shapes and the record partition are validated before an
//! instance is returned.

use super::core::SuccinctCore;
use super::file::SuccinctIndexedFile;
use super::types::{LayoutHeader, SECTION_COUNT};
use crate::bits::{BitVector, IntVector};
use crate::error::{Error, Result};
use crate::storage::{SharedMap, StorageMode, Table};
use crate::utils::encoding::{read_u64_le, u32_le_at, u64_le_at};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

const SECTION_NAMES: [&str; SECTION_COUNT] = [
    "record offsets",
    "alphabet",
    "column starts",
    "SA sample marks",
    "SA samples",
    "ISA samples",
    "NPA samples",
    "NPA block offsets",
    "NPA deltas",
];

/// Bytes of one section
enum Section {
    Owned(Vec<u8>),
    Mapped {
        map: SharedMap,
        start: usize,
        len: usize,
    },
}

impl Section {
    fn bytes(&self) -> &[u8] {
        match self {
            Section::Owned(bytes) => bytes,
            Section::Mapped { map, start, len } => &map.bytes()[*start..*start + *len],
        }
    }

    fn len(&self) -> usize {
        match self {
            Section::Owned(bytes) => bytes.len(),
            Section::Mapped { len, .. } => *len,
        }
    }

    /// `count` u64 words starting `at` bytes into the section
    fn words(&self, at: usize, count: usize, what: &str) -> Result<Table> {
        let size = count
            .checked_mul(8)
            .and_then(|s| s.checked_add(at))
            .filter(|&end| end <= self.len())
            .ok_or_else(|| Error::corruption(format!("{} section too short", what)))?;
        match self {
            Section::Owned(bytes) => {
                let words: Vec<u64> = bytes[at..size]
                    .chunks_exact(8)
                    .map(|c| u64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                    .collect();
                Ok(Box::new(words))
            }
            Section::Mapped { map, start, .. } => Ok(Box::new(map.words(start + at, count)?)),
        }
    }

    /// All bytes of the section as a table
    fn byte_table(&self) -> Result<Table> {
        match self {
            Section::Owned(bytes) => Ok(Box::new(bytes.clone())),
            Section::Mapped { map, start, len } => Ok(Box::new(map.byte_view(*start, *len)?)),
        }
    }

    /// Section holding exactly `expected` bytes
    fn expect_len(&self, expected: Option<usize>, what: &str) -> Result<()> {
        if expected == Some(self.len()) {
            Ok(())
        } else {
            Err(Error::corruption(format!(
                "{} section is {} bytes, expected {:?}",
                what,
                self.len(),
                expected
            )))
        }
    }

    fn bit_vector(&self, what: &str) -> Result<BitVector> {
        let len = u64_le_at(self.bytes(), 0)
            .ok_or_else(|| Error::corruption(format!("{} section too short", what)))?;
        let payload = self.len() - 8;
        if payload % 8 != 0 {
            return Err(Error::corruption(format!("{} section misaligned", what)));
        }
        let len = usize::try_from(len).map_err(|_| Error::corruption(format!("{} too long", what)))?;
        BitVector::from_parts(self.words(8, payload / 8, what)?, len)
    }

    fn int_vector(&self, what: &str) -> Result<IntVector> {
        let bytes = self.bytes();
        let (len, width) = match (u64_le_at(bytes, 0), u32_le_at(bytes, 8)) {
            (Some(len), Some(width)) if bytes.len() >= 16 => (len, width),
            _ => return Err(Error::corruption(format!("{} section too short", what))),
        };
        let payload = self.len() - 16;
        if payload % 8 != 0 {
            return Err(Error::corruption(format!("{} section misaligned", what)));
        }
        let len = usize::try_from(len).map_err(|_| Error::corruption(format!("{} too long", what)))?;
        IntVector::from_parts(self.words(16, payload / 8, what)?, width, len)
    }
}

/// Reads index layouts from streams, byte buffers and files
pub struct IndexReader;

impl IndexReader {
    /// Read one layout from `reader` into owned memory.
    ///
    /// Stops at the end of the layout; the stream may carry more data.
    pub fn read<R: Read>(reader: &mut R) -> Result<SuccinctIndexedFile> {
        let mut raw = [0u8; LayoutHeader::SIZE];
        reader
            .read_exact(&mut raw)
            .map_err(|e| Error::from_read(e, "header"))?;
        let header = LayoutHeader::parse(&raw)?;

        let mut sections = Vec::with_capacity(SECTION_COUNT);
        for name in SECTION_NAMES {
            let len = read_u64_le(reader).map_err(|e| Error::from_read(e, name))?;
            let mut payload = Vec::new();
            let read = reader.by_ref().take(len).read_to_end(&mut payload)?;
            if read as u64 != len {
                return Err(Error::corruption(format!(
                    "truncated layout while reading {}",
                    name
                )));
            }
            sections.push(Section::Owned(payload));
        }

        assemble(header, sections, StorageMode::MemoryOnly)
    }

    /// Decode a layout that fills `bytes` exactly.
    pub fn read_exact(bytes: &[u8]) -> Result<SuccinctIndexedFile> {
        let mut cursor = bytes;
        let file = Self::read(&mut cursor)?;
        if !cursor.is_empty() {
            return Err(Error::corruption(format!(
                "{} trailing bytes after layout",
                cursor.len()
            )));
        }
        Ok(file)
    }

    /// Open the index file at `path` in the given mode.
    pub fn open(path: &Path, mode: StorageMode) -> Result<SuccinctIndexedFile> {
        let started = Instant::now();
        let file = match mode {
            StorageMode::MemoryOnly => Self::read_file(path)?,
            StorageMode::MemoryMapped => Self::map_file(path)?,
        };
        info!(
            path = %path.display(),
            mode = %mode,
            records = file.record_count(),
            data_len = file.core().original_size(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "loaded index"
        );
        Ok(file)
    }

    fn read_file(path: &Path) -> Result<SuccinctIndexedFile> {
        let handle = File::open(path).map_err(|e| Error::resource(path, e))?;
        let mut reader = BufReader::with_capacity(65536, handle);
        let file = Self::read(&mut reader)?;

        let mut probe = [0u8; 1];
        if reader.read(&mut probe)? != 0 {
            return Err(Error::corruption("trailing bytes after layout"));
        }
        Ok(file)
    }

    fn map_file(path: &Path) -> Result<SuccinctIndexedFile> {
        let map = SharedMap::open(path)?;
        let header = LayoutHeader::parse(map.bytes())?;

        let mut sections = Vec::with_capacity(SECTION_COUNT);
        let mut at = LayoutHeader::SIZE;
        for name in SECTION_NAMES {
            let len = u64_le_at(map.bytes(), at)
                .ok_or_else(|| Error::corruption(format!("truncated layout while reading {}", name)))?;
            let start = at + 8;
            let end = usize::try_from(len)
                .ok()
                .and_then(|len| start.checked_add(len))
                .filter(|&end| end <= map.len())
                .ok_or_else(|| Error::corruption(format!("truncated layout while reading {}", name)))?;
            debug!(section = name, start, len, "mapped section");
            sections.push(Section::Mapped {
                map: map.clone(),
                start,
                len: end - start,
            });
            at = end;
        }
        if at != map.len() {
            return Err(Error::corruption(format!(
                "{} trailing bytes after layout",
                map.len() - at
            )));
        }

        assemble(header, sections, StorageMode::MemoryMapped)
    }
}

/// Decode the nine sections against `header` and validate the result.
fn assemble(header: LayoutHeader, sections: Vec<Section>, mode: StorageMode) -> Result<SuccinctIndexedFile> {
    let [offsets, alphabet, columns, sa_marks, sa_samples, isa_samples, npa_samples, npa_offsets, npa_deltas]: [Section; SECTION_COUNT] =
        sections
            .try_into()
            .map_err(|_| Error::corruption("wrong number of sections"))?;

    let record_count = header.record_count as usize;
    let alphabet_size = header.alphabet_size as usize;

    offsets.expect_len(record_count.checked_mul(8), SECTION_NAMES[0])?;
    alphabet.expect_len(Some(alphabet_size), SECTION_NAMES[1])?;
    columns.expect_len((alphabet_size + 2).checked_mul(8), SECTION_NAMES[2])?;

    let core = SuccinctCore::from_tables(
        header.data_len,
        alphabet.byte_table()?,
        columns.words(0, alphabet_size + 2, SECTION_NAMES[2])?,
        sa_marks.bit_vector(SECTION_NAMES[3])?,
        sa_samples.int_vector(SECTION_NAMES[4])?,
        isa_samples.int_vector(SECTION_NAMES[5])?,
        npa_samples.int_vector(SECTION_NAMES[6])?,
        npa_offsets.int_vector(SECTION_NAMES[7])?,
        npa_deltas.byte_table()?,
        (
            header.sa_sampling_rate,
            header.isa_sampling_rate,
            header.npa_sampling_rate,
        ),
    )?;

    let offsets = offsets.words(0, record_count, SECTION_NAMES[0])?;
    SuccinctIndexedFile::from_parts(core, offsets, mode)
}
