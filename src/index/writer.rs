//! Index layout writer
//!
//! The only encoder of the persisted layout. All integers are little-endian.
//!
//! ```text
//! header (44 bytes)
//!   magic u32 | version u32 | flags u32 | data_len u64 | record_count u64
//!   alphabet_size u32 | sa_rate u32 | isa_rate u32 | npa_rate u32
//! 9 sections, each: byte_len u64 | payload
//!   1. record offsets        u64 x record_count
//!   2. alphabet              u8 x alphabet_size
//!   3. column starts         u64 x (alphabet_size + 2)
//!   4. SA sample marks       bit vector: len u64 | words
//!   5. SA samples            int vector: len u64 | width u32 | 0u32 | words
//!   6. ISA samples           int vector
//!   7. NPA block samples     int vector
//!   8. NPA block offsets     int vector
//!   9. NPA deltas            zigzag varint bytes
//! ```

use super::file::SuccinctIndexedFile;
use super::types::{LayoutHeader, Source, SuccinctConfig};
use crate::bits::{BitVector, IntVector};
use crate::error::{Error, Result};
use crate::storage::Backing;
use crate::utils::encoding::write_u64_le;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Build an index over `source` and write its layout to `out`.
///
/// Offsets and configuration are validated before anything is built or
/// written, so a rejected input leaves `out` untouched.
pub fn construct<S: Source + ?Sized, W: Write>(
    source: &S,
    offsets: &[u64],
    out: &mut W,
    config: &SuccinctConfig,
) -> Result<()> {
    let file = SuccinctIndexedFile::new(source, offsets, config)?;
    IndexWriter::write(&file, out)
}

/// Writes index layouts to streams and files
pub struct IndexWriter;

impl IndexWriter {
    /// Write the full layout of `file` to `out`.
    pub fn write<W: Write>(file: &SuccinctIndexedFile, out: &mut W) -> Result<()> {
        let started = Instant::now();
        let core = file.core();

        let header = LayoutHeader::new(
            core.original_size(),
            file.record_count() as u64,
            core.alphabet_size() as u32,
            core.sampling_rates(),
        );
        out.write_all(&header.to_bytes())?;

        Self::write_table(out, file.offsets())?;
        Self::write_table(out, core.alphabet())?;
        Self::write_table(out, core.columns())?;
        Self::write_bit_vector(out, core.sa_marks())?;
        Self::write_int_vector(out, core.sa_samples())?;
        Self::write_int_vector(out, core.isa_samples())?;
        Self::write_int_vector(out, core.npa_samples())?;
        Self::write_int_vector(out, core.npa_offsets())?;
        Self::write_table(out, core.npa_deltas())?;
        out.flush()?;

        debug!(
            bytes = Self::encoded_len(file),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "wrote index layout"
        );
        Ok(())
    }

    /// Write the layout to `path`.
    pub fn write_to_path(file: &SuccinctIndexedFile, path: &Path) -> Result<()> {
        let handle = File::create(path).map_err(|e| Error::resource(path, e))?;
        let mut out = BufWriter::with_capacity(65536, handle);
        Self::write(file, &mut out)?;
        info!(path = %path.display(), records = file.record_count(), "wrote index file");
        Ok(())
    }

    /// Total size of the layout of `file` in bytes.
    pub fn encoded_len(file: &SuccinctIndexedFile) -> usize {
        let core = file.core();
        let sections = [
            file.offsets().size_in_bytes(),
            core.alphabet().size_in_bytes(),
            core.columns().size_in_bytes(),
            core.sa_marks().encoded_len(),
            core.sa_samples().encoded_len(),
            core.isa_samples().encoded_len(),
            core.npa_samples().encoded_len(),
            core.npa_offsets().encoded_len(),
            core.npa_deltas().size_in_bytes(),
        ];
        LayoutHeader::SIZE + sections.iter().map(|len| 8 + len).sum::<usize>()
    }

    /// Length-prefixed table, each element at its own width
    fn write_table<W: Write>(out: &mut W, table: &dyn Backing) -> Result<()> {
        write_u64_le(out, table.size_in_bytes() as u64)?;

        // Using a buffer to reduce write call overhead
        let mut buffer = Vec::with_capacity(8 * 1024);
        for i in 0..table.len() {
            let value = table.get(i);
            match table.width() {
                1 => buffer.push(value as u8),
                _ => buffer.extend_from_slice(&value.to_le_bytes()),
            }
            if buffer.len() >= 8 * 1024 {
                out.write_all(&buffer)?;
                buffer.clear();
            }
        }
        if !buffer.is_empty() {
            out.write_all(&buffer)?;
        }
        Ok(())
    }

    fn write_bit_vector<W: Write>(out: &mut W, bits: &BitVector) -> Result<()> {
        write_u64_le(out, bits.encoded_len() as u64)?;
        bits.write_to(out)?;
        Ok(())
    }

    fn write_int_vector<W: Write>(out: &mut W, ints: &IntVector) -> Result<()> {
        write_u64_le(out, ints.encoded_len() as u64)?;
        ints.write_to(out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::types::{INDEX_MAGIC, INDEX_VERSION};
    use crate::utils::encoding::{u32_le_at, u64_le_at};

    #[test]
    fn test_write_layout_header() {
        let data = b"hello world\nfoo bar\n";
        let offsets = vec![0, 12, 20];
        let mut out = Vec::new();
        construct(data.as_slice(), &offsets, &mut out, &SuccinctConfig::default()).unwrap();

        assert_eq!(u32_le_at(&out, 0), Some(INDEX_MAGIC));
        assert_eq!(u32_le_at(&out, LayoutHeader::VERSION_OFFSET), Some(INDEX_VERSION));
        assert_eq!(u64_le_at(&out, 12), Some(data.len() as u64));
        assert_eq!(u64_le_at(&out, 20), Some(3));

        // first section is the offsets table
        assert_eq!(u64_le_at(&out, LayoutHeader::SIZE), Some(24));
        assert_eq!(u64_le_at(&out, LayoutHeader::SIZE + 16), Some(12));
    }

    #[test]
    fn test_encoded_len_matches_output() {
        let data = b"abcabcabd";
        let file = SuccinctIndexedFile::new(data.as_slice(), &[0, 3, 6], &SuccinctConfig::default()).unwrap();
        let mut out = Vec::new();
        IndexWriter::write(&file, &mut out).unwrap();
        assert_eq!(out.len(), IndexWriter::encoded_len(&file));
    }

    #[test]
    fn test_construct_rejects_bad_offsets_without_output() {
        let mut out = Vec::new();
        let err = construct(b"abcdef".as_slice(), &[0, 4, 2], &mut out, &SuccinctConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::Construction(_)));
        assert!(out.is_empty());

        let err = construct(b"abcdef".as_slice(), &[1, 4], &mut out, &SuccinctConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::Construction(_)));
        assert!(out.is_empty());
    }

    #[test]
    fn test_construct_rejects_empty_input() {
        let mut out = Vec::new();
        let err = construct(b"".as_slice(), &[0], &mut out, &SuccinctConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Construction(_)));
        assert!(out.is_empty());
    }

    #[test]
    fn test_write_to_missing_directory_is_resource_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = SuccinctIndexedFile::new(b"abc".as_slice(), &[0], &SuccinctConfig::default()).unwrap();
        let err = file
            .write_to_file(&dir.path().join("missing").join("x.idx"))
            .unwrap_err();
        assert!(matches!(err, Error::Resource { .. }));
    }
}
