//! Record layer over a succinct core
//!
//! A [`SuccinctIndexedFile`] pairs one [`SuccinctCore`] with the ordered
//! start offsets of its records. Record `i` covers
//! `[offsets[i], offsets[i + 1])`, the last record runs to the end of the
//! data. Search results are translated to record ids by binary search over
//! the offsets.

use super::builder;
use super::core::SuccinctCore;
use super::reader::IndexReader;
use super::stats::IndexStats;
use super::types::{RecordId, Source, SuccinctConfig};
use super::writer::IndexWriter;
use crate::error::{Error, Result};
use crate::storage::{Backing, StorageMode, Table, upper_bound};
use roaring::RoaringBitmap;
use std::io::{Read, Write};
use std::ops::Range;
use std::path::Path;

/// Compressed, searchable file of records.
///
/// Immutable once built or loaded; safe to share across threads for
/// concurrent queries.
#[derive(Debug)]
pub struct SuccinctIndexedFile {
    core: SuccinctCore,
    offsets: Table,
    mode: StorageMode,
}

impl SuccinctIndexedFile {
    /// Build an index over `source` with records starting at `offsets`.
    pub fn new<S: Source + ?Sized>(
        source: &S,
        offsets: &[u64],
        config: &SuccinctConfig,
    ) -> Result<Self> {
        let owned: Vec<u64> = offsets.to_vec();
        check_offsets(&owned, source.len() as u64).map_err(Error::Construction)?;
        let core = builder::build(source, config)?;
        Ok(Self {
            core,
            offsets: Box::new(owned),
            mode: StorageMode::MemoryOnly,
        })
    }

    /// Build an index and write its layout to `out` without keeping it.
    ///
    /// Nothing is written when the input is rejected.
    pub fn construct<S: Source + ?Sized, W: Write>(
        source: &S,
        offsets: &[u64],
        out: &mut W,
        config: &SuccinctConfig,
    ) -> Result<()> {
        super::writer::construct(source, offsets, out, config)
    }

    /// Assemble a file from decoded parts; offsets must partition the data.
    pub(crate) fn from_parts(core: SuccinctCore, offsets: Table, mode: StorageMode) -> Result<Self> {
        check_offsets(offsets.as_ref(), core.original_size()).map_err(Error::Corruption)?;
        Ok(Self { core, offsets, mode })
    }

    /// Load a persisted layout.
    pub fn load(path: &Path, mode: StorageMode) -> Result<Self> {
        IndexReader::open(path, mode)
    }

    /// Write the layout to `path`, replacing any existing file.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        IndexWriter::write_to_path(self, path)
    }

    /// Write the layout to a stream.
    pub fn serialize<W: Write>(&self, out: &mut W) -> Result<()> {
        IndexWriter::write(self, out)
    }

    /// Read one layout from a stream into owned memory.
    pub fn deserialize<R: Read>(reader: &mut R) -> Result<Self> {
        IndexReader::read(reader)
    }

    /// Layout as a byte vector.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(IndexWriter::encoded_len(self));
        self.serialize(&mut out)?;
        Ok(out)
    }

    /// Decode a layout held in memory; trailing bytes are corruption.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        IndexReader::read_exact(bytes)
    }

    /// Underlying core index.
    pub fn core(&self) -> &SuccinctCore {
        &self.core
    }

    /// How this instance was created.
    pub fn storage_mode(&self) -> StorageMode {
        self.mode
    }

    pub(crate) fn offsets(&self) -> &dyn Backing {
        self.offsets.as_ref()
    }

    /// Number of records.
    pub fn record_count(&self) -> usize {
        self.offsets.len()
    }

    fn check_id(&self, id: RecordId) -> Result<()> {
        if (id as usize) < self.offsets.len() {
            Ok(())
        } else {
            Err(Error::IndexOutOfRange {
                id: id as u64,
                count: self.offsets.len() as u64,
            })
        }
    }

    /// Start offset of record `id`.
    pub fn record_offset(&self, id: RecordId) -> Result<u64> {
        self.check_id(id)?;
        Ok(self.offsets.get(id as usize))
    }

    /// Byte range of record `id`.
    pub fn record_range(&self, id: RecordId) -> Result<Range<u64>> {
        self.check_id(id)?;
        let index = id as usize;
        let start = self.offsets.get(index);
        let end = if index + 1 < self.offsets.len() {
            self.offsets.get(index + 1)
        } else {
            self.core.original_size()
        };
        Ok(start..end)
    }

    /// Bytes of record `id`.
    pub fn record_bytes(&self, id: RecordId) -> Result<Vec<u8>> {
        let range = self.record_range(id)?;
        self.core.extract(range.start, range.end - range.start)
    }

    /// `length` bytes starting `offset` bytes into record `id`.
    pub fn extract_record(&self, id: RecordId, offset: u64, length: u64) -> Result<Vec<u8>> {
        let range = self.record_range(id)?;
        let record_len = range.end - range.start;
        match offset.checked_add(length) {
            Some(end) if end <= record_len => self.core.extract(range.start + offset, length),
            _ => Err(Error::OutOfRange {
                offset,
                length,
                data_len: record_len,
            }),
        }
    }

    /// Record containing the byte at `offset`.
    pub fn record_id_for_offset(&self, offset: u64) -> Result<RecordId> {
        if offset >= self.core.original_size() {
            return Err(Error::OutOfRange {
                offset,
                length: 1,
                data_len: self.core.original_size(),
            });
        }
        Ok(self.record_at(offset))
    }

    #[inline]
    fn record_at(&self, offset: u64) -> RecordId {
        // offsets[0] == 0, so at least one entry is <= offset
        (upper_bound(self.offsets.as_ref(), offset) - 1) as RecordId
    }

    /// Ids of the records containing `pattern`.
    ///
    /// An occurrence belongs to the record holding its first byte; several
    /// occurrences in one record report it once.
    pub fn record_search_ids(&self, pattern: &[u8]) -> RoaringBitmap {
        self.core
            .search(pattern)
            .into_iter()
            .map(|offset| self.record_at(offset))
            .collect()
    }

    /// Bytes of the records containing `pattern`, in id order.
    pub fn record_search(&self, pattern: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.record_search_ids(pattern)
            .iter()
            .map(|id| self.record_bytes(id))
            .collect()
    }

    /// `length` bytes starting at `offset` in the whole data.
    pub fn extract(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        self.core.extract(offset, length)
    }

    /// Number of occurrences of `pattern` in the whole data.
    pub fn count(&self, pattern: &[u8]) -> u64 {
        self.core.count(pattern)
    }

    /// Offsets of every occurrence of `pattern`, ascending.
    pub fn search(&self, pattern: &[u8]) -> Vec<u64> {
        self.core.search(pattern)
    }

    /// Size and configuration summary.
    pub fn stats(&self) -> IndexStats {
        IndexStats::collect(self)
    }
}

/// Check that `offsets` partition `[0, data_len)`.
///
/// Offsets must start at 0 and be strictly increasing. The last one may
/// equal `data_len`, leaving an empty trailing record.
pub(crate) fn check_offsets(offsets: &dyn Backing, data_len: u64) -> std::result::Result<(), String> {
    if offsets.is_empty() {
        return Err("offsets must contain at least one record".to_string());
    }
    if offsets.len() as u64 > RecordId::MAX as u64 + 1 {
        return Err(format!("{} records exceed the supported maximum", offsets.len()));
    }
    if offsets.get(0) != 0 {
        return Err(format!("first offset is {}, expected 0", offsets.get(0)));
    }
    for i in 1..offsets.len() {
        let (prev, cur) = (offsets.get(i - 1), offsets.get(i));
        if cur <= prev {
            return Err(format!(
                "offsets not strictly increasing at record {} ({} after {})",
                i, cur, prev
            ));
        }
    }
    let last = offsets.get(offsets.len() - 1);
    if last > data_len {
        return Err(format!("offset {} beyond data length {}", last, data_len));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &[u8] = b"#include <stdio.h>\nint main() {\n  int r = random int;\n}\n";

    fn indexed() -> SuccinctIndexedFile {
        let offsets = crate::utils::line_offsets(TEXT);
        SuccinctIndexedFile::new(TEXT, &offsets, &SuccinctConfig::default()).unwrap()
    }

    #[test]
    fn test_records_partition_data() {
        let file = indexed();
        let offsets = crate::utils::line_offsets(TEXT);
        assert_eq!(file.record_count(), offsets.len());

        let mut joined = Vec::new();
        for id in 0..file.record_count() as RecordId {
            joined.extend(file.record_bytes(id).unwrap());
        }
        assert_eq!(joined, TEXT);
        assert_eq!(file.record_bytes(1).unwrap(), b"int main() {\n");
        // newline-terminated text ends with an empty record
        assert!(file.record_bytes(4).unwrap().is_empty());
    }

    #[test]
    fn test_record_search_ids() {
        let file = indexed();
        let ids: Vec<u32> = file.record_search_ids(b"int").iter().collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(file.count(b"int"), 3);
        assert_eq!(file.search(b"int").len(), 3);

        let records = file.record_search(b"random").unwrap();
        assert_eq!(records, vec![b"  int r = random int;\n".to_vec()]);
        assert!(file.record_search_ids(b"absent").is_empty());
    }

    #[test]
    fn test_match_across_records_belongs_to_first_byte() {
        let data = b"abc\ndef\n";
        let offsets = crate::utils::line_offsets(data);
        assert_eq!(offsets, vec![0, 4, 8]);
        let file = SuccinctIndexedFile::new(data.as_slice(), &offsets, &SuccinctConfig::default()).unwrap();

        assert_eq!(file.count(b"c\nd"), 1);
        assert_eq!(file.search(b"c\nd"), vec![2]);
        let ids: Vec<u32> = file.record_search_ids(b"c\nd").iter().collect();
        assert_eq!(ids, vec![0]);
        let ids: Vec<u32> = file.record_search_ids(b"\nd").iter().collect();
        assert_eq!(ids, vec![0]);
        let ids: Vec<u32> = file.record_search_ids(b"\n").iter().collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn test_record_lookup() {
        let file = indexed();
        assert_eq!(file.record_offset(1).unwrap(), 19);
        assert_eq!(file.record_range(0).unwrap(), 0..19);
        assert_eq!(file.record_id_for_offset(0).unwrap(), 0);
        assert_eq!(file.record_id_for_offset(18).unwrap(), 0);
        assert_eq!(file.record_id_for_offset(19).unwrap(), 1);
        assert!(matches!(
            file.record_id_for_offset(TEXT.len() as u64),
            Err(Error::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_extract_record() {
        let file = indexed();
        assert_eq!(file.extract_record(1, 4, 4).unwrap(), b"main");
        assert!(matches!(file.extract_record(1, 10, 10), Err(Error::OutOfRange { .. })));
        assert!(matches!(file.extract_record(9, 0, 1), Err(Error::IndexOutOfRange { .. })));
    }

    #[test]
    fn test_record_id_out_of_range() {
        let file = indexed();
        let count = file.record_count() as RecordId;
        assert!(matches!(
            file.record_bytes(count),
            Err(Error::IndexOutOfRange { id, .. }) if id == count as u64
        ));
    }

    #[test]
    fn test_invalid_offsets_rejected() {
        let config = SuccinctConfig::default();
        for offsets in [vec![], vec![1, 4], vec![0, 4, 4], vec![0, 6, 3], vec![0, 100]] {
            let err = SuccinctIndexedFile::new(b"abcdefgh".as_slice(), &offsets, &config).unwrap_err();
            assert!(matches!(err, Error::Construction(_)), "offsets {:?}", offsets);
        }
    }

    #[test]
    fn test_check_offsets_allows_trailing_empty_record() {
        let offsets: Vec<u64> = vec![0, 3, 8];
        assert!(check_offsets(&offsets, 8).is_ok());
        assert!(check_offsets(&offsets, 7).is_err());
    }
}
