//! Integration tests for building, persisting and querying indexed files.
//!
//! Most tests run against the checked-in `tests/fixtures/test_file`, a
//! short C snippet split into one record per line.

use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use succinct::index::types::LayoutHeader;
use succinct::utils::line_offsets;
use succinct::{Error, RecordId, StorageMode, SuccinctConfig, SuccinctIndexedFile};
use tempfile::TempDir;

const MODES: [StorageMode; 2] = [StorageMode::MemoryOnly, StorageMode::MemoryMapped];

fn fixture_data() -> Vec<u8> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("test_file");
    fs::read(path).expect("Failed to read fixture")
}

fn build_fixture() -> SuccinctIndexedFile {
    let data = fixture_data();
    let offsets = line_offsets(&data);
    SuccinctIndexedFile::new(&data, &offsets, &SuccinctConfig::default()).expect("Failed to build index")
}

/// Write the fixture index into a fresh temp dir
fn persisted_fixture() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test_file.succinct");
    build_fixture().write_to_file(&path).unwrap();
    (dir, path)
}

fn assert_fixture_queries(file: &SuccinctIndexedFile) {
    let data = fixture_data();
    assert_eq!(file.core().original_size(), data.len() as u64);
    assert_eq!(file.record_count(), 5);

    assert_eq!(file.count(b"int"), 4);
    assert_eq!(file.count(b"include"), 2);
    assert_eq!(file.count(b"random"), 1);
    assert_eq!(file.count(b"random int"), 1);
    assert_eq!(file.count(b"missing"), 0);

    let ids: Vec<RecordId> = file.record_search_ids(b"int").iter().collect();
    assert_eq!(ids, vec![2, 3]);
    let ids: Vec<RecordId> = file.record_search_ids(b"include").iter().collect();
    assert_eq!(ids, vec![0, 1]);

    assert_eq!(file.record_bytes(1).unwrap(), b"#include <stdio.h>\n");
    assert_eq!(file.extract(0, data.len() as u64).unwrap(), data);
}

#[test]
fn test_construct_and_query() {
    assert_fixture_queries(&build_fixture());
}

#[test]
fn test_search_offsets() {
    let file = build_fixture();
    let data = fixture_data();
    let offsets = file.search(b"int");
    assert_eq!(offsets.len(), 4);
    assert!(offsets.windows(2).all(|w| w[0] < w[1]));
    for &offset in &offsets {
        let at = offset as usize;
        assert_eq!(&data[at..at + 3], b"int");
    }
}

#[test]
fn test_empty_pattern() {
    let file = build_fixture();
    let len = fixture_data().len() as u64;
    assert_eq!(file.count(b""), len);
    assert_eq!(file.search(b""), (0..len).collect::<Vec<_>>());
}

#[test]
fn test_serialize_deserialize_stream() {
    let file = build_fixture();
    let mut buffer = Vec::new();
    file.serialize(&mut buffer).unwrap();

    let mut cursor = Cursor::new(buffer);
    let restored = SuccinctIndexedFile::deserialize(&mut cursor).unwrap();
    assert_eq!(restored.storage_mode(), StorageMode::MemoryOnly);
    assert_fixture_queries(&restored);
}

#[test]
fn test_to_bytes_from_bytes() {
    let bytes = build_fixture().to_bytes().unwrap();
    let restored = SuccinctIndexedFile::from_bytes(&bytes).unwrap();
    assert_fixture_queries(&restored);
    assert_eq!(restored.to_bytes().unwrap(), bytes);
}

#[test]
fn test_load_in_both_modes() {
    let (_dir, path) = persisted_fixture();
    for mode in MODES {
        let file = SuccinctIndexedFile::load(&path, mode).unwrap();
        assert_eq!(file.storage_mode(), mode);
        assert_fixture_queries(&file);
    }
}

#[test]
fn test_modes_answer_identically() {
    let (_dir, path) = persisted_fixture();
    let owned = SuccinctIndexedFile::load(&path, StorageMode::MemoryOnly).unwrap();
    let mapped = SuccinctIndexedFile::load(&path, StorageMode::MemoryMapped).unwrap();

    let data = fixture_data();
    for len in 1..=4 {
        for start in 0..=data.len() - len {
            let pattern = &data[start..start + len];
            assert_eq!(owned.search(pattern), mapped.search(pattern));
            assert_eq!(owned.record_search_ids(pattern), mapped.record_search_ids(pattern));
        }
    }
    for offset in 0..data.len() as u64 {
        assert_eq!(owned.core().lookup_isa(offset), mapped.core().lookup_isa(offset));
        assert_eq!(owned.record_id_for_offset(offset).unwrap(), mapped.record_id_for_offset(offset).unwrap());
    }
    assert_eq!(owned.to_bytes().unwrap(), mapped.to_bytes().unwrap());
}

#[test]
fn test_construct_to_stream() {
    let data = fixture_data();
    let offsets = line_offsets(&data);
    let mut out = Vec::new();
    SuccinctIndexedFile::construct(&data, &offsets, &mut out, &SuccinctConfig::default()).unwrap();

    assert_eq!(out, build_fixture().to_bytes().unwrap());
    assert_fixture_queries(&SuccinctIndexedFile::from_bytes(&out).unwrap());
}

#[test]
fn test_small_sampling_rates() {
    let data = fixture_data();
    let offsets = line_offsets(&data);
    let config = SuccinctConfig {
        sa_sampling_rate: 2,
        isa_sampling_rate: 3,
        npa_sampling_rate: 5,
        alphabet_size_hint: None,
    };
    let file = SuccinctIndexedFile::new(&data, &offsets, &config).unwrap();
    assert_fixture_queries(&file);
    assert_eq!(file.core().sampling_rates(), (2, 3, 5));

    let restored = SuccinctIndexedFile::from_bytes(&file.to_bytes().unwrap()).unwrap();
    assert_eq!(restored.core().sampling_rates(), (2, 3, 5));
}

#[test]
fn test_version_mismatch_is_corruption() {
    let mut bytes = build_fixture().to_bytes().unwrap();
    bytes[LayoutHeader::VERSION_OFFSET] ^= 0xff;
    assert!(matches!(SuccinctIndexedFile::from_bytes(&bytes), Err(Error::Corruption(_))));

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad_version.succinct");
    fs::write(&path, &bytes).unwrap();
    for mode in MODES {
        assert!(matches!(SuccinctIndexedFile::load(&path, mode), Err(Error::Corruption(_))));
    }
}

#[test]
fn test_bad_magic_is_corruption() {
    let mut bytes = build_fixture().to_bytes().unwrap();
    bytes[0] = b'X';
    assert!(matches!(SuccinctIndexedFile::from_bytes(&bytes), Err(Error::Corruption(_))));
}

#[test]
fn test_truncated_file_is_corruption() {
    let bytes = build_fixture().to_bytes().unwrap();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("truncated.succinct");
    fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();
    for mode in MODES {
        assert!(matches!(SuccinctIndexedFile::load(&path, mode), Err(Error::Corruption(_))));
    }
}

#[test]
fn test_missing_file_is_resource_error() {
    let dir = TempDir::new().unwrap();
    for mode in MODES {
        let err = SuccinctIndexedFile::load(&dir.path().join("nope"), mode).unwrap_err();
        assert!(matches!(err, Error::Resource { .. }));
    }
}

#[test]
fn test_invalid_offsets() {
    let data = fixture_data();
    let config = SuccinctConfig::default();
    let len = data.len() as u64;
    for offsets in [vec![], vec![5], vec![0, 20, 20], vec![0, 40, 20], vec![0, len + 1]] {
        let err = SuccinctIndexedFile::new(&data, &offsets, &config).unwrap_err();
        assert!(matches!(err, Error::Construction(_)), "offsets {:?}", offsets);
    }
}

#[test]
fn test_out_of_range_queries() {
    let file = build_fixture();
    let len = fixture_data().len() as u64;
    assert!(matches!(file.extract(len, 1), Err(Error::OutOfRange { .. })));
    assert!(matches!(file.extract(len - 2, 5), Err(Error::OutOfRange { .. })));
    assert!(file.extract(len, 0).unwrap().is_empty());
    assert!(matches!(file.record_bytes(5), Err(Error::IndexOutOfRange { .. })));
    assert!(matches!(file.core().char_at(len), Err(Error::OutOfRange { .. })));
}

#[test]
fn test_extract_until() {
    let file = build_fixture();
    let start = file.record_offset(2).unwrap();
    assert_eq!(
        file.core().extract_until(start, b'\n').unwrap(),
        b"int main() { int seed = 42; }"
    );
    assert_eq!(file.core().char_at(start).unwrap(), b'i');
}

#[test]
fn test_concurrent_queries() {
    let (_dir, path) = persisted_fixture();
    let file = Arc::new(SuccinctIndexedFile::load(&path, StorageMode::MemoryMapped).unwrap());

    std::thread::scope(|scope| {
        for _ in 0..8 {
            let file = Arc::clone(&file);
            scope.spawn(move || {
                for _ in 0..50 {
                    assert_fixture_queries(&file);
                }
            });
        }
    });
}

#[test]
fn test_alphabet_hint_bound() {
    let data = fixture_data();
    let offsets = line_offsets(&data);
    let config = SuccinctConfig {
        alphabet_size_hint: Some(4),
        ..SuccinctConfig::default()
    };
    let err = SuccinctIndexedFile::new(&data, &offsets, &config).unwrap_err();
    assert!(matches!(err, Error::Construction(_)));

    let config = SuccinctConfig {
        alphabet_size_hint: Some(256),
        ..SuccinctConfig::default()
    };
    assert_fixture_queries(&SuccinctIndexedFile::new(&data, &offsets, &config).unwrap());
}

#[test]
fn test_config_from_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{"sa_sampling_rate": 8, "npa_sampling_rate": 16}"#).unwrap();
    let config = SuccinctConfig::from_json_file(&path).unwrap();
    assert_eq!(config.sa_sampling_rate, 8);
    assert_eq!(config.isa_sampling_rate, 32);
    assert_eq!(config.npa_sampling_rate, 16);

    fs::write(&path, r#"{"isa_sampling_rate": 0}"#).unwrap();
    assert!(matches!(SuccinctConfig::from_json_file(&path), Err(Error::Construction(_))));
}
