//! Types shared by construction, persistence and queries.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Identifier of a record in an indexed file
pub type RecordId = u32;

/// Magic number for index files
pub const INDEX_MAGIC: u32 = 0x54434353; // "SCCT" in little-endian

/// Current version of the index layout
pub const INDEX_VERSION: u32 = 1;

/// Largest number of distinct byte values an index can hold
pub const MAX_ALPHABET_SIZE: u32 = 256;

/// Number of tables following the header
pub const SECTION_COUNT: usize = 9;

/// Inputs above this size use parallel construction passes
pub const PARALLEL_THRESHOLD: usize = 100_000;

/// Read-only random access provider over raw bytes, consumed by construction.
pub trait Source {
    fn len(&self) -> usize;

    fn get(&self, index: usize) -> u8;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: AsRef<[u8]> + ?Sized> Source for T {
    fn len(&self) -> usize {
        self.as_ref().len()
    }

    #[inline]
    fn get(&self, index: usize) -> u8 {
        self.as_ref()[index]
    }
}

/// Configuration for index construction
///
/// Sampling rates trade space for query time; they never change results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuccinctConfig {
    /// Suffix-array values divisible by this rate are stored explicitly
    pub sa_sampling_rate: u32,
    /// Every `isa_sampling_rate`-th inverse suffix-array value is stored
    pub isa_sampling_rate: u32,
    /// Block length of the delta-coded next-pointer array
    pub npa_sampling_rate: u32,
    /// Upper bound on the number of distinct bytes in the input
    pub alphabet_size_hint: Option<u32>,
}

impl Default for SuccinctConfig {
    fn default() -> Self {
        Self {
            sa_sampling_rate: 32,
            isa_sampling_rate: 32,
            npa_sampling_rate: 128,
            alphabet_size_hint: None,
        }
    }
}

impl SuccinctConfig {
    /// Load a configuration from a JSON file; absent fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::resource(path, e))?;
        let config: Self = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            Error::construction(format!("invalid configuration {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no index can be built with.
    pub fn validate(&self) -> Result<()> {
        let rates = [
            ("sa_sampling_rate", self.sa_sampling_rate),
            ("isa_sampling_rate", self.isa_sampling_rate),
            ("npa_sampling_rate", self.npa_sampling_rate),
        ];
        for (name, rate) in rates {
            if rate == 0 {
                return Err(Error::construction(format!("{} must be positive", name)));
            }
        }
        match self.alphabet_size_hint {
            Some(0) => Err(Error::construction("alphabet_size_hint must be positive")),
            Some(hint) if hint > MAX_ALPHABET_SIZE => Err(Error::construction(format!(
                "alphabet_size_hint {} exceeds the supported {} symbols",
                hint, MAX_ALPHABET_SIZE
            ))),
            _ => Ok(()),
        }
    }
}

/// Fixed-size header at the start of every index layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutHeader {
    /// Magic number (INDEX_MAGIC)
    pub magic: u32,
    /// Version number
    pub version: u32,
    /// Flags (reserved for future use)
    pub flags: u32,
    /// Length of the original data in bytes
    pub data_len: u64,
    /// Number of records
    pub record_count: u64,
    /// Number of distinct byte values
    pub alphabet_size: u32,
    pub sa_sampling_rate: u32,
    pub isa_sampling_rate: u32,
    pub npa_sampling_rate: u32,
}

impl LayoutHeader {
    /// Size of header in bytes
    pub const SIZE: usize = 4 + 4 + 4 + 8 + 8 + 4 + 4 + 4 + 4; // 44 bytes

    /// Byte offset of the version field
    pub const VERSION_OFFSET: usize = 4;

    pub fn new(
        data_len: u64,
        record_count: u64,
        alphabet_size: u32,
        rates: (u32, u32, u32),
    ) -> Self {
        Self {
            magic: INDEX_MAGIC,
            version: INDEX_VERSION,
            flags: 0,
            data_len,
            record_count,
            alphabet_size,
            sa_sampling_rate: rates.0,
            isa_sampling_rate: rates.1,
            npa_sampling_rate: rates.2,
        }
    }

    /// Encode the header, little-endian.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..4].copy_from_slice(&self.magic.to_le_bytes());
        out[4..8].copy_from_slice(&self.version.to_le_bytes());
        out[8..12].copy_from_slice(&self.flags.to_le_bytes());
        out[12..20].copy_from_slice(&self.data_len.to_le_bytes());
        out[20..28].copy_from_slice(&self.record_count.to_le_bytes());
        out[28..32].copy_from_slice(&self.alphabet_size.to_le_bytes());
        out[32..36].copy_from_slice(&self.sa_sampling_rate.to_le_bytes());
        out[36..40].copy_from_slice(&self.isa_sampling_rate.to_le_bytes());
        out[40..44].copy_from_slice(&self.npa_sampling_rate.to_le_bytes());
        out
    }

    /// Decode and validate a header.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(Error::corruption("file too small for header"));
        }
        let u32_at = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        let u64_at = |at: usize| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&bytes[at..at + 8]);
            u64::from_le_bytes(buf)
        };

        let header = Self {
            magic: u32_at(0),
            version: u32_at(4),
            flags: u32_at(8),
            data_len: u64_at(12),
            record_count: u64_at(20),
            alphabet_size: u32_at(28),
            sa_sampling_rate: u32_at(32),
            isa_sampling_rate: u32_at(36),
            npa_sampling_rate: u32_at(40),
        };
        header.validate()?;
        Ok(header)
    }

    fn validate(&self) -> Result<()> {
        if self.magic != INDEX_MAGIC {
            return Err(Error::corruption("bad magic number"));
        }
        if self.version != INDEX_VERSION {
            return Err(Error::corruption(format!(
                "unsupported layout version {} (expected {})",
                self.version, INDEX_VERSION
            )));
        }
        if self.data_len == 0 {
            return Err(Error::corruption("header declares empty data"));
        }
        if self.alphabet_size == 0 || self.alphabet_size > MAX_ALPHABET_SIZE {
            return Err(Error::corruption(format!(
                "alphabet size {} outside 1..={}",
                self.alphabet_size, MAX_ALPHABET_SIZE
            )));
        }
        if self.sa_sampling_rate == 0 || self.isa_sampling_rate == 0 || self.npa_sampling_rate == 0 {
            return Err(Error::corruption("sampling rate of zero"));
        }
        if self.record_count > RecordId::MAX as u64 + 1 {
            return Err(Error::corruption(format!("record count {} too large", self.record_count)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_blanket_impl() {
        let data = b"abc".to_vec();
        assert_eq!(Source::len(&data), 3);
        assert_eq!(Source::get(&data, 1), b'b');
        assert_eq!(Source::get("xyz", 2), b'z');
        assert!(Source::is_empty(&b""[..]));
    }

    #[test]
    fn test_config_defaults_valid() {
        assert!(SuccinctConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_rejects_zero_rate() {
        let config = SuccinctConfig {
            isa_sampling_rate: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Construction(_))));
    }

    #[test]
    fn test_config_rejects_bad_hint() {
        for hint in [0, 257] {
            let config = SuccinctConfig {
                alphabet_size_hint: Some(hint),
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(Error::Construction(_))));
        }
    }

    #[test]
    fn test_config_json_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "sa_sampling_rate": 8, "alphabet_size_hint": 64 }"#).unwrap();

        let config = SuccinctConfig::from_json_file(&path).unwrap();
        assert_eq!(config.sa_sampling_rate, 8);
        assert_eq!(config.isa_sampling_rate, 32);
        assert_eq!(config.alphabet_size_hint, Some(64));
    }

    #[test]
    fn test_header_roundtrip() {
        let header = LayoutHeader::new(1000, 12, 40, (16, 32, 64));
        let bytes = header.to_bytes();
        assert_eq!(LayoutHeader::parse(&bytes).unwrap(), header);
    }

    #[test]
    fn test_header_version_mismatch() {
        let mut bytes = LayoutHeader::new(10, 1, 3, (32, 32, 128)).to_bytes();
        bytes[LayoutHeader::VERSION_OFFSET] ^= 0xFF;
        let err = LayoutHeader::parse(&bytes).unwrap_err();
        assert!(matches!(err, Error::Corruption(_)));
        assert!(err.to_string().contains("version"));
    }

    #[test]
    fn test_header_too_small() {
        assert!(matches!(LayoutHeader::parse(&[0u8; 10]), Err(Error::Corruption(_))));
    }
}
