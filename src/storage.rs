//! Backing arrays for the index tables.
//!
//! Every table of a loaded index is read through [`Backing`], a read-only
//! array of unsigned integers. Two families implement it:
//!
//! - owned vectors (`Vec<u64>`, `Vec<u8>`), used after construction and for
//!   [`StorageMode::MemoryOnly`] loads
//! - [`MappedWords`] / [`MappedBytes`], views into a shared read-only
//!   memory map, used for [`StorageMode::MemoryMapped`] loads
//!
//! The query code never names a concrete storage type.

use crate::error::{Error, Result};
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// How a persisted index is brought into the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    /// All tables are copied into owned memory.
    #[default]
    MemoryOnly,
    /// Tables are views into a read-only map of the file, paged in on access.
    MemoryMapped,
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageMode::MemoryOnly => f.write_str("memory-only"),
            StorageMode::MemoryMapped => f.write_str("memory-mapped"),
        }
    }
}

/// Read-only random access array of unsigned integers.
pub trait Backing: Send + Sync {
    /// Number of elements.
    fn len(&self) -> usize;

    /// Element at `index`. Panics if `index >= len()`.
    fn get(&self, index: usize) -> u64;

    /// Size of one element in bytes.
    fn width(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes occupied by the elements.
    fn size_in_bytes(&self) -> usize {
        self.len() * self.width()
    }
}

/// Boxed backing shared by all table types.
pub type Table = Box<dyn Backing>;

impl fmt::Debug for dyn Backing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backing")
            .field("len", &self.len())
            .field("width", &self.width())
            .finish()
    }
}

impl Backing for Vec<u64> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    #[inline]
    fn get(&self, index: usize) -> u64 {
        self[index]
    }

    fn width(&self) -> usize {
        8
    }
}

impl Backing for Vec<u8> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    #[inline]
    fn get(&self, index: usize) -> u64 {
        self[index] as u64
    }

    fn width(&self) -> usize {
        1
    }
}

/// A read-only memory map shared by every view into one index file.
///
/// The map is released when the last view is dropped.
#[derive(Clone)]
pub struct SharedMap {
    map: Arc<Mmap>,
}

impl SharedMap {
    /// Map `path` read-only.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::resource(path, e))?;
        // SAFETY: the map is read-only and index files are never modified in place
        let map = unsafe { Mmap::map(&file) }.map_err(|e| Error::resource(path, e))?;
        Ok(Self { map: Arc::new(map) })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.map
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// View `count` little-endian u64 words starting at byte `start`.
    pub fn words(&self, start: usize, count: usize) -> Result<MappedWords> {
        self.check_region(start, count.checked_mul(8))?;
        Ok(MappedWords {
            map: self.clone(),
            start,
            len: count,
        })
    }

    /// View `count` bytes starting at byte `start`.
    pub fn byte_view(&self, start: usize, count: usize) -> Result<MappedBytes> {
        self.check_region(start, Some(count))?;
        Ok(MappedBytes {
            map: self.clone(),
            start,
            len: count,
        })
    }

    fn check_region(&self, start: usize, size: Option<usize>) -> Result<()> {
        let end = size.and_then(|s| start.checked_add(s));
        match end {
            Some(end) if end <= self.len() => Ok(()),
            _ => Err(Error::corruption(format!(
                "table at byte {} runs past the end of the file ({} bytes)",
                start,
                self.len()
            ))),
        }
    }
}

/// Little-endian u64 words inside a memory map
pub struct MappedWords {
    map: SharedMap,
    start: usize,
    len: usize,
}

impl Backing for MappedWords {
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn get(&self, index: usize) -> u64 {
        assert!(index < self.len, "word {} out of {}", index, self.len);
        let offset = self.start + index * 8;
        let bytes = &self.map.bytes()[offset..offset + 8];
        u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ])
    }

    fn width(&self) -> usize {
        8
    }
}

/// Raw bytes inside a memory map
pub struct MappedBytes {
    map: SharedMap,
    start: usize,
    len: usize,
}

impl Backing for MappedBytes {
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn get(&self, index: usize) -> u64 {
        assert!(index < self.len, "byte {} out of {}", index, self.len);
        self.map.bytes()[self.start + index] as u64
    }

    fn width(&self) -> usize {
        1
    }
}

/// Binary search over a non-decreasing table: number of elements `<= value`.
pub fn upper_bound(table: &dyn Backing, value: u64) -> usize {
    let mut lo = 0;
    let mut hi = table.len();
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if table.get(mid) <= value {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}
