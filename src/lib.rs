//! # Succinct - compressed full-text index
//!
//! Succinct stores a byte sequence in a compressed form that still answers
//! random access and substring search queries directly, without
//! decompressing the data. A record layer on top partitions the data into
//! records (lines, log entries, rows) and answers record-level queries.
//!
//! ## Architecture
//!
//! The crate is organized into these main modules:
//!
//! - [`index`] - Construction, the core index, the record layer and persistence
//! - [`bits`] - Rank/select bit vector and bit-packed integer vector
//! - [`storage`] - Owned and memory-mapped table backings
//! - [`error`] - Error type shared by every operation
//! - [`utils`] - Varint encoding, record splitting, progress spinners
//!
//! ## Quick Start
//!
//! ```no_run
//! use succinct::{StorageMode, SuccinctConfig, SuccinctIndexedFile};
//! use std::path::Path;
//!
//! let data = std::fs::read("access.log")?;
//! let offsets = succinct::utils::line_offsets(&data);
//! let file = SuccinctIndexedFile::new(&data, &offsets, &SuccinctConfig::default())?;
//! file.write_to_file(Path::new("access.idx"))?;
//!
//! let file = SuccinctIndexedFile::load(Path::new("access.idx"), StorageMode::MemoryMapped)?;
//! for id in file.record_search_ids(b"GET /health") {
//!     println!("{}", String::from_utf8_lossy(&file.record_bytes(id)?));
//! }
//! # Ok::<(), succinct::Error>(())
//! ```
//!
//! ## Representation
//!
//! The index keeps a sampled suffix array, a sampled inverse suffix array
//! and the next-pointer array (psi) as zigzag varint deltas in sampled
//! blocks. Every query is answered by walking psi from the nearest sample:
//!
//! 1. **Extract** - start at the ISA sample before the offset and step forward
//! 2. **Count** - backward search narrows a rank range one byte at a time
//! 3. **Search** - resolve each rank in the range through the SA samples
//!
//! A loaded index is immutable and can be queried from many threads at once.

pub mod bits;
pub mod error;
pub mod index;
pub mod storage;
pub mod utils;

pub use error::{Error, Result};
pub use index::{
    IndexStats, RecordId, Source, SuccinctConfig, SuccinctCore, SuccinctIndexedFile, construct,
};
pub use storage::StorageMode;
