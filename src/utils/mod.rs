//! Utility functions shared by the index and the command-line tool.
//!
//! ## Modules
//!
//! - [`encoding`] - Varint, zigzag and little-endian integer helpers
//! - [`progress`] - Construction spinners (no-op without the `progress` feature)
//!
//! ## Key Functions
//!
//! ```no_run
//! use succinct::utils::line_offsets;
//!
//! // Record starts for newline-delimited text
//! let offsets = line_offsets(b"one\ntwo\n");
//! assert_eq!(offsets, vec![0, 4, 8]);
//! ```

pub mod encoding;
pub mod progress;

pub use encoding::*;

/// Record start offsets for newline-delimited data.
///
/// The first record starts at 0 and every `\n` starts a new record right
/// after it, so newline-terminated data ends with an empty trailing record.
pub fn line_offsets(data: &[u8]) -> Vec<u64> {
    let mut offsets = Vec::with_capacity(data.len() / 64 + 1);
    offsets.push(0);
    offsets.extend(memchr::memchr_iter(b'\n', data).map(|i| i as u64 + 1));
    offsets
}

/// Record start offsets for data split on an arbitrary delimiter byte.
pub fn delimited_offsets(data: &[u8], delimiter: u8) -> Vec<u64> {
    let mut offsets = vec![0];
    offsets.extend(memchr::memchr_iter(delimiter, data).map(|i| i as u64 + 1));
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_offsets() {
        assert_eq!(line_offsets(b""), vec![0]);
        assert_eq!(line_offsets(b"abc"), vec![0]);
        assert_eq!(line_offsets(b"a\nbc\nd"), vec![0, 2, 5]);
        assert_eq!(line_offsets(b"a\n"), vec![0, 2]);
    }

    #[test]
    fn test_delimited_offsets() {
        assert_eq!(delimited_offsets(b"a,b,,c", b','), vec![0, 2, 4, 5]);
    }
}
