//! Error types for index construction, loading and queries.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Error variants for succinct index operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid input to construction: empty data, bad offsets or bad configuration.
    #[error("construction failed: {0}")]
    Construction(String),

    /// A persisted layout failed header, version or table validation.
    #[error("corrupt index layout: {0}")]
    Corruption(String),

    /// A byte range outside the indexed data.
    #[error("range {offset}+{length} out of bounds for data of length {data_len}")]
    OutOfRange {
        offset: u64,
        length: u64,
        data_len: u64,
    },

    /// A record id outside `[0, record_count)`.
    #[error("record {id} out of bounds ({count} records)")]
    IndexOutOfRange { id: u64, count: u64 },

    /// Opening or mapping a backing file failed.
    #[error("cannot access {}: {source}", path.display())]
    Resource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An I/O error while writing or reading a stream.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn construction(msg: impl Into<String>) -> Self {
        Error::Construction(msg.into())
    }

    pub(crate) fn corruption(msg: impl Into<String>) -> Self {
        Error::Corruption(msg.into())
    }

    pub(crate) fn resource(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Resource {
            path: path.into(),
            source,
        }
    }

    /// Turns an early end of stream into a corruption error.
    pub(crate) fn from_read(err: io::Error, what: &str) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::Corruption(format!("truncated layout while reading {}", what))
        } else {
            Error::Io(err)
        }
    }
}

/// A specialized Result type for succinct index operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_read_is_corruption() {
        let err = Error::from_read(io::Error::from(io::ErrorKind::UnexpectedEof), "header");
        assert!(matches!(err, Error::Corruption(_)));

        let err = Error::from_read(io::Error::from(io::ErrorKind::PermissionDenied), "header");
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_display() {
        let err = Error::IndexOutOfRange { id: 7, count: 4 };
        assert_eq!(err.to_string(), "record 7 out of bounds (4 records)");
    }
}
