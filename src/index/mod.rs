pub mod builder;
pub mod core;
pub mod file;
pub mod reader;
pub mod stats;
pub mod types;
pub mod writer;

pub use self::core::SuccinctCore;
pub use file::SuccinctIndexedFile;
pub use reader::IndexReader;
pub use stats::IndexStats;
pub use types::*;
pub use writer::{IndexWriter, construct};
