use super::file::SuccinctIndexedFile;
use super::writer::IndexWriter;
use crate::storage::StorageMode;
use serde::Serialize;
use std::fmt;

/// Byte size of each table in an index
#[derive(Debug, Clone, Serialize)]
pub struct TableSizes {
    pub record_offsets: usize,
    pub alphabet: usize,
    pub columns: usize,
    pub sa_marks: usize,
    pub sa_samples: usize,
    pub isa_samples: usize,
    pub npa_samples: usize,
    pub npa_offsets: usize,
    pub npa_deltas: usize,
}

/// Size and configuration summary of an indexed file
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub data_len: u64,
    pub record_count: usize,
    pub alphabet_size: usize,
    pub sa_sampling_rate: u32,
    pub isa_sampling_rate: u32,
    pub npa_sampling_rate: u32,
    pub storage_mode: StorageMode,
    pub tables: TableSizes,
    /// Bytes held by the core tables
    pub compressed_bytes: usize,
    /// Bytes of the persisted layout
    pub layout_bytes: usize,
    /// `compressed_bytes / data_len`
    pub compression_ratio: f64,
}

impl IndexStats {
    pub fn collect(file: &SuccinctIndexedFile) -> Self {
        let core = file.core();
        let (sa, isa, npa) = core.sampling_rates();
        let compressed_bytes = core.compressed_size();
        Self {
            data_len: core.original_size(),
            record_count: file.record_count(),
            alphabet_size: core.alphabet_size(),
            sa_sampling_rate: sa,
            isa_sampling_rate: isa,
            npa_sampling_rate: npa,
            storage_mode: file.storage_mode(),
            tables: TableSizes {
                record_offsets: file.offsets().size_in_bytes(),
                alphabet: core.alphabet().size_in_bytes(),
                columns: core.columns().size_in_bytes(),
                sa_marks: core.sa_marks().size_in_bytes(),
                sa_samples: core.sa_samples().size_in_bytes(),
                isa_samples: core.isa_samples().size_in_bytes(),
                npa_samples: core.npa_samples().size_in_bytes(),
                npa_offsets: core.npa_offsets().size_in_bytes(),
                npa_deltas: core.npa_deltas().size_in_bytes(),
            },
            compressed_bytes,
            layout_bytes: IndexWriter::encoded_len(file),
            compression_ratio: compressed_bytes as f64 / core.original_size() as f64,
        }
    }
}

impl fmt::Display for IndexStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Index Statistics")?;
        writeln!(f, "================")?;
        writeln!(f)?;
        writeln!(f, "Storage mode:     {}", self.storage_mode)?;
        writeln!(f, "Data size:        {}", format_size(self.data_len))?;
        writeln!(f, "Record count:     {}", self.record_count)?;
        writeln!(f, "Alphabet size:    {}", self.alphabet_size)?;
        writeln!(
            f,
            "Sampling rates:   SA {} / ISA {} / NPA {}",
            self.sa_sampling_rate, self.isa_sampling_rate, self.npa_sampling_rate
        )?;

        writeln!(f)?;
        writeln!(f, "Tables:")?;
        let t = &self.tables;
        for (name, size) in [
            ("record offsets", t.record_offsets),
            ("alphabet", t.alphabet),
            ("column starts", t.columns),
            ("SA marks", t.sa_marks),
            ("SA samples", t.sa_samples),
            ("ISA samples", t.isa_samples),
            ("NPA samples", t.npa_samples),
            ("NPA offsets", t.npa_offsets),
            ("NPA deltas", t.npa_deltas),
        ] {
            writeln!(f, "  {:15} {}", name, format_size(size as u64))?;
        }

        writeln!(f)?;
        writeln!(f, "Compressed size:  {}", format_size(self.compressed_bytes as u64))?;
        writeln!(f, "Layout size:      {}", format_size(self.layout_bytes as u64))?;
        write!(f, "Ratio:            {:.3}", self.compression_ratio)
    }
}

/// Format byte size to human readable
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::types::SuccinctConfig;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn test_collect() {
        let data = b"to be or not to be\nthat is the question\n";
        let offsets = crate::utils::line_offsets(data);
        let file = SuccinctIndexedFile::new(data.as_slice(), &offsets, &SuccinctConfig::default()).unwrap();
        let stats = file.stats();

        assert_eq!(stats.data_len, data.len() as u64);
        assert_eq!(stats.record_count, 3);
        assert_eq!(stats.storage_mode, StorageMode::MemoryOnly);
        assert_eq!(stats.tables.record_offsets, 24);
        assert_eq!(stats.layout_bytes, file.to_bytes().unwrap().len());
        assert!(stats.compression_ratio > 0.0);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["storage_mode"], "memory_only");
        assert!(stats.to_string().contains("Record count:     3"));
    }
}
