use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use succinct::utils::progress::phase_spinner;
use succinct::utils::{delimited_offsets, line_offsets};
use succinct::{StorageMode, SuccinctConfig, SuccinctIndexedFile};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "succinct")]
#[command(about = "Compressed full-text index with search over compressed data")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log construction and load details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index over a file and write it
    Construct {
        /// File to index
        input: PathBuf,

        /// Where to write the index
        output: PathBuf,

        /// JSON file with sampling rates
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Suffix array sampling rate
        #[arg(long)]
        sa_rate: Option<u32>,

        /// Inverse suffix array sampling rate
        #[arg(long)]
        isa_rate: Option<u32>,

        /// Next-pointer block size
        #[arg(long)]
        npa_rate: Option<u32>,

        /// Upper bound on distinct byte values in the input
        #[arg(long)]
        alphabet_hint: Option<u32>,

        /// Record delimiter (a single byte, or \n, \t, \0)
        #[arg(short, long, default_value = "\\n", value_parser = parse_delimiter)]
        delimiter: u8,

        /// Hide progress spinners
        #[arg(short, long)]
        quiet: bool,
    },
    /// Print a byte range of the indexed data
    Extract {
        #[command(flatten)]
        index: IndexArgs,

        /// Start offset
        offset: u64,

        /// Number of bytes
        length: u64,
    },
    /// Count occurrences of a pattern
    Count {
        #[command(flatten)]
        index: IndexArgs,

        pattern: String,
    },
    /// Print the offsets of every occurrence of a pattern
    Search {
        #[command(flatten)]
        index: IndexArgs,

        pattern: String,

        /// Print at most this many offsets
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Print one record
    Record {
        #[command(flatten)]
        index: IndexArgs,

        /// Record id
        id: u32,
    },
    /// Print every record containing a pattern
    Grep {
        #[command(flatten)]
        index: IndexArgs,

        pattern: String,

        /// Prefix each record with its id
        #[arg(short = 'i', long)]
        with_ids: bool,

        /// Only print the number of matching records
        #[arg(short, long)]
        count: bool,
    },
    /// Show index statistics
    Stats {
        #[command(flatten)]
        index: IndexArgs,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct IndexArgs {
    /// Index file
    index: PathBuf,

    /// How to load the index
    #[arg(short, long, value_enum, default_value_t = Mode::Memory)]
    mode: Mode,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Copy every table into memory
    Memory,
    /// Map the file and page tables in on access
    Mmap,
}

impl From<Mode> for StorageMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Memory => StorageMode::MemoryOnly,
            Mode::Mmap => StorageMode::MemoryMapped,
        }
    }
}

impl IndexArgs {
    fn load(&self) -> Result<SuccinctIndexedFile> {
        SuccinctIndexedFile::load(&self.index, self.mode.into())
            .with_context(|| format!("Failed to load index {}", self.index.display()))
    }
}

fn parse_delimiter(s: &str) -> std::result::Result<u8, String> {
    match s {
        "\\n" => Ok(b'\n'),
        "\\t" => Ok(b'\t'),
        "\\0" => Ok(0),
        _ if s.len() == 1 => Ok(s.as_bytes()[0]),
        _ => Err(format!("delimiter must be a single byte, got {:?}", s)),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match cli.command {
        Commands::Construct {
            input,
            output,
            config,
            sa_rate,
            isa_rate,
            npa_rate,
            alphabet_hint,
            delimiter,
            quiet,
        } => {
            let mut config = match config {
                Some(path) => SuccinctConfig::from_json_file(&path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?,
                None => SuccinctConfig::default(),
            };
            if let Some(rate) = sa_rate {
                config.sa_sampling_rate = rate;
            }
            if let Some(rate) = isa_rate {
                config.isa_sampling_rate = rate;
            }
            if let Some(rate) = npa_rate {
                config.npa_sampling_rate = rate;
            }
            if alphabet_hint.is_some() {
                config.alphabet_size_hint = alphabet_hint;
            }
            construct(&input, &output, &config, delimiter, quiet)?;
        }
        Commands::Extract {
            index,
            offset,
            length,
        } => {
            let file = index.load()?;
            out.write_all(&file.extract(offset, length)?)?;
        }
        Commands::Count { index, pattern } => {
            let file = index.load()?;
            writeln!(out, "{}", file.count(pattern.as_bytes()))?;
        }
        Commands::Search {
            index,
            pattern,
            limit,
        } => {
            let file = index.load()?;
            let offsets = file.search(pattern.as_bytes());
            for offset in offsets.iter().take(limit.unwrap_or(usize::MAX)) {
                writeln!(out, "{}", offset)?;
            }
        }
        Commands::Record { index, id } => {
            let file = index.load()?;
            out.write_all(&file.record_bytes(id)?)?;
        }
        Commands::Grep {
            index,
            pattern,
            with_ids,
            count,
        } => {
            let file = index.load()?;
            let ids = file.record_search_ids(pattern.as_bytes());
            if count {
                writeln!(out, "{}", ids.len())?;
            } else {
                for id in &ids {
                    if with_ids {
                        write!(out, "{}:", id)?;
                    }
                    let record = file.record_bytes(id)?;
                    out.write_all(&record)?;
                    if record.last() != Some(&b'\n') {
                        writeln!(out)?;
                    }
                }
            }
        }
        Commands::Stats { index, json } => {
            let file = index.load()?;
            let stats = file.stats();
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&stats)?)?;
            } else {
                writeln!(out, "Index file:       {}", index.index.display())?;
                writeln!(out, "{}", stats)?;
            }
        }
    }

    out.flush()?;
    Ok(())
}

fn construct(
    input: &Path,
    output: &Path,
    config: &SuccinctConfig,
    delimiter: u8,
    quiet: bool,
) -> Result<()> {
    let spinner = phase_spinner("Reading input", quiet);
    let data = std::fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    if data.is_empty() {
        bail!("{} is empty", input.display());
    }
    let offsets = if delimiter == b'\n' {
        line_offsets(&data)
    } else {
        delimited_offsets(&data, delimiter)
    };
    spinner.finish_and_clear();

    let spinner = phase_spinner("Building index", quiet);
    let file = SuccinctIndexedFile::new(&data, &offsets, config)
        .with_context(|| format!("Failed to index {}", input.display()))?;
    spinner.finish_and_clear();

    let spinner = phase_spinner("Writing index", quiet);
    file.write_to_file(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    spinner.finish_and_clear();

    if !quiet {
        let stats = file.stats();
        eprintln!(
            "Indexed {} records ({} bytes) into {} ({:.3} of original)",
            stats.record_count,
            stats.data_len,
            output.display(),
            stats.layout_bytes as f64 / stats.data_len as f64,
        );
    }
    Ok(())
}
