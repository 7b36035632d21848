use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use speclib::codec::FileFormat;
use speclib::config::SpeclibConfig;
use speclib::library::CompressionType;

mod groups;
mod import;
mod info;
mod parse;

/// speclib - Spectral Library Tool
#[derive(Parser)]
#[command(name = "speclib")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Load settings from a TOML config file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Instrument file format override.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FormatArg {
    /// ASD FieldSpec binary
    Asd,
    /// Spectral Evolution text file
    Sed,
    /// Delimited table (CSV/TSV)
    Csv,
}

impl From<FormatArg> for FileFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Asd => FileFormat::AsdBinary,
            FormatArg::Sed => FileFormat::SpectralEvolution,
            FormatArg::Csv => FileFormat::DelimitedTable,
        }
    }
}

/// Library compression codec.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CompressionArg {
    /// ZSTD (default level unless configured)
    Zstd,
    /// Snappy
    Snappy,
    /// No compression
    None,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an instrument file and print it as JSON
    Parse {
        /// Input spectrometer file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Input format (detected from content and extension when omitted)
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,
    },

    /// Import instrument files into a Parquet spectral library
    Import {
        /// Input spectrometer files
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,

        /// Output library file
        #[arg(short, long, value_name = "OUT")]
        output: PathBuf,

        /// Compression codec (defaults to the config file, then zstd)
        #[arg(short, long, value_enum)]
        compression: Option<CompressionArg>,
    },

    /// Print the spectral-setting groups of a library
    Groups {
        /// Library file
        #[arg(value_name = "LIBRARY")]
        library: PathBuf,

        /// Profile field to group (all profile fields when omitted)
        #[arg(short, long, value_name = "NAME")]
        field: Option<String>,
    },

    /// Display schema and row count of a library
    Info {
        /// Library file
        #[arg(value_name = "LIBRARY")]
        library: PathBuf,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

fn load_config(path: Option<&Path>) -> Result<SpeclibConfig> {
    match path {
        Some(path) => SpeclibConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(SpeclibConfig::default()),
    }
}

/// Command-line choice first, then the config file, then the library default
fn resolve_compression(
    arg: Option<CompressionArg>,
    config: &SpeclibConfig,
) -> Result<CompressionType> {
    let configured = config
        .compression()
        .context("Invalid compression in config file")?;
    Ok(match (arg, configured) {
        (Some(CompressionArg::Zstd), Some(CompressionType::Zstd(level))) => {
            CompressionType::Zstd(level)
        }
        (Some(CompressionArg::Zstd), _) => CompressionType::default(),
        (Some(CompressionArg::Snappy), _) => CompressionType::Snappy,
        (Some(CompressionArg::None), _) => CompressionType::Uncompressed,
        (None, configured) => configured.unwrap_or_default(),
    })
}

pub fn dispatch(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Parse { file, format } => parse::run(file, format.map(FileFormat::from), &config),
        Commands::Import {
            files,
            output,
            compression,
        } => {
            let compression = resolve_compression(compression, &config)?;
            import::run(files, output, compression, &config)
        }
        Commands::Groups { library, field } => groups::run(library, field, &config),
        Commands::Info { library } => info::run(library),
    }
}
