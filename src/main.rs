//! # speclib
//!
//! Command-line tool for spectral libraries.
//!
//! ## Usage
//!
//! ```bash
//! # Print a parsed instrument file as JSON
//! speclib parse leaf_01.asd
//!
//! # Build a Parquet library from instrument files
//! speclib import *.asd *.sed -o leaves.parquet
//!
//! # List the spectral settings in a library
//! speclib groups leaves.parquet --field Spectrum
//!
//! # Show schema and field kinds
//! speclib info leaves.parquet
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
