use anyhow::{Context, Result};
use log::{info, warn};
use std::path::PathBuf;

use speclib::codec::Codec;
use speclib::config::SpeclibConfig;
use speclib::library::{write_parquet, CompressionType, LibraryBuilder};

/// Import instrument files into a Parquet library
pub fn run(
    files: Vec<PathBuf>,
    output: PathBuf,
    compression: CompressionType,
    config: &SpeclibConfig,
) -> Result<()> {
    let codec = Codec::new().with_unit_policy(config.unit_policy());
    let mut builder = LibraryBuilder::new();
    let mut failed = 0usize;

    for file in &files {
        match codec.parse_path(file, None) {
            Ok(parsed) => {
                info!(
                    "{}: {} ({} profile(s))",
                    file.display(),
                    parsed.format.name(),
                    parsed.profiles.len()
                );
                builder
                    .add_file(&parsed)
                    .with_context(|| format!("Failed to add {}", file.display()))?;
            }
            Err(e) => {
                warn!("Skipping {}: {}", file.display(), e);
                failed += 1;
            }
        }
    }

    if builder.is_empty() {
        anyhow::bail!("None of the {} input file(s) could be parsed", files.len());
    }

    let imported = files.len() - failed;
    let rows = builder.len();
    let batch = builder.finish().context("Failed to build library table")?;
    write_parquet(&output, &batch, compression)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Import complete!");
    println!("  Files imported: {imported}");
    println!("  Files skipped: {failed}");
    println!("  Library rows: {rows}");
    println!("  Profile columns: {}", batch.num_columns() - 2);
    println!("  Output: {}", output.display());
    Ok(())
}
