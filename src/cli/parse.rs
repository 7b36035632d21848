use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use speclib::codec::FileFormat;
use speclib::config::SpeclibConfig;
use speclib::functions::parse_profile_file;

/// Print a parsed instrument file as JSON
pub fn run(file: PathBuf, format: Option<FileFormat>, config: &SpeclibConfig) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {}", file.display());
    }

    info!("Parsing {}", file.display());
    let value = parse_profile_file(&file, format, &config.unit_policy())
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    let json = serde_json::to_string_pretty(&value.to_json())?;
    println!("{json}");
    Ok(())
}
