use anyhow::{Context, Result};
use std::path::PathBuf;

use speclib::config::SpeclibConfig;
use speclib::library::read_parquet;
use speclib::mapper::to_arrays;
use speclib::schema::is_profile_field;
use speclib::setting::SettingCache;

/// Print the spectral-setting groups of a library
pub fn run(library: PathBuf, field: Option<String>, config: &SpeclibConfig) -> Result<()> {
    let stored = read_parquet(&library)
        .with_context(|| format!("Failed to read library {}", library.display()))?;
    let schema = stored.batch.schema();

    let fields: Vec<&str> = match &field {
        Some(name) => vec![name.as_str()],
        None => schema
            .fields()
            .iter()
            .filter(|f| is_profile_field(f))
            .map(|f| f.name().as_str())
            .collect(),
    };
    if fields.is_empty() {
        println!("No profile fields in {}", library.display());
        return Ok(());
    }

    let mut cache = SettingCache::with_unit_policy(config.unit_policy());
    let arrays = to_arrays(&stored.batch, &fields, &mut cache, &config.mapper_options())
        .context("Failed to map profiles to arrays")?;

    for name in &fields {
        let Some(field_arrays) = arrays.get(*name) else {
            continue;
        };
        println!("{name}:");
        for batch in &field_arrays.batches {
            let setting = batch
                .binding
                .setting
                .as_ref()
                .map(|s| s.describe())
                .unwrap_or_default();
            println!("  [{}] {} row(s): {:?}", setting, batch.binding.rows.len(), batch.binding.rows);
        }
        if !field_arrays.skipped_rows.is_empty() {
            let rows: Vec<usize> = field_arrays.skipped_rows.iter().map(|s| s.row).collect();
            println!("  skipped: {rows:?}");
        }
    }
    println!("{} distinct setting(s)", cache.len());
    Ok(())
}
