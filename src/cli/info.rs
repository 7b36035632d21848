use anyhow::{Context, Result};
use std::path::PathBuf;

use speclib::library::read_parquet;
use speclib::mapper::FieldKind;
use speclib::schema::FORMAT_VERSION_KEY;

/// Display schema, row count and field kinds of a library
pub fn run(library: PathBuf) -> Result<()> {
    if !library.exists() {
        anyhow::bail!("File does not exist: {}", library.display());
    }

    let stored = read_parquet(&library)
        .with_context(|| format!("Failed to read library {}", library.display()))?;
    let schema = stored.batch.schema();

    println!("Spectral Library Information");
    println!("============================");
    println!("File: {}", library.display());
    println!(
        "Format version: {}",
        stored.format_version().unwrap_or("<missing>")
    );
    println!("Rows: {}", stored.batch.num_rows());
    println!();

    println!("Fields:");
    for (i, field) in schema.fields().iter().enumerate() {
        let kind = match FieldKind::of(field) {
            Ok(kind) => kind.to_string(),
            Err(_) => "unsupported".to_string(),
        };
        let nulls = stored.batch.column(i).null_count();
        println!(
            "  {:3}. {} ({}) - {}, {} null(s)",
            i + 1,
            field.name(),
            field.data_type(),
            kind,
            nulls
        );
    }

    let extra: Vec<_> = stored
        .metadata
        .iter()
        .filter(|(k, _)| k.as_str() != FORMAT_VERSION_KEY)
        .collect();
    if !extra.is_empty() {
        println!();
        println!("Metadata Keys:");
        for (key, value) in extra {
            let preview = if value.len() > 100 {
                let head: String = value.chars().take(100).collect();
                format!("{}... ({} bytes)", head, value.len())
            } else {
                value.clone()
            };
            println!("  {key}: {preview}");
        }
    }
    Ok(())
}
