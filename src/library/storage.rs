use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use log::{info, warn};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use parquet::format::KeyValue;

use super::LibraryError;
use crate::schema::{FORMAT_VERSION_KEY, SPECLIB_FORMAT_VERSION};

/// Footer key under which Arrow stores its schema
const ARROW_SCHEMA_KEY: &str = "ARROW:schema";

/// Compression options for library files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    /// ZSTD compression at the given level
    Zstd(i32),
    /// Snappy compression (faster, larger files)
    Snappy,
    /// No compression
    Uncompressed,
}

impl Default for CompressionType {
    fn default() -> Self {
        Self::Zstd(3)
    }
}

impl CompressionType {
    fn to_parquet(self) -> Compression {
        match self {
            CompressionType::Zstd(level) => {
                Compression::ZSTD(ZstdLevel::try_new(level).unwrap_or_default())
            }
            CompressionType::Snappy => Compression::SNAPPY,
            CompressionType::Uncompressed => Compression::UNCOMPRESSED,
        }
    }
}

impl FromStr for CompressionType {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "zstd" => Ok(Self::default()),
            "snappy" => Ok(Self::Snappy),
            "none" | "uncompressed" => Ok(Self::Uncompressed),
            other => Err(LibraryError::UnknownCompression(other.to_string())),
        }
    }
}

/// A library read back from disk
#[derive(Debug, Clone)]
pub struct StoredLibrary {
    /// All rows in one batch
    pub batch: RecordBatch,
    /// Footer key/value metadata, without the embedded Arrow schema
    pub metadata: HashMap<String, String>,
}

impl StoredLibrary {
    /// Format version written into the footer
    pub fn format_version(&self) -> Option<&str> {
        self.metadata.get(FORMAT_VERSION_KEY).map(String::as_str)
    }
}

/// Write a library batch to a Parquet file
pub fn write_parquet<P: AsRef<Path>>(
    path: P,
    batch: &RecordBatch,
    compression: CompressionType,
) -> Result<(), LibraryError> {
    let path = path.as_ref();
    let props = WriterProperties::builder()
        .set_compression(compression.to_parquet())
        .set_key_value_metadata(Some(vec![KeyValue {
            key: FORMAT_VERSION_KEY.to_string(),
            value: Some(SPECLIB_FORMAT_VERSION.to_string()),
        }]))
        .build();

    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;

    info!(
        "Wrote {} profile row(s) to {} ({:?})",
        batch.num_rows(),
        path.display(),
        compression
    );
    Ok(())
}

/// Read a library file written by [`write_parquet`]
pub fn read_parquet<P: AsRef<Path>>(path: P) -> Result<StoredLibrary, LibraryError> {
    let path = path.as_ref();
    let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?;

    let mut metadata = HashMap::new();
    if let Some(kv_list) = builder.metadata().file_metadata().key_value_metadata() {
        for kv in kv_list {
            if kv.key == ARROW_SCHEMA_KEY {
                continue;
            }
            if let Some(value) = &kv.value {
                metadata.insert(kv.key.clone(), value.clone());
            }
        }
    }

    match metadata.get(FORMAT_VERSION_KEY) {
        Some(version) if major(version) != major(SPECLIB_FORMAT_VERSION) => warn!(
            "{} was written with library format {}, this build reads {}",
            path.display(),
            version,
            SPECLIB_FORMAT_VERSION
        ),
        None => warn!("{} has no {} footer entry", path.display(), FORMAT_VERSION_KEY),
        _ => {}
    }

    let schema = builder.schema().clone();
    let batches = builder.build()?.collect::<Result<Vec<_>, _>>()?;
    let batch = concat_batches(&schema, &batches)?;

    Ok(StoredLibrary { batch, metadata })
}

fn major(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}
