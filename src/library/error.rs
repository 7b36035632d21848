use thiserror::Error;

/// Errors raised while building, writing or reading spectral libraries
#[derive(Error, Debug)]
pub enum LibraryError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from the Arrow library
    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    /// Error from the Parquet library
    #[error("Parquet error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),

    /// A profile could not be encoded
    #[error("Profile error: {0}")]
    ProfileError(#[from] crate::profile::ProfileError),

    /// Unknown compression name
    #[error("Unknown compression: {0} (expected zstd, snappy or none)")]
    UnknownCompression(String),

    /// A profile column name collides with a fixed column
    #[error("Profile name '{0}' collides with a library column")]
    ReservedName(String),
}
