use super::FileFormat;
use crate::profile::ProfileError;

/// Errors that can occur while reading instrument files
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Content matches none of the supported formats
    #[error("Unknown spectral file format")]
    UnknownFormat,

    /// Content looks like `format` but cannot be decoded
    #[error("Malformed {format} file: {reason}")]
    MalformedFile {
        /// Format the content was read as
        format: FileFormat,
        /// What is wrong (truncation, bad cell with its position, ...)
        reason: String,
    },

    /// Recognized format, but a file version this reader does not handle
    #[error("Unsupported {format} file version: {version}")]
    UnsupportedVersion {
        /// Format the content was read as
        format: FileFormat,
        /// Version string found in the file
        version: String,
    },

    /// I/O error reading the file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Decoded values do not form a valid profile
    #[error("Profile error: {0}")]
    ProfileError(#[from] ProfileError),
}

impl CodecError {
    pub(crate) fn malformed(format: FileFormat, reason: impl Into<String>) -> Self {
        CodecError::MalformedFile {
            format,
            reason: reason.into(),
        }
    }
}
