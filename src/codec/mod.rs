//! # Profile Codec
//!
//! Readers for field-spectrometer files. Each reader turns the raw bytes of one
//! file into a [`ParsedFile`]: the named sub-profiles stored in the file plus
//! file-level metadata (instrument, timestamps, GPS position, ...).
//!
//! ## Supported formats
//!
//! | Format | Extensions | Sub-profiles |
//! |--------|------------|--------------|
//! | [`FileFormat::AsdBinary`] | `.asd`, numbered (`.001`) | `Spectrum`, `Reference` |
//! | [`FileFormat::SpectralEvolution`] | `.sed` | `Reference`, `Target`, `Reflectance` |
//! | [`FileFormat::DelimitedTable`] | `.csv`, `.txt`, `.tsv` | one per value column |
//!
//! Without a format hint the content is sniffed in that order: ASD signature,
//! SED header markers, delimited-table header.
//!
//! ## Example
//!
//! ```
//! use speclib::codec::parse;
//!
//! let profile = parse(b"wavelength,value\n350,0.10\n360,0.12\n", None)?;
//! assert_eq!(profile.values(), &[0.10, 0.12]);
//! # Ok::<(), speclib::codec::CodecError>(())
//! ```
//!
//! Parsing is pure: the readers never touch anything but the given bytes.
//! [`Codec::parse_path`] is the only entry point doing I/O.

mod asd;
mod delimited;
mod error;
mod sed;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use log::debug;

use crate::profile::{MetadataValue, SpectralProfile, UnitPolicy};

pub use error::CodecError;

/// Instrument file formats understood by the codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    /// ASD FieldSpec binary file
    AsdBinary,
    /// Spectral Evolution `.sed` text file
    SpectralEvolution,
    /// Delimited text table: wavelength column followed by profile columns
    DelimitedTable,
}

impl FileFormat {
    /// Short name used on the command line and in metadata
    pub fn name(&self) -> &'static str {
        match self {
            FileFormat::AsdBinary => "asd",
            FileFormat::SpectralEvolution => "sed",
            FileFormat::DelimitedTable => "csv",
        }
    }

    /// Format implied by a file extension (without the dot)
    ///
    /// ASD instruments write numbered files (`spectrum00001.001`), so a purely
    /// numeric extension maps to [`FileFormat::AsdBinary`].
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        match ext.as_str() {
            "asd" => Some(FileFormat::AsdBinary),
            "sed" => Some(FileFormat::SpectralEvolution),
            "csv" | "txt" | "tsv" => Some(FileFormat::DelimitedTable),
            e if !e.is_empty() && e.bytes().all(|b| b.is_ascii_digit()) => {
                Some(FileFormat::AsdBinary)
            }
            _ => None,
        }
    }

    /// Format implied by the extension of `path`
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileFormat::AsdBinary => "ASD binary",
            FileFormat::SpectralEvolution => "Spectral Evolution",
            FileFormat::DelimitedTable => "delimited table",
        };
        write!(f, "{label}")
    }
}

impl FromStr for FileFormat {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asd" | "asdbinary" => Ok(FileFormat::AsdBinary),
            "sed" | "spectralevolution" => Ok(FileFormat::SpectralEvolution),
            "csv" | "txt" | "tsv" | "delimited" => Ok(FileFormat::DelimitedTable),
            _ => Err(CodecError::UnknownFormat),
        }
    }
}

/// A sub-profile of a parsed file
#[derive(Debug, Clone, PartialEq)]
pub struct NamedProfile {
    /// Sub-profile name, e.g. `Spectrum`, `Reference`, `Reflectance`
    pub name: String,
    /// Profile content
    pub profile: SpectralProfile,
}

/// Everything read from one instrument file
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFile {
    /// Format the file was decoded as
    pub format: FileFormat,

    /// Source file name, when parsed from a path
    pub name: Option<String>,

    /// Sub-profiles in file order
    pub profiles: Vec<NamedProfile>,

    /// File-level attributes
    pub metadata: BTreeMap<String, MetadataValue>,

    /// Index of the main sub-profile in `profiles`
    pub primary: usize,
}

impl ParsedFile {
    /// The main profile of the file (`Spectrum` for ASD, `Reflectance` for SED,
    /// the first value column of delimited tables)
    pub fn primary(&self) -> Option<&NamedProfile> {
        self.profiles.get(self.primary)
    }

    /// Sub-profile by name
    pub fn profile(&self, name: &str) -> Option<&SpectralProfile> {
        self.profiles
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.profile)
    }

    /// Sub-profile names in file order
    pub fn profile_names(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.name.as_str()).collect()
    }

    fn into_primary(mut self) -> Result<SpectralProfile, CodecError> {
        if self.primary >= self.profiles.len() {
            return Err(CodecError::malformed(self.format, "file contains no profile"));
        }
        Ok(self.profiles.swap_remove(self.primary).profile)
    }
}

/// Instrument file reader
#[derive(Debug, Clone, Default)]
pub struct Codec {
    policy: UnitPolicy,
}

impl Codec {
    /// Create a codec with the default unit policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `policy` to guess the wavelength unit of files that do not state one
    pub fn with_unit_policy(mut self, policy: UnitPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Unit policy in use
    pub fn unit_policy(&self) -> &UnitPolicy {
        &self.policy
    }

    /// Guess the format of `bytes`
    pub fn detect(&self, bytes: &[u8]) -> Option<FileFormat> {
        detect(bytes)
    }

    /// Parse the primary profile of a file
    pub fn parse(
        &self,
        bytes: &[u8],
        format_hint: Option<FileFormat>,
    ) -> Result<SpectralProfile, CodecError> {
        self.parse_file(bytes, format_hint)?.into_primary()
    }

    /// Parse every sub-profile and the metadata of a file
    pub fn parse_file(
        &self,
        bytes: &[u8],
        format_hint: Option<FileFormat>,
    ) -> Result<ParsedFile, CodecError> {
        let format = match format_hint {
            Some(format) => format,
            None => detect(bytes).ok_or(CodecError::UnknownFormat)?,
        };
        debug!("Parsing {} bytes as {}", bytes.len(), format);

        match format {
            FileFormat::AsdBinary => asd::parse(bytes),
            FileFormat::SpectralEvolution => sed::parse(bytes),
            FileFormat::DelimitedTable => delimited::parse(bytes, &self.policy),
        }
    }

    /// Read and parse a file from disk
    ///
    /// When no hint is given the extension decides, then content sniffing.
    pub fn parse_path<P: AsRef<Path>>(
        &self,
        path: P,
        format_hint: Option<FileFormat>,
    ) -> Result<ParsedFile, CodecError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let hint = format_hint.or_else(|| FileFormat::from_path(path));
        let mut parsed = self.parse_file(&bytes, hint)?;
        parsed.name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        Ok(parsed)
    }
}

/// Guess the format of `bytes` from its content
pub fn detect(bytes: &[u8]) -> Option<FileFormat> {
    if asd::sniff(bytes) {
        Some(FileFormat::AsdBinary)
    } else if sed::sniff(bytes) {
        Some(FileFormat::SpectralEvolution)
    } else if delimited::sniff(bytes) {
        Some(FileFormat::DelimitedTable)
    } else {
        None
    }
}

/// Parse the primary profile of a file with the default unit policy
pub fn parse(bytes: &[u8], format_hint: Option<FileFormat>) -> Result<SpectralProfile, CodecError> {
    Codec::default().parse(bytes, format_hint)
}

/// Parse every sub-profile of a file with the default unit policy
pub fn parse_file(bytes: &[u8], format_hint: Option<FileFormat>) -> Result<ParsedFile, CodecError> {
    Codec::default().parse_file(bytes, format_hint)
}
