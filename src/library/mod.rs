//! # Spectral Library Storage
//!
//! A spectral library is an Arrow table with one row per imported instrument
//! file and one row per value column of an imported delimited table:
//!
//! | Column | Type | Content |
//! |--------|------|---------|
//! | `name` | Utf8 | file name, or the column header of a delimited table |
//! | `source_format` | Utf8 | `asd`, `sed` or `csv` |
//! | one per sub-profile name | Binary (profile field) | encoded profile, null if the row has no such profile |
//!
//! Rows from delimited tables keep their profile in the `Spectrum` column.
//!
//! [`LibraryBuilder`] assembles the table from parsed files, and
//! [`write_parquet`] / [`read_parquet`] store it as a Parquet file whose
//! footer carries the library format version.
//!
//! ```no_run
//! use speclib::codec::Codec;
//! use speclib::library::{write_parquet, CompressionType, LibraryBuilder};
//!
//! let mut builder = LibraryBuilder::new();
//! builder.add_file(&Codec::new().parse_path("leaf.asd", None)?)?;
//! write_parquet("leaves.parquet", &builder.finish()?, CompressionType::default())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod storage;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{ArrayRef, BinaryArray, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use log::debug;

use crate::codec::{FileFormat, NamedProfile, ParsedFile};
use crate::profile::{encode_profile, SpectralProfile};
use crate::schema::{
    profile_field, ProfileEncoding, DELIMITED_PROFILE_COLUMN, FORMAT_VERSION_KEY, NAME_COLUMN,
    SOURCE_FORMAT_COLUMN, SPECLIB_FORMAT_VERSION,
};

/// Encoded cells of one row in sub-profile order
type RowCells = Vec<(String, Vec<u8>)>;

pub use error::LibraryError;
pub use storage::{read_parquet, write_parquet, CompressionType, StoredLibrary};

/// Collects parsed files into a library table
#[derive(Debug, Default)]
pub struct LibraryBuilder {
    names: Vec<Option<String>>,
    formats: Vec<String>,
    /// Profile columns in first-seen order; each holds one cell per row so far
    profiles: Vec<(String, Vec<Option<Vec<u8>>>)>,
}

impl LibraryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows added so far
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Add a parsed file.
    ///
    /// Instrument files become one row named after the file with a column per
    /// sub-profile. Every value column of a delimited table becomes its own
    /// row, named after the column header, with the profile in
    /// [`DELIMITED_PROFILE_COLUMN`]. Nothing is added if any profile fails to
    /// encode.
    pub fn add_file(&mut self, file: &ParsedFile) -> Result<(), LibraryError> {
        let format = file.format.name();
        if file.format != FileFormat::DelimitedTable {
            return self.add_profiles(file.name.as_deref(), format, &file.profiles);
        }

        let rows = file
            .profiles
            .iter()
            .map(|named| encode_row([(DELIMITED_PROFILE_COLUMN, &named.profile)]))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            "Delimited table {:?}: {} row(s)",
            file.name.as_deref().unwrap_or("<memory>"),
            rows.len()
        );
        for (named, cells) in file.profiles.iter().zip(rows) {
            self.push_row(Some(named.name.as_str()), format, cells);
        }
        Ok(())
    }

    /// Add one row from named profiles
    pub fn add_profiles(
        &mut self,
        name: Option<&str>,
        source_format: &str,
        profiles: &[NamedProfile],
    ) -> Result<(), LibraryError> {
        let cells = encode_row(profiles.iter().map(|p| (p.name.as_str(), &p.profile)))?;
        self.push_row(name, source_format, cells);
        Ok(())
    }

    fn push_row(&mut self, name: Option<&str>, source_format: &str, cells: RowCells) {
        let row = self.len();
        for (column, _) in &cells {
            if !self.profiles.iter().any(|(existing, _)| existing == column) {
                debug!("New profile column '{}' at row {}", column, row);
                self.profiles.push((column.clone(), vec![None; row]));
            }
        }
        let mut cells: HashMap<String, Vec<u8>> = cells.into_iter().collect();
        for (column, values) in &mut self.profiles {
            values.push(cells.remove(column.as_str()));
        }

        self.names.push(name.map(str::to_string));
        self.formats.push(source_format.to_string());
    }

    /// Schema of the table built so far
    pub fn schema(&self) -> Schema {
        let mut fields = vec![
            Field::new(NAME_COLUMN, DataType::Utf8, true),
            Field::new(SOURCE_FORMAT_COLUMN, DataType::Utf8, false),
        ];
        fields.extend(
            self.profiles
                .iter()
                .map(|(column, _)| profile_field(column, ProfileEncoding::Binary)),
        );
        let metadata = HashMap::from([(
            FORMAT_VERSION_KEY.to_string(),
            SPECLIB_FORMAT_VERSION.to_string(),
        )]);
        Schema::new_with_metadata(fields, metadata)
    }

    /// Build the table
    pub fn finish(self) -> Result<RecordBatch, LibraryError> {
        let schema = Arc::new(self.schema());
        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(self.names)),
            Arc::new(StringArray::from(self.formats)),
        ];
        for (_, values) in self.profiles {
            columns.push(Arc::new(BinaryArray::from_iter(values)));
        }
        Ok(RecordBatch::try_new(schema, columns)?)
    }
}

fn encode_row<'a, I>(profiles: I) -> Result<RowCells, LibraryError>
where
    I: IntoIterator<Item = (&'a str, &'a SpectralProfile)>,
{
    let mut cells = RowCells::new();
    for (name, profile) in profiles {
        if name == NAME_COLUMN || name == SOURCE_FORMAT_COLUMN {
            return Err(LibraryError::ReservedName(name.to_string()));
        }
        cells.push((name.to_string(), encode_profile(profile)?));
    }
    Ok(cells)
}
