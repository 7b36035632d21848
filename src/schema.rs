//! # Spectral Library Schema Conventions
//!
//! Attribute tables are Arrow [`RecordBatch`](arrow::record_batch::RecordBatch)es.
//! Columns holding spectral profiles are ordinary `Binary` (or `Utf8`) columns
//! whose [`Field`] carries the metadata entry `speclib:profile`; every cell is
//! one encoded profile (see [`crate::profile::encode_profile`]).
//!
//! | Metadata key | Where | Meaning |
//! |--------------|-------|---------|
//! | `speclib:profile` | field | `binary` or `text`: the column stores encoded profiles |
//! | `speclib:nodata` | field | declared no-data value of a numeric column |
//! | `speclib:format_version` | Parquet footer | library format version |
//!
//! Library tables written by [`crate::library::LibraryBuilder`] always start with
//! the `name` and `source_format` columns.

use std::collections::HashMap;

use arrow::datatypes::{DataType, Field};

/// Spectral library format version - follows semantic versioning
pub const SPECLIB_FORMAT_VERSION: &str = "1.0.0";

/// Field metadata key marking profile columns
pub const PROFILE_METADATA_KEY: &str = "speclib:profile";

/// Field metadata key holding a declared no-data value
pub const NODATA_METADATA_KEY: &str = "speclib:nodata";

/// Parquet footer key holding [`SPECLIB_FORMAT_VERSION`]
pub const FORMAT_VERSION_KEY: &str = "speclib:format_version";

/// Column with the profile / file name
pub const NAME_COLUMN: &str = "name";

/// Column with the instrument format a row was imported from
pub const SOURCE_FORMAT_COLUMN: &str = "source_format";

/// Profile column of rows imported from delimited tables
pub const DELIMITED_PROFILE_COLUMN: &str = "Spectrum";

/// Storage of profile cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfileEncoding {
    /// `Binary` column of UTF-8 JSON bytes
    #[default]
    Binary,
    /// `Utf8` column of JSON text
    Text,
}

impl ProfileEncoding {
    /// Metadata value written under [`PROFILE_METADATA_KEY`]
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileEncoding::Binary => "binary",
            ProfileEncoding::Text => "text",
        }
    }

    /// Arrow type of the column
    pub fn data_type(&self) -> DataType {
        match self {
            ProfileEncoding::Binary => DataType::Binary,
            ProfileEncoding::Text => DataType::Utf8,
        }
    }
}

/// Nullable profile column named `name`
pub fn profile_field(name: &str, encoding: ProfileEncoding) -> Field {
    let mut metadata = HashMap::new();
    metadata.insert(PROFILE_METADATA_KEY.to_string(), encoding.as_str().to_string());
    Field::new(name, encoding.data_type(), true).with_metadata(metadata)
}

/// Profile encoding of `field`, `None` for ordinary attribute columns
///
/// A field is a profile field when it carries the `speclib:profile` marker
/// and has a matching storage type.
pub fn profile_encoding(field: &Field) -> Option<ProfileEncoding> {
    let marker = field.metadata().get(PROFILE_METADATA_KEY)?;
    match (marker.as_str(), field.data_type()) {
        ("binary", DataType::Binary | DataType::LargeBinary) => Some(ProfileEncoding::Binary),
        ("text", DataType::Utf8 | DataType::LargeUtf8) => Some(ProfileEncoding::Text),
        // Marker value is advisory; the storage type decides
        (_, DataType::Binary | DataType::LargeBinary) => Some(ProfileEncoding::Binary),
        (_, DataType::Utf8 | DataType::LargeUtf8) => Some(ProfileEncoding::Text),
        _ => None,
    }
}

/// True if `field` stores encoded profiles
pub fn is_profile_field(field: &Field) -> bool {
    profile_encoding(field).is_some()
}

/// Declared no-data value of `field`, if any
pub fn declared_no_data(field: &Field) -> Option<f64> {
    field
        .metadata()
        .get(NODATA_METADATA_KEY)
        .and_then(|v| v.trim().parse::<f64>().ok())
}

/// Copy of `field` declaring `no_data` as its no-data value
pub fn with_no_data(field: Field, no_data: f64) -> Field {
    let mut metadata = field.metadata().clone();
    metadata.insert(NODATA_METADATA_KEY.to_string(), no_data.to_string());
    field.with_metadata(metadata)
}
