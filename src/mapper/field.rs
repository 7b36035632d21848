use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field, TimeUnit};

use super::MapperError;
use crate::schema::{profile_encoding, ProfileEncoding};
use crate::setting::SpectralSetting;

/// Class code reserved for null / no-data text cells
pub const NO_DATA_CLASS: i32 = 0;

pub(crate) const SECONDS_PER_DAY: i64 = 86_400;

/// How a column is turned into an array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Encoded spectral profiles
    Profile(ProfileEncoding),
    /// Signed or unsigned integers
    Integer,
    /// Floating point numbers
    Double,
    /// Booleans
    Boolean,
    /// Strings, mapped to class codes
    Text,
    /// Dates, timestamps and times of day, as whole seconds
    DateTime(TemporalType),
}

/// Source flavour of a [`FieldKind::DateTime`] column
///
/// Dates and timestamps count seconds since 1970-01-01 (UTC), times of day
/// count seconds since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalType {
    /// `Date32` / `Date64`
    Date,
    /// `Timestamp` of any unit and time zone
    Timestamp,
    /// `Time32` / `Time64`
    Time,
}

impl TemporalType {
    /// Arrow type of a column created from seconds
    pub fn data_type(&self) -> DataType {
        match self {
            TemporalType::Date => DataType::Date32,
            TemporalType::Timestamp => DataType::Timestamp(TimeUnit::Second, None),
            TemporalType::Time => DataType::Time32(TimeUnit::Second),
        }
    }
}

impl FieldKind {
    /// Kind of `field`, or [`MapperError::UnsupportedFieldType`]
    pub fn of(field: &Field) -> Result<Self, MapperError> {
        if let Some(encoding) = profile_encoding(field) {
            return Ok(FieldKind::Profile(encoding));
        }
        match field.data_type() {
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64 => Ok(FieldKind::Integer),
            DataType::Float16 | DataType::Float32 | DataType::Float64 => Ok(FieldKind::Double),
            DataType::Boolean => Ok(FieldKind::Boolean),
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => Ok(FieldKind::Text),
            DataType::Date32 | DataType::Date64 => Ok(FieldKind::DateTime(TemporalType::Date)),
            DataType::Timestamp(_, _) => Ok(FieldKind::DateTime(TemporalType::Timestamp)),
            DataType::Time32(_) | DataType::Time64(_) => {
                Ok(FieldKind::DateTime(TemporalType::Time))
            }
            other => Err(MapperError::UnsupportedFieldType {
                field: field.name().clone(),
                data_type: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Profile(ProfileEncoding::Binary) => write!(f, "profile (binary)"),
            FieldKind::Profile(ProfileEncoding::Text) => write!(f, "profile (text)"),
            FieldKind::Integer => write!(f, "integer"),
            FieldKind::Double => write!(f, "double"),
            FieldKind::Boolean => write!(f, "boolean"),
            FieldKind::Text => write!(f, "text"),
            FieldKind::DateTime(TemporalType::Date) => write!(f, "date"),
            FieldKind::DateTime(TemporalType::Timestamp) => write!(f, "timestamp"),
            FieldKind::DateTime(TemporalType::Time) => write!(f, "time"),
        }
    }
}

/// Invertible mapping between the strings of a text field and class codes
///
/// Distinct non-null strings are sorted lexicographically and numbered from 1;
/// [`NO_DATA_CLASS`] (`0`) stands for null.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassMapping {
    classes: Vec<String>,
}

impl ClassMapping {
    /// Mapping over the distinct non-null values
    pub fn from_values<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let distinct: BTreeSet<&str> = values.into_iter().flatten().collect();
        Self {
            classes: distinct.into_iter().map(str::to_string).collect(),
        }
    }

    /// Class code of `value`
    pub fn code(&self, value: &str) -> Option<i32> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok()
            .and_then(|i| i32::try_from(i + 1).ok())
    }

    /// Code of an optional cell, [`NO_DATA_CLASS`] for null or unknown strings
    pub fn encode(&self, value: Option<&str>) -> i32 {
        value.and_then(|v| self.code(v)).unwrap_or(NO_DATA_CLASS)
    }

    /// String of `code`, `None` for [`NO_DATA_CLASS`] and unknown codes
    pub fn decode(&self, code: i64) -> Option<&str> {
        if code <= 0 {
            return None;
        }
        let index = usize::try_from(code - 1).ok()?;
        self.classes.get(index).map(String::as_str)
    }

    /// Class names ordered by code (code `i + 1` at index `i`)
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Number of classes, not counting no-data
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// True without any class
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Describes how one array was produced from a field
///
/// Passed back to [`from_array`](super::from_array) to place results in the
/// rows the array came from.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldBinding {
    /// Source column
    pub field_name: String,
    /// Kind of the source column
    pub kind: FieldKind,
    /// Value used for missing elements in the array
    pub sentinel: f64,
    /// Spectral setting of the array (profile fields only)
    pub setting: Option<Arc<SpectralSetting>>,
    /// Row id of every array sample, in sample order
    pub rows: Vec<usize>,
    /// Number of rows in the source table
    pub row_count: usize,
    /// Class mapping (text fields only)
    pub class_mapping: Option<ClassMapping>,
    /// Value domain (boolean fields: `(0, 1)`)
    pub domain: Option<(i64, i64)>,
}

impl FieldBinding {
    /// Binding of a scalar field covering all `row_count` rows
    pub(crate) fn scalar(field_name: &str, kind: FieldKind, sentinel: f64, row_count: usize) -> Self {
        Self {
            field_name: field_name.to_string(),
            kind,
            sentinel,
            setting: None,
            rows: (0..row_count).collect(),
            row_count,
            class_mapping: None,
            domain: None,
        }
    }

    /// True if the binding was made from a profile field
    pub fn is_profile(&self) -> bool {
        matches!(self.kind, FieldKind::Profile(_))
    }
}
