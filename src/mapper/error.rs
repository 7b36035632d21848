/// Errors that can occur while mapping fields to arrays and back
#[derive(Debug, thiserror::Error)]
pub enum MapperError {
    /// Requested column does not exist in the table
    #[error("Field not found: {0}")]
    FieldNotFound(String),

    /// Column type with no array mapping
    #[error("Unsupported type {data_type} of field '{field}'")]
    UnsupportedFieldType {
        /// Column name
        field: String,
        /// Arrow data type of the column
        data_type: String,
    },

    /// A cell value has no exact representation in the array type
    #[error("Value of field '{field}' at row {row} does not fit into {target}")]
    ValueOutOfRange {
        /// Field name
        field: String,
        /// Row id
        row: usize,
        /// Array element type
        target: &'static str,
    },

    /// Result array does not fit the rows it is written back to
    #[error(
        "Shape mismatch for field '{field}': expected {} line(s) x {} sample(s), got {} x {}",
        expected.0, expected.1, actual.0, actual.1
    )]
    ShapeMismatch {
        /// Field the array is written back to
        field: String,
        /// Expected (lines, samples)
        expected: (usize, usize),
        /// Actual (lines, samples)
        actual: (usize, usize),
    },

    /// Binding refers to a row outside the target table
    #[error("Row {row} of field '{field}' is out of range (table has {row_count} rows)")]
    RowOutOfRange {
        /// Field name
        field: String,
        /// Offending row id
        row: usize,
        /// Rows in the table
        row_count: usize,
    },

    /// A profile cell could not be decoded or rebuilt
    #[error("Cannot decode profile of field '{field}' at row {row}: {reason}")]
    DecodeError {
        /// Field name
        field: String,
        /// Row id
        row: usize,
        /// Decoder message
        reason: String,
    },

    /// Array data does not match its declared shape
    #[error("Invalid array: {0}")]
    InvalidArray(String),

    /// Arrow compute or construction error
    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),
}
