use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BinaryArray, BooleanArray, Date32Array, Float64Array, Int64Array,
    StringArray, Time32SecondArray, TimestampSecondArray,
};
use arrow::compute::cast;
use arrow::compute::kernels::zip::zip;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use log::{debug, info};

use super::field::SECONDS_PER_DAY;
use super::{FieldBinding, FieldKind, MapperError, RasterArray, TemporalType};
use crate::profile::{encode_profile, SpectralProfile, SpectralProfileBuilder};
use crate::schema::{profile_field, ProfileEncoding};

/// Value for one table cell produced from a result array
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// No data
    Null,
    /// Integer result
    Integer(i64),
    /// Floating point result
    Double(f64),
    /// Class name of a class-code result
    Text(String),
    /// Multi-band result
    Profile(SpectralProfile),
}

/// Column kind a result array is written as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// Binary profile column (result has more than one band)
    Profile,
    /// `Int64` column (single band, integral data)
    Integer,
    /// `Float64` column (single band, floating point data)
    Double,
    /// `Utf8` column (single band class codes of a text source)
    Text,
    /// Date, timestamp or time column (single band seconds of a temporal source)
    Temporal(TemporalType),
}

impl TargetKind {
    /// Arrow type of a newly created column
    pub fn data_type(&self) -> DataType {
        match self {
            TargetKind::Profile => ProfileEncoding::Binary.data_type(),
            TargetKind::Integer => DataType::Int64,
            TargetKind::Double => DataType::Float64,
            TargetKind::Text => DataType::Utf8,
            TargetKind::Temporal(temporal) => temporal.data_type(),
        }
    }
}

/// Column kind `result` is written back as, given the binding of its source
pub fn target_kind(result: &RasterArray, source: &FieldBinding) -> TargetKind {
    if result.bands() > 1 {
        TargetKind::Profile
    } else if result.is_integral() {
        match (&source.kind, &source.class_mapping) {
            (FieldKind::Text, Some(_)) => TargetKind::Text,
            (FieldKind::DateTime(temporal), _) => TargetKind::Temporal(*temporal),
            _ => TargetKind::Integer,
        }
    } else {
        TargetKind::Double
    }
}

fn check_shape(result: &RasterArray, source: &FieldBinding) -> Result<(), MapperError> {
    if result.lines() != 1 || result.samples() != source.rows.len() {
        return Err(MapperError::ShapeMismatch {
            field: source.field_name.clone(),
            expected: (1, source.rows.len()),
            actual: (result.lines(), result.samples()),
        });
    }
    Ok(())
}

/// Rebuild cell values from a result array.
///
/// Sample `i` of `result` belongs to row `source.rows[i]`. `NaN` and the
/// array's no-data value become [`FieldValue::Null`] for single-band results
/// and `NaN` inside profiles.
pub fn from_array(
    result: &RasterArray,
    source: &FieldBinding,
) -> Result<Vec<(usize, FieldValue)>, MapperError> {
    check_shape(result, source)?;
    let kind = target_kind(result, source);

    let axis = source
        .setting
        .as_ref()
        .filter(|s| s.band_count() == result.bands())
        .and_then(|s| s.wavelengths().map(|wl| (wl.to_vec(), s.wavelength_unit())));

    let mut values = Vec::with_capacity(source.rows.len());
    for (sample, row) in source.rows.iter().enumerate() {
        let value = match kind {
            TargetKind::Profile => {
                let band_values: Vec<f64> = (0..result.bands())
                    .map(|b| {
                        result
                            .get(b, 0, sample)
                            .filter(|v| !result.is_no_data(*v))
                            .unwrap_or(f64::NAN)
                    })
                    .collect();
                let mut builder = SpectralProfileBuilder::new(band_values);
                if let Some((wavelengths, unit)) = &axis {
                    builder = builder
                        .wavelengths(wavelengths.clone())
                        .wavelength_unit(*unit);
                }
                let profile = builder.build().map_err(|e| MapperError::DecodeError {
                    field: source.field_name.clone(),
                    row: *row,
                    reason: e.to_string(),
                })?;
                FieldValue::Profile(profile)
            }
            TargetKind::Integer | TargetKind::Temporal(_) => match result.get(0, 0, sample) {
                Some(v) if !result.is_no_data(v) => result
                    .get_i64(0, 0, sample)
                    .map(FieldValue::Integer)
                    .unwrap_or(FieldValue::Null),
                _ => FieldValue::Null,
            },
            TargetKind::Text => {
                let text = result
                    .get_i64(0, 0, sample)
                    .zip(source.class_mapping.as_ref())
                    .and_then(|(code, mapping)| mapping.decode(code));
                match text {
                    Some(t) => FieldValue::Text(t.to_string()),
                    None => FieldValue::Null,
                }
            }
            TargetKind::Double => match result.get(0, 0, sample) {
                Some(v) if !result.is_no_data(v) => FieldValue::Double(v),
                _ => FieldValue::Null,
            },
        };
        values.push((*row, value));
    }
    Ok(values)
}

/// Full-length column of `kind` with `values` placed at their rows
fn build_column(
    kind: TargetKind,
    values: Vec<(usize, FieldValue)>,
    row_count: usize,
    field: &str,
) -> Result<ArrayRef, MapperError> {
    let column: ArrayRef = match kind {
        TargetKind::Integer => {
            let mut cells: Vec<Option<i64>> = vec![None; row_count];
            for (row, value) in values {
                if let FieldValue::Integer(v) = value {
                    cells[row] = Some(v);
                }
            }
            Arc::new(Int64Array::from(cells))
        }
        TargetKind::Temporal(temporal) => {
            let mut seconds: Vec<Option<i64>> = vec![None; row_count];
            for (row, value) in values {
                if let FieldValue::Integer(v) = value {
                    seconds[row] = Some(v);
                }
            }
            temporal_column(temporal, seconds, field)?
        }
        TargetKind::Double => {
            let mut cells: Vec<Option<f64>> = vec![None; row_count];
            for (row, value) in values {
                if let FieldValue::Double(v) = value {
                    cells[row] = Some(v);
                }
            }
            Arc::new(Float64Array::from(cells))
        }
        TargetKind::Text => {
            let mut cells: Vec<Option<String>> = vec![None; row_count];
            for (row, value) in values {
                if let FieldValue::Text(v) = value {
                    cells[row] = Some(v);
                }
            }
            Arc::new(StringArray::from(cells))
        }
        TargetKind::Profile => {
            let mut cells: Vec<Option<Vec<u8>>> = vec![None; row_count];
            for (row, value) in values {
                if let FieldValue::Profile(p) = value {
                    let bytes = encode_profile(&p).map_err(|e| MapperError::DecodeError {
                        field: field.to_string(),
                        row,
                        reason: e.to_string(),
                    })?;
                    cells[row] = Some(bytes);
                }
            }
            Arc::new(BinaryArray::from_iter(cells))
        }
    };
    Ok(column)
}

/// Column of `temporal` built from whole seconds
fn temporal_column(
    temporal: TemporalType,
    seconds: Vec<Option<i64>>,
    field: &str,
) -> Result<ArrayRef, MapperError> {
    let narrow = |row: usize, value: i64| {
        i32::try_from(value).map_err(|_| MapperError::ValueOutOfRange {
            field: field.to_string(),
            row,
            target: "Int32",
        })
    };

    let column: ArrayRef = match temporal {
        TemporalType::Timestamp => Arc::new(TimestampSecondArray::from(seconds)),
        TemporalType::Date => {
            let days = seconds
                .into_iter()
                .enumerate()
                .map(|(row, s)| s.map(|s| narrow(row, s.div_euclid(SECONDS_PER_DAY))).transpose())
                .collect::<Result<Vec<_>, _>>()?;
            Arc::new(Date32Array::from(days))
        }
        TemporalType::Time => {
            let times = seconds
                .into_iter()
                .enumerate()
                .map(|(row, s)| s.map(|s| narrow(row, s)).transpose())
                .collect::<Result<Vec<_>, _>>()?;
            Arc::new(Time32SecondArray::from(times))
        }
    };
    Ok(column)
}

/// Write a result array back into a table.
///
/// The output column is `result.name`, falling back to the source field name.
/// An existing column of that name is overwritten in place for the rows in
/// `source.rows` and keeps its Arrow type; other rows keep their value.
/// Otherwise a new nullable column is appended.
pub fn write_back(
    batch: &RecordBatch,
    result: &RasterArray,
    source: &FieldBinding,
) -> Result<RecordBatch, MapperError> {
    let row_count = batch.num_rows();
    if let Some(row) = source.rows.iter().find(|r| **r >= row_count) {
        return Err(MapperError::RowOutOfRange {
            field: source.field_name.clone(),
            row: *row,
            row_count,
        });
    }

    let kind = target_kind(result, source);
    let values = from_array(result, source)?;
    let name = result
        .name
        .clone()
        .unwrap_or_else(|| source.field_name.clone());
    let column = build_column(kind, values, row_count, &name)?;

    let schema = batch.schema();
    let mut columns: Vec<ArrayRef> = batch.columns().to_vec();

    match schema.index_of(&name) {
        Ok(index) => {
            let existing = batch.column(index);
            let replacement = cast(column.as_ref(), existing.data_type())?;
            let mut mask = vec![false; row_count];
            for row in &source.rows {
                mask[*row] = true;
            }
            let mask = BooleanArray::from(mask);
            columns[index] = zip(&mask, &replacement, existing)?;
            info!(
                "Overwrote {} row(s) of column '{}' ({})",
                source.rows.len(),
                name,
                existing.data_type()
            );
            Ok(RecordBatch::try_new(schema, columns)?)
        }
        Err(_) => {
            let field = match kind {
                TargetKind::Profile => profile_field(&name, ProfileEncoding::Binary),
                other => Field::new(&name, other.data_type(), true),
            };
            debug!("Appending column '{}' ({:?})", name, kind);
            let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
            fields.push(field);
            columns.push(column);
            let schema = Schema::new_with_metadata(fields, schema.metadata().clone());
            Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
        }
    }
}
