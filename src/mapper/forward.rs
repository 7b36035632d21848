use std::collections::BTreeMap;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{
    ArrowPrimitiveType, DataType, Date32Type, Date64Type, Float64Type, Int64Type,
    Time32MillisecondType, Time32SecondType, Time64MicrosecondType, Time64NanosecondType,
    TimeUnit, TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType,
};
use arrow::record_batch::RecordBatch;
use log::{debug, warn};

use super::field::{NO_DATA_CLASS, SECONDS_PER_DAY};
use super::nodata::{select_sentinel, DEFAULT_NODATA_CANDIDATES};
use super::{
    ArrayData, ClassMapping, FieldBinding, FieldKind, MapperError, RasterArray, TemporalType,
};
use crate::profile::{decode_profile, SpectralProfile};
use crate::schema::{declared_no_data, ProfileEncoding};
use crate::setting::{group, SettingCache};

/// Options of [`to_arrays`]
#[derive(Debug, Clone, PartialEq)]
pub struct MapperOptions {
    /// Sentinel candidates tried in order before `min - 1`
    pub nodata_candidates: Vec<f64>,
    /// Fail on undecodable profile cells instead of skipping them
    pub strict: bool,
}

impl Default for MapperOptions {
    fn default() -> Self {
        Self {
            nodata_candidates: DEFAULT_NODATA_CANDIDATES.to_vec(),
            strict: false,
        }
    }
}

impl MapperOptions {
    /// Set the sentinel candidates
    pub fn with_nodata_candidates(mut self, candidates: Vec<f64>) -> Self {
        self.nodata_candidates = candidates;
        self
    }

    /// Enable or disable strict decoding
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// One array with the binding that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayBatch {
    /// How the array maps back to table rows
    pub binding: FieldBinding,
    /// Array data
    pub array: RasterArray,
}

/// Profile row left out of every array
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// Row id
    pub row: usize,
    /// Decoder message; `None` for null cells
    pub reason: Option<String>,
}

/// Arrays produced for one field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldArrays {
    /// Source column
    pub field_name: String,
    /// One entry per spectral setting (profile fields) or exactly one entry
    pub batches: Vec<ArrayBatch>,
    /// Profile rows that are in no batch
    pub skipped_rows: Vec<SkippedRow>,
}

impl FieldArrays {
    /// The only batch, if the field produced exactly one
    pub fn single(&self) -> Option<&ArrayBatch> {
        match self.batches.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }
}

/// Convert table columns into dense arrays.
///
/// Profile fields produce one `bands x 1 x n` array per spectral setting;
/// every other kind produces a single `1 x 1 x row_count` array. The result is
/// keyed by field name.
pub fn to_arrays(
    batch: &RecordBatch,
    field_names: &[&str],
    cache: &mut SettingCache,
    options: &MapperOptions,
) -> Result<BTreeMap<String, FieldArrays>, MapperError> {
    let schema = batch.schema();
    let mut result = BTreeMap::new();

    for name in field_names {
        let index = schema
            .index_of(name)
            .map_err(|_| MapperError::FieldNotFound(name.to_string()))?;
        let field = schema.field(index);
        let column = batch.column(index);
        let kind = FieldKind::of(field)?;

        let arrays = match kind {
            FieldKind::Profile(encoding) => {
                profile_arrays(name, column, encoding, cache, options)?
            }
            FieldKind::Integer => {
                single(name, integer_array(name, column, declared_no_data(field), options)?)
            }
            FieldKind::Double => {
                single(name, double_array(name, column, declared_no_data(field), options)?)
            }
            FieldKind::Boolean => single(name, boolean_array(name, column)?),
            FieldKind::Text => single(name, text_array(name, column)?),
            FieldKind::DateTime(temporal) => single(
                name,
                temporal_array(name, column, temporal, declared_no_data(field), options)?,
            ),
        };

        debug!(
            "Field '{}' ({}): {} array(s), {} skipped row(s)",
            name,
            kind,
            arrays.batches.len(),
            arrays.skipped_rows.len()
        );
        result.insert(name.to_string(), arrays);
    }

    Ok(result)
}

fn single(name: &str, batch: ArrayBatch) -> FieldArrays {
    FieldArrays {
        field_name: name.to_string(),
        batches: vec![batch],
        skipped_rows: Vec::new(),
    }
}

fn unsupported(name: &str, column: &ArrayRef) -> MapperError {
    MapperError::UnsupportedFieldType {
        field: name.to_string(),
        data_type: column.data_type().to_string(),
    }
}

/// Raw bytes of every profile cell, `None` for nulls
fn profile_cells<'a>(
    name: &str,
    column: &'a ArrayRef,
    encoding: ProfileEncoding,
) -> Result<Vec<Option<&'a [u8]>>, MapperError> {
    let cells: Option<Vec<Option<&'a [u8]>>> = match (encoding, column.data_type()) {
        (ProfileEncoding::Binary, DataType::Binary) => column
            .as_binary_opt::<i32>()
            .map(|a| a.iter().collect()),
        (ProfileEncoding::Binary, DataType::LargeBinary) => column
            .as_binary_opt::<i64>()
            .map(|a| a.iter().collect()),
        (ProfileEncoding::Text, DataType::Utf8) => column
            .as_string_opt::<i32>()
            .map(|a| a.iter().map(|v| v.map(str::as_bytes)).collect()),
        (ProfileEncoding::Text, DataType::LargeUtf8) => column
            .as_string_opt::<i64>()
            .map(|a| a.iter().map(|v| v.map(str::as_bytes)).collect()),
        _ => None,
    };
    cells.ok_or_else(|| unsupported(name, column))
}

fn profile_arrays(
    name: &str,
    column: &ArrayRef,
    encoding: ProfileEncoding,
    cache: &mut SettingCache,
    options: &MapperOptions,
) -> Result<FieldArrays, MapperError> {
    let row_count = column.len();
    let mut decoded: Vec<(usize, SpectralProfile)> = Vec::with_capacity(row_count);
    let mut skipped_rows = Vec::new();

    for (row, cell) in profile_cells(name, column, encoding)?.into_iter().enumerate() {
        let Some(bytes) = cell else {
            skipped_rows.push(SkippedRow { row, reason: None });
            continue;
        };
        match decode_profile(bytes) {
            Ok(profile) => decoded.push((row, profile)),
            Err(e) if options.strict => {
                return Err(MapperError::DecodeError {
                    field: name.to_string(),
                    row,
                    reason: e.to_string(),
                })
            }
            Err(e) => skipped_rows.push(SkippedRow {
                row,
                reason: Some(e.to_string()),
            }),
        }
    }

    let undecodable = skipped_rows.iter().filter(|s| s.reason.is_some()).count();
    if undecodable > 0 {
        warn!("Field '{name}': skipped {undecodable} undecodable profile(s)");
    }

    let groups = group(decoded.iter().map(|(row, p)| (*row, name, p)), cache);
    let by_row: BTreeMap<usize, &SpectralProfile> =
        decoded.iter().map(|(row, p)| (*row, p)).collect();

    let mut batches = Vec::with_capacity(groups.len());
    for group in groups {
        let bands = group.setting.band_count();
        let samples = group.rows.len();
        let mut data = vec![f64::NAN; bands * samples];
        for (s, row) in group.rows.iter().enumerate() {
            let Some(profile) = by_row.get(row) else {
                continue;
            };
            for (b, v) in profile.values().iter().enumerate() {
                data[b * samples + s] = *v;
            }
        }

        let sentinel = select_sentinel(
            data.iter().copied(),
            None,
            &options.nodata_candidates,
            false,
        );
        debug!(
            "Field '{}': {} profile(s) with {}, sentinel {}",
            name,
            samples,
            group.setting,
            sentinel
        );

        let array = RasterArray::new(bands, 1, samples, ArrayData::Float64(data))?
            .with_name(name)
            .with_no_data(sentinel);
        let binding = FieldBinding {
            field_name: name.to_string(),
            kind: FieldKind::Profile(encoding),
            sentinel,
            setting: Some(group.setting),
            rows: group.rows,
            row_count,
            class_mapping: None,
            domain: None,
        };
        batches.push(ArrayBatch { binding, array });
    }

    Ok(FieldArrays {
        field_name: name.to_string(),
        batches,
        skipped_rows,
    })
}

fn integer_array(
    name: &str,
    column: &ArrayRef,
    declared: Option<f64>,
    options: &MapperOptions,
) -> Result<ArrayBatch, MapperError> {
    let values = cast(column.as_ref(), &DataType::Int64)?;
    let values = values
        .as_primitive_opt::<Int64Type>()
        .ok_or_else(|| unsupported(name, column))?;

    // UInt64 values above i64::MAX come out of the cast as nulls
    if values.null_count() > column.null_count() {
        let row = (0..column.len())
            .find(|i| column.is_valid(*i) && values.is_null(*i))
            .unwrap_or_default();
        return Err(MapperError::ValueOutOfRange {
            field: name.to_string(),
            row,
            target: "Int64",
        });
    }

    int64_batch(name, FieldKind::Integer, values.iter().collect(), declared, options)
}

fn temporal_array(
    name: &str,
    column: &ArrayRef,
    temporal: TemporalType,
    declared: Option<f64>,
    options: &MapperOptions,
) -> Result<ArrayBatch, MapperError> {
    let seconds = temporal_seconds(column).ok_or_else(|| unsupported(name, column))?;
    int64_batch(name, FieldKind::DateTime(temporal), seconds, declared, options)
}

/// Cells of a date, timestamp or time column as whole seconds
fn temporal_seconds(column: &ArrayRef) -> Option<Vec<Option<i64>>> {
    fn scaled<T: ArrowPrimitiveType>(
        column: &ArrayRef,
        to_seconds: impl Fn(T::Native) -> i64,
    ) -> Option<Vec<Option<i64>>> {
        column
            .as_primitive_opt::<T>()
            .map(|a| a.iter().map(|v| v.map(&to_seconds)).collect())
    }

    match column.data_type() {
        DataType::Date32 => scaled::<Date32Type>(column, |days| i64::from(days) * SECONDS_PER_DAY),
        DataType::Date64 => scaled::<Date64Type>(column, |ms| ms.div_euclid(1_000)),
        DataType::Timestamp(TimeUnit::Second, _) => scaled::<TimestampSecondType>(column, |s| s),
        DataType::Timestamp(TimeUnit::Millisecond, _) => {
            scaled::<TimestampMillisecondType>(column, |v| v.div_euclid(1_000))
        }
        DataType::Timestamp(TimeUnit::Microsecond, _) => {
            scaled::<TimestampMicrosecondType>(column, |v| v.div_euclid(1_000_000))
        }
        DataType::Timestamp(TimeUnit::Nanosecond, _) => {
            scaled::<TimestampNanosecondType>(column, |v| v.div_euclid(1_000_000_000))
        }
        DataType::Time32(TimeUnit::Second) => scaled::<Time32SecondType>(column, i64::from),
        DataType::Time32(TimeUnit::Millisecond) => {
            scaled::<Time32MillisecondType>(column, |v| i64::from(v).div_euclid(1_000))
        }
        DataType::Time64(TimeUnit::Microsecond) => {
            scaled::<Time64MicrosecondType>(column, |v| v.div_euclid(1_000_000))
        }
        DataType::Time64(TimeUnit::Nanosecond) => {
            scaled::<Time64NanosecondType>(column, |v| v.div_euclid(1_000_000_000))
        }
        _ => None,
    }
}

/// `Int64` array of `values`, nulls replaced by the selected sentinel
fn int64_batch(
    name: &str,
    kind: FieldKind,
    values: Vec<Option<i64>>,
    declared: Option<f64>,
    options: &MapperOptions,
) -> Result<ArrayBatch, MapperError> {
    let sentinel = select_sentinel(
        values.iter().flatten().map(|v| *v as f64),
        declared,
        &options.nodata_candidates,
        true,
    );
    let fill = sentinel as i64;
    let data: Vec<i64> = values.iter().map(|v| v.unwrap_or(fill)).collect();
    let row_count = data.len();

    let array = RasterArray::new(1, 1, row_count, ArrayData::Int64(data))?
        .with_name(name)
        .with_no_data(fill as f64);
    let binding = FieldBinding::scalar(name, kind, fill as f64, row_count);
    Ok(ArrayBatch { binding, array })
}

fn double_array(
    name: &str,
    column: &ArrayRef,
    declared: Option<f64>,
    options: &MapperOptions,
) -> Result<ArrayBatch, MapperError> {
    let values = cast(column.as_ref(), &DataType::Float64)?;
    let values = values
        .as_primitive_opt::<Float64Type>()
        .ok_or_else(|| unsupported(name, column))?;

    let sentinel = select_sentinel(
        values.iter().flatten(),
        declared,
        &options.nodata_candidates,
        false,
    );
    let data: Vec<f64> = values
        .iter()
        .map(|v| v.filter(|x| !x.is_nan()).unwrap_or(sentinel))
        .collect();
    let row_count = data.len();

    let array = RasterArray::new(1, 1, row_count, ArrayData::Float64(data))?
        .with_name(name)
        .with_no_data(sentinel);
    let binding = FieldBinding::scalar(name, FieldKind::Double, sentinel, row_count);
    Ok(ArrayBatch { binding, array })
}

fn boolean_array(name: &str, column: &ArrayRef) -> Result<ArrayBatch, MapperError> {
    let values = column
        .as_boolean_opt()
        .ok_or_else(|| unsupported(name, column))?;
    let sentinel = -1;
    let data: Vec<i32> = values
        .iter()
        .map(|v| v.map(i32::from).unwrap_or(sentinel))
        .collect();
    let row_count = data.len();

    let array = RasterArray::new(1, 1, row_count, ArrayData::Int32(data))?
        .with_name(name)
        .with_no_data(f64::from(sentinel));
    let mut binding = FieldBinding::scalar(name, FieldKind::Boolean, f64::from(sentinel), row_count);
    binding.domain = Some((0, 1));
    Ok(ArrayBatch { binding, array })
}

fn text_array(name: &str, column: &ArrayRef) -> Result<ArrayBatch, MapperError> {
    let values = cast(column.as_ref(), &DataType::Utf8)?;
    let values = values
        .as_string_opt::<i32>()
        .ok_or_else(|| unsupported(name, column))?;

    let mapping = ClassMapping::from_values(values.iter());
    let data: Vec<i32> = values.iter().map(|v| mapping.encode(v)).collect();
    let row_count = data.len();
    debug!("Field '{}': {} text class(es)", name, mapping.len());

    let array = RasterArray::new(1, 1, row_count, ArrayData::Int32(data))?
        .with_name(name)
        .with_no_data(f64::from(NO_DATA_CLASS));
    let mut binding = FieldBinding::scalar(
        name,
        FieldKind::Text,
        f64::from(NO_DATA_CLASS),
        row_count,
    );
    binding.class_mapping = Some(mapping);
    Ok(ArrayBatch { binding, array })
}
