//! # Field/Array Mapper
//!
//! Bridges attribute tables and array algorithms.
//!
//! ## Forward: table to arrays
//!
//! [`to_arrays`] converts columns of a [`RecordBatch`](arrow::record_batch::RecordBatch)
//! into dense band-sequential [`RasterArray`]s with one line and one sample
//! per table row:
//!
//! | Field kind | Array | Missing values |
//! |------------|-------|----------------|
//! | Profile | `Float64`, `bands x 1 x n`, one array per spectral setting | `NaN` in the profile; null / undecodable rows are skipped |
//! | Integer | `Int64`, `1 x 1 x rows` | sentinel |
//! | Double | `Float64`, `1 x 1 x rows` | sentinel |
//! | Boolean | `Int32` `0/1`, `1 x 1 x rows` | `-1` |
//! | Text | `Int32` class codes `1..=n`, `1 x 1 x rows` | `0` |
//! | Date / Timestamp / Time | `Int64` seconds, `1 x 1 x rows` | sentinel |
//!
//! Sentinels are chosen per array: the declared no-data value of the field
//! (field metadata `speclib:nodata`), else the first unused candidate
//! (`-1`, `-9999` by default), else a value below the minimum.
//!
//! Every array comes with a [`FieldBinding`] recording the rows it was built
//! from.
//!
//! ## Reverse: arrays to table
//!
//! [`from_array`] turns a result array back into per-row [`FieldValue`]s and
//! [`write_back`] stores them in a table column, creating or overwriting it.

mod array;
mod error;
mod field;
mod forward;
mod nodata;
mod reverse;


pub use array::{ArrayData, RasterArray};
pub use error::MapperError;
pub use field::{ClassMapping, FieldBinding, FieldKind, TemporalType, NO_DATA_CLASS};
pub use forward::{to_arrays, ArrayBatch, FieldArrays, MapperOptions, SkippedRow};
pub use nodata::{select_sentinel, DEFAULT_NODATA_CANDIDATES};
pub use reverse::{from_array, target_kind, write_back, FieldValue, TargetKind};
