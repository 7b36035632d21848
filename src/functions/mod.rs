//! # Expression Functions
//!
//! Read-only, per-row query functions for a host expression evaluator:
//!
//! | Function | Arguments | Result |
//! |----------|-----------|--------|
//! | `raster_profile` | `layer, geometry=@geometry, aggregate='mean', at=false, encoding='map'` | profile of the pixels under the geometry, or one per pixel for `aggregate='none'` |
//! | `raster_array` | `layer, geometry=@geometry, aggregate='mean', t=false, at=false` | raw band values; bands x pixels for `aggregate='none'`, pixels x bands with `t` |
//! | `spectral_profile` | `file, type=NULL` | map of the profiles and metadata of an instrument file |
//! | `spectral_data` | `profile_field` | map form of a stored profile value |
//! | `encode_profile` | `profile_field, encoding='text'` | stored profile value in another encoding |
//!
//! Functions implement [`ExpressionFunction`] and are evaluated against an
//! [`EvalContext`] that holds the raster layers and the geometry of the row.
//! [`evaluate_rows`] runs a function over many rows; a failing row yields a
//! [`RowOutcome::Failed`] and never stops the batch.
//!
//! ```
//! use speclib::functions::{EvalContext, ExprValue, ExpressionFunction, LayerRegistry, SpectralDataFunction};
//!
//! let layers = LayerRegistry::new();
//! let ctx = EvalContext::new(&layers);
//! let value = SpectralDataFunction
//!     .call(&[ExprValue::from(r#"{"y":[0.1,0.2],"x":[400.0,500.0]}"#)], &ctx)?;
//! assert_eq!(
//!     value.get("x"),
//!     Some(&ExprValue::Array(vec![ExprValue::Double(400.0), ExprValue::Double(500.0)]))
//! );
//! # Ok::<(), speclib::functions::FunctionError>(())
//! ```

mod aggregate;
mod builtins;
mod error;
mod extract;
mod geometry;
mod raster;
mod signature;
mod value;

#[cfg(test)]
mod tests;

use geo::Geometry;
use log::{debug, warn};

use crate::profile::UnitPolicy;

pub use aggregate::Aggregate;
pub use builtins::{
    parse_profile_file, EncodeProfileFunction, OutputEncoding, RasterArrayFunction,
    RasterProfileFunction, SpectralDataFunction, SpectralProfileFunction,
};
pub use error::FunctionError;
pub use extract::{profile_at, CellProfile, PixelProfiles};
pub use geometry::{geometry_cells, is_single_point, parse_geometry};
pub use raster::{GeoTransform, LayerRegistry, RasterLayer};
pub use signature::{DefaultValue, FunctionSignature, Parameter, ReturnKind, FUNCTION_GROUP};
pub use value::{profile_from_value, profile_map, ExprValue};

/// An expression function with a fixed signature
pub trait ExpressionFunction: Send + Sync {
    /// Registration signature
    fn signature(&self) -> &FunctionSignature;

    /// Evaluate the function for one row
    fn call(&self, args: &[ExprValue], ctx: &EvalContext) -> Result<ExprValue, FunctionError>;
}

/// What a function can see while it is evaluated
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    /// Raster layers addressable by name
    pub layers: &'a LayerRegistry,
    /// Geometry of the current row (`@geometry`)
    pub geometry: Option<&'a Geometry<f64>>,
    /// Unit inference for files without a wavelength unit
    pub unit_policy: UnitPolicy,
}

impl<'a> EvalContext<'a> {
    /// Context over `layers` without a geometry, using the default unit policy
    pub fn new(layers: &'a LayerRegistry) -> Self {
        Self {
            layers,
            geometry: None,
            unit_policy: UnitPolicy::default(),
        }
    }

    /// Context for a row with `geometry`
    pub fn with_geometry(mut self, geometry: &'a Geometry<f64>) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Context using `policy` for files without a wavelength unit
    pub fn with_unit_policy(mut self, policy: UnitPolicy) -> Self {
        self.unit_policy = policy;
        self
    }
}

/// Arguments and geometry of one row
#[derive(Debug, Clone, Default)]
pub struct RowInput {
    /// Row id reported back in the [`RowOutcome`]
    pub row: usize,
    /// Function arguments, in parameter order
    pub args: Vec<ExprValue>,
    /// Geometry of the row; `None` keeps the context geometry
    pub geometry: Option<Geometry<f64>>,
}

impl RowInput {
    /// Row without a geometry
    pub fn new(row: usize, args: Vec<ExprValue>) -> Self {
        Self {
            row,
            args,
            geometry: None,
        }
    }

    /// Row with its own geometry
    pub fn with_geometry(mut self, geometry: Geometry<f64>) -> Self {
        self.geometry = Some(geometry);
        self
    }
}

/// Result of evaluating one row
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    /// The function returned `value` for `row`
    Value { row: usize, value: ExprValue },
    /// The function failed for `row` with `message`
    Failed { row: usize, message: String },
}

impl RowOutcome {
    /// Row id of the input
    pub fn row(&self) -> usize {
        match self {
            RowOutcome::Value { row, .. } | RowOutcome::Failed { row, .. } => *row,
        }
    }

    /// Result value; [`ExprValue::Null`] for failed rows
    pub fn value(&self) -> ExprValue {
        match self {
            RowOutcome::Value { value, .. } => value.clone(),
            RowOutcome::Failed { .. } => ExprValue::Null,
        }
    }

    /// Error message of a failed row
    pub fn error(&self) -> Option<&str> {
        match self {
            RowOutcome::Value { .. } => None,
            RowOutcome::Failed { message, .. } => Some(message),
        }
    }

    /// True if the function succeeded
    pub fn is_ok(&self) -> bool {
        matches!(self, RowOutcome::Value { .. })
    }
}

/// Evaluate `function` for every row.
///
/// A row's own geometry replaces the context geometry. Failures are returned
/// as [`RowOutcome::Failed`] with the error message.
pub fn evaluate_rows<I>(
    function: &dyn ExpressionFunction,
    rows: I,
    ctx: &EvalContext,
) -> Vec<RowOutcome>
where
    I: IntoIterator<Item = RowInput>,
{
    let name = function.signature().name;
    let outcomes: Vec<RowOutcome> = rows
        .into_iter()
        .map(|input| {
            let row_ctx = match &input.geometry {
                Some(geometry) => ctx.with_geometry(geometry),
                None => *ctx,
            };
            match function.call(&input.args, &row_ctx) {
                Ok(value) => RowOutcome::Value {
                    row: input.row,
                    value,
                },
                Err(e) => {
                    debug!("{name}: row {} failed: {e}", input.row);
                    RowOutcome::Failed {
                        row: input.row,
                        message: e.to_string(),
                    }
                }
            }
        })
        .collect();

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    if failed > 0 {
        warn!("{name}: {failed} of {} row(s) failed", outcomes.len());
    }
    outcomes
}

/// Signatures of all built-in functions
pub fn signatures() -> Vec<&'static FunctionSignature> {
    vec![
        &builtins::RASTER_PROFILE,
        &builtins::RASTER_ARRAY,
        &builtins::SPECTRAL_PROFILE,
        &builtins::SPECTRAL_DATA,
        &builtins::ENCODE_PROFILE,
    ]
}

/// Instances of all built-in functions
pub fn builtin_functions() -> Vec<Box<dyn ExpressionFunction>> {
    vec![
        Box::new(RasterProfileFunction),
        Box::new(RasterArrayFunction),
        Box::new(SpectralProfileFunction),
        Box::new(SpectralDataFunction),
        Box::new(EncodeProfileFunction),
    ]
}
