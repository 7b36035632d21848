//! Error types for expression functions

use thiserror::Error;

use crate::codec::CodecError;
use crate::profile::ProfileError;

/// Errors raised while evaluating an expression function for one row
#[derive(Error, Debug)]
pub enum FunctionError {
    /// A required argument was not given
    #[error("{function}: missing argument '{parameter}'")]
    MissingArgument {
        function: &'static str,
        parameter: &'static str,
    },

    /// More arguments than parameters
    #[error("{function}: expected at most {expected} argument(s), got {actual}")]
    TooManyArguments {
        function: &'static str,
        expected: usize,
        actual: usize,
    },

    /// An argument has the wrong type or value
    #[error("{function}: invalid argument '{parameter}': {reason}")]
    InvalidArgument {
        function: &'static str,
        parameter: &'static str,
        reason: String,
    },

    /// No raster layer registered under this name
    #[error("Raster layer not found: {0}")]
    LayerNotFound(String),

    /// Neither an argument nor the evaluation context provides a geometry
    #[error("Unable to find geometry")]
    MissingGeometry,

    /// WKT text could not be parsed
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Aggregation name is not one of mean, median, min, max, none
    #[error("Unknown aggregation \"{0}\"")]
    UnknownAggregate(String),

    /// Output encoding is not one of map, text, bytes
    #[error("Unknown profile encoding \"{0}\"")]
    UnknownEncoding(String),

    /// Raster layer is inconsistent
    #[error("Invalid raster layer '{layer}': {reason}")]
    InvalidLayer { layer: String, reason: String },

    /// The geometry covers no valid pixel of the layer
    #[error("No pixels with data under the geometry")]
    NoPixels,

    /// Instrument file could not be read
    #[error("Codec error: {0}")]
    CodecError(#[from] CodecError),

    /// Profile value could not be decoded or built
    #[error("Profile error: {0}")]
    ProfileError(#[from] ProfileError),

    /// JSON conversion failed
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
