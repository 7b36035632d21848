use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use geo::Geometry;
use log::debug;

use super::geometry::parse_geometry;
use super::signature::{DefaultValue, Parameter, ReturnKind, FUNCTION_GROUP};
use super::value::{profile_from_value, profile_map};
use super::{
    profile_at, Aggregate, EvalContext, ExprValue, ExpressionFunction, FunctionError,
    FunctionSignature, PixelProfiles, RasterLayer,
};
use crate::codec::{Codec, FileFormat};
use crate::profile::{encode_profile, SpectralProfile, UnitPolicy};

/// Form in which `raster_profile` returns profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputEncoding {
    /// [`ExprValue::Map`] with the keys of the column encoding
    #[default]
    Map,
    /// JSON text
    Text,
    /// Encoded bytes, as stored in binary profile columns
    Bytes,
}

impl OutputEncoding {
    /// Convert a profile into this encoding
    pub fn encode(&self, profile: &SpectralProfile) -> Result<ExprValue, FunctionError> {
        match self {
            OutputEncoding::Map => profile_map(profile),
            OutputEncoding::Text => {
                let bytes = encode_profile(profile)?;
                Ok(ExprValue::Text(String::from_utf8_lossy(&bytes).into_owned()))
            }
            OutputEncoding::Bytes => Ok(ExprValue::Bytes(encode_profile(profile)?)),
        }
    }
}

impl FromStr for OutputEncoding {
    type Err = FunctionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "map" | "dict" => Ok(OutputEncoding::Map),
            "text" | "json" => Ok(OutputEncoding::Text),
            "bytes" | "binary" => Ok(OutputEncoding::Bytes),
            _ => Err(FunctionError::UnknownEncoding(s.to_string())),
        }
    }
}

fn invalid(function: &'static str, parameter: &'static str, reason: impl Into<String>) -> FunctionError {
    FunctionError::InvalidArgument {
        function,
        parameter,
        reason: reason.into(),
    }
}

fn text_arg<'a>(
    function: &'static str,
    parameter: &'static str,
    value: &'a ExprValue,
) -> Result<Option<&'a str>, FunctionError> {
    match value {
        ExprValue::Null => Ok(None),
        ExprValue::Text(s) => Ok(Some(s)),
        other => Err(invalid(function, parameter, format!("expected text, got {other}"))),
    }
}

pub(crate) const RASTER_PROFILE: FunctionSignature = FunctionSignature {
    name: "raster_profile",
    group: FUNCTION_GROUP,
    parameters: &[
        Parameter::required("layer"),
        Parameter::optional("geometry", DefaultValue::CurrentGeometry),
        Parameter::optional("aggregate", DefaultValue::Text("mean")),
        Parameter::optional("at", DefaultValue::Bool(false)),
        Parameter::optional("encoding", DefaultValue::Text("map")),
    ],
    returns: ReturnKind::Profile,
    uses_geometry: true,
};

pub(crate) const RASTER_ARRAY: FunctionSignature = FunctionSignature {
    name: "raster_array",
    group: FUNCTION_GROUP,
    parameters: &[
        Parameter::required("layer"),
        Parameter::optional("geometry", DefaultValue::CurrentGeometry),
        Parameter::optional("aggregate", DefaultValue::Text("mean")),
        Parameter::optional("t", DefaultValue::Bool(false)),
        Parameter::optional("at", DefaultValue::Bool(false)),
    ],
    returns: ReturnKind::Array,
    uses_geometry: true,
};

pub(crate) const ENCODE_PROFILE: FunctionSignature = FunctionSignature {
    name: "encode_profile",
    group: FUNCTION_GROUP,
    parameters: &[
        Parameter::required("profile_field"),
        Parameter::optional("encoding", DefaultValue::Text("text")),
    ],
    returns: ReturnKind::Profile,
    uses_geometry: false,
};

pub(crate) const SPECTRAL_PROFILE: FunctionSignature = FunctionSignature {
    name: "spectral_profile",
    group: FUNCTION_GROUP,
    parameters: &[
        Parameter::required("file"),
        Parameter::optional("type", DefaultValue::Null),
    ],
    returns: ReturnKind::Map,
    uses_geometry: false,
};

pub(crate) const SPECTRAL_DATA: FunctionSignature = FunctionSignature {
    name: "spectral_data",
    group: FUNCTION_GROUP,
    parameters: &[Parameter::required("profile_field")],
    returns: ReturnKind::Map,
    uses_geometry: false,
};

fn bool_arg(
    function: &'static str,
    parameter: &'static str,
    value: &ExprValue,
) -> Result<bool, FunctionError> {
    match value {
        ExprValue::Null => Ok(false),
        other => other
            .as_bool()
            .ok_or_else(|| invalid(function, parameter, format!("expected a boolean, got {other}"))),
    }
}

/// Layer, geometry and aggregation shared by the raster functions
struct PixelQuery<'a> {
    layer: &'a RasterLayer,
    geometry: Geometry<f64>,
    aggregate: Aggregate,
}

impl<'a> PixelQuery<'a> {
    /// Read the leading `layer, geometry, aggregate` arguments
    fn from_args(
        function: &'static str,
        args: &[ExprValue],
        ctx: &EvalContext<'a>,
    ) -> Result<Self, FunctionError> {
        let layer_name = text_arg(function, "layer", &args[0])?
            .ok_or_else(|| invalid(function, "layer", "a layer name is required"))?;
        let layer = ctx
            .layers
            .get(layer_name)
            .ok_or_else(|| FunctionError::LayerNotFound(layer_name.to_string()))?;
        let geometry = match text_arg(function, "geometry", &args[1])? {
            Some(wkt) => parse_geometry(wkt)?,
            None => ctx.geometry.cloned().ok_or(FunctionError::MissingGeometry)?,
        };
        let aggregate = match text_arg(function, "aggregate", &args[2])? {
            Some(s) => s.parse()?,
            None => Aggregate::default(),
        };
        Ok(Self {
            layer,
            geometry,
            aggregate,
        })
    }

    fn extract(&self, all_touched: bool) -> Result<PixelProfiles, FunctionError> {
        profile_at(self.layer, &self.geometry, self.aggregate, all_touched)
    }
}

/// `raster_profile(layer, geometry, aggregate, at, encoding)`: pixel profiles
/// of a raster layer under a geometry
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterProfileFunction;

impl ExpressionFunction for RasterProfileFunction {
    fn signature(&self) -> &FunctionSignature {
        &RASTER_PROFILE
    }

    fn call(&self, args: &[ExprValue], ctx: &EvalContext) -> Result<ExprValue, FunctionError> {
        let name = RASTER_PROFILE.name;
        let args = RASTER_PROFILE.bind(args)?;

        let query = PixelQuery::from_args(name, &args, ctx)?;
        let all_touched = bool_arg(name, "at", &args[3])?;
        let encoding = match text_arg(name, "encoding", &args[4])? {
            Some(s) => s.parse()?,
            None => OutputEncoding::default(),
        };

        match query.extract(all_touched)? {
            PixelProfiles::Single { profile, .. } => encoding.encode(&profile),
            PixelProfiles::PerCell(cells) => Ok(ExprValue::Array(
                cells
                    .iter()
                    .map(|c| encoding.encode(&c.profile))
                    .collect::<Result<_, _>>()?,
            )),
        }
    }
}

fn number_list(values: impl IntoIterator<Item = f64>) -> ExprValue {
    ExprValue::Array(
        values
            .into_iter()
            .map(|v| if v.is_nan() { ExprValue::Null } else { ExprValue::Double(v) })
            .collect(),
    )
}

/// `raster_array(layer, geometry, aggregate, t, at)`: raw band values of the
/// pixels under a geometry
///
/// Aggregates and single points give one list with a value per band. With
/// `aggregate='none'` the result is a list per band holding a value per cell,
/// or a list per cell holding a value per band when `t` is true. No-data
/// values are returned as null.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterArrayFunction;

impl ExpressionFunction for RasterArrayFunction {
    fn signature(&self) -> &FunctionSignature {
        &RASTER_ARRAY
    }

    fn call(&self, args: &[ExprValue], ctx: &EvalContext) -> Result<ExprValue, FunctionError> {
        let name = RASTER_ARRAY.name;
        let args = RASTER_ARRAY.bind(args)?;

        let query = PixelQuery::from_args(name, &args, ctx)?;
        let transpose = bool_arg(name, "t", &args[3])?;
        let all_touched = bool_arg(name, "at", &args[4])?;

        match query.extract(all_touched)? {
            PixelProfiles::Single { profile, .. } => {
                Ok(number_list(profile.values().iter().copied()))
            }
            PixelProfiles::PerCell(cells) if transpose => Ok(ExprValue::Array(
                cells
                    .iter()
                    .map(|c| number_list(c.profile.values().iter().copied()))
                    .collect(),
            )),
            PixelProfiles::PerCell(cells) => Ok(ExprValue::Array(
                (0..query.layer.bands())
                    .map(|band| {
                        number_list(
                            cells
                                .iter()
                                .map(|c| c.profile.values().get(band).copied().unwrap_or(f64::NAN)),
                        )
                    })
                    .collect(),
            )),
        }
    }
}

/// Read an instrument file into a map with one profile map per sub-profile
/// name, the key `format` and the file metadata.
///
/// Metadata keys that collide with a profile name or `format` are left out.
pub fn parse_profile_file<P: AsRef<Path>>(
    path: P,
    hint: Option<FileFormat>,
    policy: &UnitPolicy,
) -> Result<ExprValue, FunctionError> {
    let parsed = Codec::new()
        .with_unit_policy(*policy)
        .parse_path(path.as_ref(), hint)?;

    let mut map = BTreeMap::new();
    for named in &parsed.profiles {
        map.insert(named.name.clone(), profile_map(&named.profile)?);
    }
    map.insert("format".to_string(), ExprValue::from(parsed.format.name()));
    for (key, value) in &parsed.metadata {
        if map.contains_key(key) {
            debug!("Metadata key '{key}' shadowed by a profile, skipped");
            continue;
        }
        map.insert(key.clone(), value.into());
    }
    Ok(ExprValue::Map(map))
}

/// `spectral_profile(file, type)`: profiles and metadata of an instrument file
#[derive(Debug, Clone, Copy, Default)]
pub struct SpectralProfileFunction;

impl ExpressionFunction for SpectralProfileFunction {
    fn signature(&self) -> &FunctionSignature {
        &SPECTRAL_PROFILE
    }

    fn call(&self, args: &[ExprValue], ctx: &EvalContext) -> Result<ExprValue, FunctionError> {
        let name = SPECTRAL_PROFILE.name;
        let args = SPECTRAL_PROFILE.bind(args)?;

        let Some(path) = text_arg(name, "file", &args[0])? else {
            return Ok(ExprValue::Null);
        };
        let hint = text_arg(name, "type", &args[1])?
            .map(|t| {
                FileFormat::from_str(t)
                    .map_err(|_| invalid(name, "type", format!("unknown file type '{t}'")))
            })
            .transpose()?;

        parse_profile_file(path, hint, &ctx.unit_policy)
    }
}

/// `spectral_data(profile_field)`: map form of a stored profile value
#[derive(Debug, Clone, Copy, Default)]
pub struct SpectralDataFunction;

impl ExpressionFunction for SpectralDataFunction {
    fn signature(&self) -> &FunctionSignature {
        &SPECTRAL_DATA
    }

    fn call(&self, args: &[ExprValue], _ctx: &EvalContext) -> Result<ExprValue, FunctionError> {
        let args = SPECTRAL_DATA.bind(args)?;
        match profile_from_value(&args[0])? {
            Some(profile) => profile_map(&profile),
            None => Ok(ExprValue::Null),
        }
    }
}

/// `encode_profile(profile_field, encoding)`: a stored profile value in
/// another encoding (`text`, `map` or `bytes`)
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodeProfileFunction;

impl ExpressionFunction for EncodeProfileFunction {
    fn signature(&self) -> &FunctionSignature {
        &ENCODE_PROFILE
    }

    fn call(&self, args: &[ExprValue], _ctx: &EvalContext) -> Result<ExprValue, FunctionError> {
        let args = ENCODE_PROFILE.bind(args)?;
        let Some(profile) = profile_from_value(&args[0])? else {
            return Ok(ExprValue::Null);
        };
        let encoding = match text_arg(ENCODE_PROFILE.name, "encoding", &args[1])? {
            Some(s) => s.parse()?,
            None => OutputEncoding::Text,
        };
        encoding.encode(&profile)
    }
}
