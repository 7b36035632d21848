use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Number, Value};

use super::FunctionError;
use crate::profile::{decode_profile, encode_profile, MetadataValue, SpectralProfile};

/// Argument or result of an expression function
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(untagged)]
pub enum ExprValue {
    /// Missing value
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
    /// Raw bytes, e.g. an encoded profile
    Bytes(Vec<u8>),
    Array(Vec<ExprValue>),
    Map(BTreeMap<String, ExprValue>),
}

impl ExprValue {
    /// True for [`ExprValue::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, ExprValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ExprValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Truthiness of booleans, integers and `"true"` / `"false"` text
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ExprValue::Bool(b) => Some(*b),
            ExprValue::Int(i) => Some(*i != 0),
            ExprValue::Text(s) => match s.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ExprValue::Int(i) => Some(*i as f64),
            ExprValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Map entry `key`, if this is a map
    pub fn get(&self, key: &str) -> Option<&ExprValue> {
        match self {
            ExprValue::Map(map) => map.get(key),
            _ => None,
        }
    }

    /// JSON view; bytes become an array of numbers and non-finite doubles `null`
    pub fn to_json(&self) -> Value {
        match self {
            ExprValue::Null => Value::Null,
            ExprValue::Bool(b) => Value::Bool(*b),
            ExprValue::Int(i) => Value::from(*i),
            ExprValue::Double(d) => Number::from_f64(*d).map_or(Value::Null, Value::Number),
            ExprValue::Text(s) => Value::String(s.clone()),
            ExprValue::Bytes(b) => Value::Array(b.iter().map(|v| Value::from(*v)).collect()),
            ExprValue::Array(items) => Value::Array(items.iter().map(ExprValue::to_json).collect()),
            ExprValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for ExprValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ExprValue::Null,
            Value::Bool(b) => ExprValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ExprValue::Int(i),
                None => n.as_f64().map_or(ExprValue::Null, ExprValue::Double),
            },
            Value::String(s) => ExprValue::Text(s),
            Value::Array(items) => ExprValue::Array(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                ExprValue::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<&MetadataValue> for ExprValue {
    fn from(value: &MetadataValue) -> Self {
        match value {
            MetadataValue::Boolean(b) => ExprValue::Bool(*b),
            MetadataValue::Integer(i) => ExprValue::Int(*i),
            MetadataValue::Number(n) => ExprValue::Double(*n),
            MetadataValue::Text(s) => ExprValue::Text(s.clone()),
        }
    }
}

impl From<&str> for ExprValue {
    fn from(value: &str) -> Self {
        ExprValue::Text(value.to_string())
    }
}

impl From<bool> for ExprValue {
    fn from(value: bool) -> Self {
        ExprValue::Bool(value)
    }
}

impl From<f64> for ExprValue {
    fn from(value: f64) -> Self {
        ExprValue::Double(value)
    }
}

impl From<i64> for ExprValue {
    fn from(value: i64) -> Self {
        ExprValue::Int(value)
    }
}

impl fmt::Display for ExprValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprValue::Null => write!(f, "NULL"),
            ExprValue::Text(s) => write!(f, "{s}"),
            ExprValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

/// Map form of a profile, with the keys of the column encoding
/// (`y`, `x`, `xUnit`, `yUnit`, `bbl`, `fwhm`, `meta`)
pub fn profile_map(profile: &SpectralProfile) -> Result<ExprValue, FunctionError> {
    let bytes = encode_profile(profile)?;
    let json: Value = serde_json::from_slice(&bytes)?;
    Ok(json.into())
}

/// Profile from a stored value: encoded bytes, JSON text or a profile map
///
/// Returns `None` for null values and empty maps.
pub fn profile_from_value(value: &ExprValue) -> Result<Option<SpectralProfile>, FunctionError> {
    let profile = match value {
        ExprValue::Null => return Ok(None),
        ExprValue::Map(map) if map.is_empty() => return Ok(None),
        ExprValue::Bytes(bytes) => decode_profile(bytes)?,
        ExprValue::Text(text) => decode_profile(text.as_bytes())?,
        ExprValue::Map(_) => {
            let bytes = serde_json::to_vec(&value.to_json())?;
            decode_profile(&bytes)?
        }
        other => {
            return Err(FunctionError::InvalidArgument {
                function: "spectral_data",
                parameter: "profile_field",
                reason: format!("not a profile value: {other}"),
            })
        }
    };
    Ok(Some(profile))
}
