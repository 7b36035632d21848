//! Column encoding of spectral profiles
//!
//! Profiles are stored per row as a compact JSON object:
//!
//! ```json
//! {"y":[0.1,0.12],"x":[350.0,360.0],"xUnit":"nm","yUnit":"%","bbl":[1,1],"fwhm":[10.0,10.0],"meta":{"instrument":"FSFR"}}
//! ```
//!
//! Only `y` is required. Non-finite numbers are written as `null` and read
//! back as `NaN`; non-finite metadata numbers are written as text (`"NaN"`,
//! `"inf"`, `"-inf"`). `bbl` follows the ENVI bad-band-list convention
//! (`1` = good band, `0` = bad band).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{MetadataValue, ProfileError, SpectralProfile, SpectralProfileBuilder, WavelengthUnit};

#[derive(Debug, Serialize, Deserialize)]
struct ProfileRecord {
    y: Vec<Option<f64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    x: Option<Vec<Option<f64>>>,

    #[serde(rename = "xUnit", default, skip_serializing_if = "Option::is_none")]
    x_unit: Option<String>,

    #[serde(rename = "yUnit", default, skip_serializing_if = "Option::is_none")]
    y_unit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    bbl: Option<Vec<Option<i64>>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    fwhm: Option<Vec<Option<f64>>>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    meta: BTreeMap<String, MetadataValue>,
}

fn finite_or_null(values: &[f64]) -> Vec<Option<f64>> {
    values
        .iter()
        .map(|v| if v.is_finite() { Some(*v) } else { None })
        .collect()
}

fn portable_metadata(meta: &BTreeMap<String, MetadataValue>) -> BTreeMap<String, MetadataValue> {
    meta.iter()
        .map(|(key, value)| {
            let value = match value {
                MetadataValue::Number(v) if !v.is_finite() => MetadataValue::Text(v.to_string()),
                other => other.clone(),
            };
            (key.clone(), value)
        })
        .collect()
}

fn null_to_nan(values: Vec<Option<f64>>) -> Vec<f64> {
    values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect()
}

/// Serialize a profile into its column representation
pub fn encode_profile(profile: &SpectralProfile) -> Result<Vec<u8>, ProfileError> {
    let record = ProfileRecord {
        y: finite_or_null(profile.values()),
        x: profile.wavelengths().map(finite_or_null),
        x_unit: profile.wavelength_unit().symbol().map(str::to_string),
        y_unit: profile.value_unit().map(str::to_string),
        bbl: profile
            .bad_bands()
            .map(|bad| bad.iter().map(|b| Some(if *b { 0 } else { 1 })).collect()),
        fwhm: profile.fwhm().map(finite_or_null),
        meta: portable_metadata(profile.metadata()),
    };
    Ok(serde_json::to_vec(&record)?)
}

/// Deserialize a profile from its column representation.
///
/// The wavelength unit is taken as stored; a missing `xUnit` decodes to
/// [`WavelengthUnit::Unspecified`] without any inference.
pub fn decode_profile(bytes: &[u8]) -> Result<SpectralProfile, ProfileError> {
    let trimmed = bytes.trim_ascii();
    if trimmed.is_empty() {
        return Err(ProfileError::Empty);
    }
    let record: ProfileRecord = serde_json::from_slice(trimmed)?;

    let unit = record
        .x_unit
        .as_deref()
        .and_then(WavelengthUnit::from_symbol)
        .unwrap_or(WavelengthUnit::Unspecified);

    let mut builder = SpectralProfileBuilder::new(null_to_nan(record.y))
        .wavelength_unit(unit)
        .extend_metadata(&record.meta);

    if let Some(x) = record.x {
        builder = builder.wavelengths(null_to_nan(x));
    }
    if let Some(y_unit) = record.y_unit {
        builder = builder.value_unit(y_unit);
    }
    if let Some(bbl) = record.bbl {
        builder = builder.bad_bands(bbl.into_iter().map(|v| v == Some(0)).collect());
    }
    if let Some(fwhm) = record.fwhm {
        builder = builder.fwhm(null_to_nan(fwhm));
    }
    builder.build()
}
