//! # Spectral Profiles
//!
//! A [`SpectralProfile`] is one measured or synthetic spectrum: a value per
//! band, an optional wavelength axis with its unit, optional FWHM and bad-band
//! sequences, and free-form instrument metadata.
//!
//! Profiles are immutable values. They are created with
//! [`SpectralProfileBuilder`] (which validates that every per-band sequence
//! matches the band count) and stored in table columns through
//! [`encode_profile`] / [`decode_profile`].
//!
//! ```
//! use speclib::profile::{SpectralProfileBuilder, WavelengthUnit};
//!
//! let profile = SpectralProfileBuilder::new(vec![0.10, 0.12])
//!     .wavelengths(vec![350.0, 360.0])
//!     .build()?;
//! assert_eq!(profile.wavelength_unit(), WavelengthUnit::Nanometers);
//! # Ok::<(), speclib::profile::ProfileError>(())
//! ```

mod encoding;
mod error;
mod units;


use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use encoding::{decode_profile, encode_profile};
pub use error::ProfileError;
pub use units::{UnitPolicy, WavelengthUnit, DEFAULT_MICROMETER_THRESHOLD};

/// Scalar instrument attribute attached to a profile or parsed file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// Boolean flag
    Boolean(bool),
    /// Integral value
    Integer(i64),
    /// Floating point value
    Number(f64),
    /// Free text
    Text(String),
}

impl MetadataValue {
    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Integer(v) => Some(*v as f64),
            MetadataValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Text view of the value, if it is text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Boolean(v) => write!(f, "{v}"),
            MetadataValue::Integer(v) => write!(f, "{v}"),
            MetadataValue::Number(v) => write!(f, "{v}"),
            MetadataValue::Text(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Integer(value)
    }
}

impl From<i32> for MetadataValue {
    fn from(value: i32) -> Self {
        MetadataValue::Integer(value as i64)
    }
}

impl From<u32> for MetadataValue {
    fn from(value: u32) -> Self {
        MetadataValue::Integer(value as i64)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Number(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Boolean(value)
    }
}

/// One spectrum: values indexed by band, optionally located on a wavelength axis
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralProfile {
    values: Vec<f64>,
    wavelengths: Option<Vec<f64>>,
    wavelength_unit: WavelengthUnit,
    fwhm: Option<Vec<f64>>,
    bad_bands: Option<Vec<bool>>,
    value_unit: Option<String>,
    metadata: BTreeMap<String, MetadataValue>,
}

impl SpectralProfile {
    /// Profile values ("y" axis)
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of bands
    pub fn band_count(&self) -> usize {
        self.values.len()
    }

    /// Wavelength axis ("x" axis), if known
    pub fn wavelengths(&self) -> Option<&[f64]> {
        self.wavelengths.as_deref()
    }

    /// Stored wavelength unit
    pub fn wavelength_unit(&self) -> WavelengthUnit {
        self.wavelength_unit
    }

    /// Wavelength unit used for grouping: the stored unit, or the unit guessed by
    /// `policy` when the profile has wavelengths but no unit.
    pub fn effective_unit(&self, policy: &UnitPolicy) -> WavelengthUnit {
        match (&self.wavelengths, self.wavelength_unit) {
            (None, _) => WavelengthUnit::Unspecified,
            (Some(wl), WavelengthUnit::Unspecified) => policy.infer(wl),
            (Some(_), unit) => unit,
        }
    }

    /// Full width at half maximum per band
    pub fn fwhm(&self) -> Option<&[f64]> {
        self.fwhm.as_deref()
    }

    /// Bad-band mask, `true` marks an unreliable band
    pub fn bad_bands(&self) -> Option<&[bool]> {
        self.bad_bands.as_deref()
    }

    /// Unit of the values, e.g. `%` or `Radiance`
    pub fn value_unit(&self) -> Option<&str> {
        self.value_unit.as_deref()
    }

    /// Instrument attributes
    pub fn metadata(&self) -> &BTreeMap<String, MetadataValue> {
        &self.metadata
    }

    /// Returns a copy with different values on the same axis
    pub fn with_values(&self, values: Vec<f64>) -> Result<Self, ProfileError> {
        let mut builder = self.to_builder();
        builder.values = values;
        builder.build()
    }

    /// Returns a copy with an additional metadata entry
    pub fn with_metadata(&self, key: &str, value: impl Into<MetadataValue>) -> Self {
        let mut copy = self.clone();
        copy.metadata.insert(key.to_string(), value.into());
        copy
    }

    /// Builder pre-filled with this profile's content
    pub fn to_builder(&self) -> SpectralProfileBuilder {
        SpectralProfileBuilder {
            values: self.values.clone(),
            wavelengths: self.wavelengths.clone(),
            wavelength_unit: Some(self.wavelength_unit),
            fwhm: self.fwhm.clone(),
            bad_bands: self.bad_bands.clone(),
            value_unit: self.value_unit.clone(),
            metadata: self.metadata.clone(),
            policy: UnitPolicy::default(),
        }
    }
}

/// Builder for [`SpectralProfile`]
///
/// If wavelengths are set but no unit is given, [`SpectralProfileBuilder::build`]
/// infers the unit with the configured [`UnitPolicy`].
#[derive(Debug, Clone)]
pub struct SpectralProfileBuilder {
    values: Vec<f64>,
    wavelengths: Option<Vec<f64>>,
    wavelength_unit: Option<WavelengthUnit>,
    fwhm: Option<Vec<f64>>,
    bad_bands: Option<Vec<bool>>,
    value_unit: Option<String>,
    metadata: BTreeMap<String, MetadataValue>,
    policy: UnitPolicy,
}

impl SpectralProfileBuilder {
    /// Start a profile from its values
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            wavelengths: None,
            wavelength_unit: None,
            fwhm: None,
            bad_bands: None,
            value_unit: None,
            metadata: BTreeMap::new(),
            policy: UnitPolicy::default(),
        }
    }

    /// Set the wavelength axis
    pub fn wavelengths(mut self, wavelengths: Vec<f64>) -> Self {
        self.wavelengths = Some(wavelengths);
        self
    }

    /// Set the wavelength unit explicitly (disables inference)
    pub fn wavelength_unit(mut self, unit: WavelengthUnit) -> Self {
        self.wavelength_unit = Some(unit);
        self
    }

    /// Set the FWHM sequence
    pub fn fwhm(mut self, fwhm: Vec<f64>) -> Self {
        self.fwhm = Some(fwhm);
        self
    }

    /// Set the bad-band mask
    pub fn bad_bands(mut self, bad_bands: Vec<bool>) -> Self {
        self.bad_bands = Some(bad_bands);
        self
    }

    /// Set the unit of the values
    pub fn value_unit(mut self, unit: impl Into<String>) -> Self {
        self.value_unit = Some(unit.into());
        self
    }

    /// Add a metadata entry
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Add several metadata entries
    pub fn extend_metadata(mut self, entries: &BTreeMap<String, MetadataValue>) -> Self {
        self.metadata
            .extend(entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Policy used when the unit has to be inferred
    pub fn unit_policy(mut self, policy: UnitPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Validate and build the profile
    pub fn build(self) -> Result<SpectralProfile, ProfileError> {
        let n = self.values.len();
        if n == 0 {
            return Err(ProfileError::Empty);
        }
        check_length("wavelengths", n, self.wavelengths.as_ref().map(Vec::len))?;
        check_length("fwhm", n, self.fwhm.as_ref().map(Vec::len))?;
        check_length("bad_bands", n, self.bad_bands.as_ref().map(Vec::len))?;

        let wavelength_unit = match (self.wavelength_unit, &self.wavelengths) {
            (Some(unit), _) => unit,
            (None, Some(wl)) => self.policy.infer(wl),
            (None, None) => WavelengthUnit::Unspecified,
        };

        Ok(SpectralProfile {
            values: self.values,
            wavelengths: self.wavelengths,
            wavelength_unit,
            fwhm: self.fwhm,
            bad_bands: self.bad_bands,
            value_unit: self.value_unit,
            metadata: self.metadata,
        })
    }
}

fn check_length(axis: &'static str, expected: usize, actual: Option<usize>) -> Result<(), ProfileError> {
    match actual {
        Some(actual) if actual != expected => Err(ProfileError::LengthMismatch {
            axis,
            expected,
            actual,
        }),
        _ => Ok(()),
    }
}
