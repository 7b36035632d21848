use std::fmt;

use serde::{Deserialize, Serialize};

/// Wavelengths at or above this value are read as nanometers by the default policy.
pub const DEFAULT_MICROMETER_THRESHOLD: f64 = 100.0;

/// Unit of a profile's wavelength axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WavelengthUnit {
    /// Nanometers (`nm`)
    Nanometers,
    /// Micrometers (`μm`)
    Micrometers,
    /// No unit known
    #[default]
    Unspecified,
}

impl WavelengthUnit {
    /// Short symbol as written into encoded profiles, `None` for [`WavelengthUnit::Unspecified`]
    pub fn symbol(&self) -> Option<&'static str> {
        match self {
            WavelengthUnit::Nanometers => Some("nm"),
            WavelengthUnit::Micrometers => Some("μm"),
            WavelengthUnit::Unspecified => None,
        }
    }

    /// Parse a unit symbol or name (`nm`, `nanometers`, `um`, `µm`, `micrometers`, ...)
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol.trim().to_lowercase().as_str() {
            "nm" | "nanometer" | "nanometers" => Some(WavelengthUnit::Nanometers),
            "μm" | "µm" | "um" | "micrometer" | "micrometers" | "micron" | "microns" => {
                Some(WavelengthUnit::Micrometers)
            }
            _ => None,
        }
    }
}

impl fmt::Display for WavelengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol().unwrap_or("-"))
    }
}

/// Heuristic used when a source does not state its wavelength unit.
///
/// If the largest finite wavelength is below `micrometer_threshold` the axis is
/// taken to be in micrometers, otherwise in nanometers. Optical and even thermal
/// sensors stay below 100 μm, while nanometer axes start well above 100 nm, so
/// this is a reasonable default but not a guarantee: callers with explicit unit
/// metadata should always prefer it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitPolicy {
    /// Cut-off between micrometer and nanometer axes
    pub micrometer_threshold: f64,
}

impl Default for UnitPolicy {
    fn default() -> Self {
        Self {
            micrometer_threshold: DEFAULT_MICROMETER_THRESHOLD,
        }
    }
}

impl UnitPolicy {
    /// Create a policy with a custom threshold
    pub fn new(micrometer_threshold: f64) -> Self {
        Self {
            micrometer_threshold,
        }
    }

    /// Guess the unit of a wavelength axis.
    ///
    /// Returns [`WavelengthUnit::Unspecified`] for empty axes and axes without
    /// any positive finite value.
    pub fn infer(&self, wavelengths: &[f64]) -> WavelengthUnit {
        let max = wavelengths
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(f64::NEG_INFINITY, f64::max);

        if !max.is_finite() || max <= 0.0 {
            WavelengthUnit::Unspecified
        } else if max < self.micrometer_threshold {
            WavelengthUnit::Micrometers
        } else {
            WavelengthUnit::Nanometers
        }
    }
}
