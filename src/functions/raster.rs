//! Raster layers readable by [`profile_at`](super::profile_at)

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::FunctionError;
use crate::mapper::RasterArray;
use crate::profile::WavelengthUnit;

/// Affine transformation between pixel and map coordinates of a north-up raster.
///
/// ```text
/// x = origin_x + col * pixel_width
/// y = origin_y + row * pixel_height
/// ```
///
/// `pixel_height` is usually negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Map units per column, positive to the east
    pub pixel_width: f64,
    /// Map units per row, negative for north-up rasters
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// Create from a GDAL-style array `[origin_x, pixel_width, 0, origin_y, 0, pixel_height]`.
    ///
    /// Rotation terms are ignored.
    pub fn from_gdal(coeffs: [f64; 6]) -> Self {
        Self::new(coeffs[0], coeffs[3], coeffs[1], coeffs[5])
    }

    /// Map coordinates of the center of cell (`line`, `sample`)
    pub fn cell_center(&self, line: usize, sample: usize) -> (f64, f64) {
        (
            self.origin_x + (sample as f64 + 0.5) * self.pixel_width,
            self.origin_y + (line as f64 + 0.5) * self.pixel_height,
        )
    }

    /// Fractional pixel coordinates `(col, row)` of a map coordinate
    pub fn to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_width,
            (y - self.origin_y) / self.pixel_height,
        )
    }

    fn is_valid(&self) -> bool {
        self.pixel_width.is_finite()
            && self.pixel_height.is_finite()
            && self.pixel_width != 0.0
            && self.pixel_height != 0.0
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

/// A georeferenced multi-band image with its spectral properties
#[derive(Debug, Clone, PartialEq)]
pub struct RasterLayer {
    /// Layer name used to look it up in a [`LayerRegistry`]
    pub name: String,
    array: RasterArray,
    transform: GeoTransform,
    band_no_data: Vec<Option<f64>>,
    wavelengths: Option<Vec<f64>>,
    wavelength_unit: WavelengthUnit,
    bad_bands: Option<Vec<bool>>,
}

impl RasterLayer {
    /// Create a layer; the array's own no-data value applies to every band
    pub fn new(
        name: impl Into<String>,
        array: RasterArray,
        transform: GeoTransform,
    ) -> Result<Self, FunctionError> {
        let name = name.into();
        if !transform.is_valid() {
            return Err(FunctionError::InvalidLayer {
                layer: name,
                reason: "pixel size must be finite and non-zero".to_string(),
            });
        }
        let bands = array.bands();
        Ok(Self {
            name,
            band_no_data: vec![array.no_data; bands],
            array,
            transform,
            wavelengths: None,
            wavelength_unit: WavelengthUnit::Unspecified,
            bad_bands: None,
        })
    }

    fn check_bands(&self, what: &str, len: usize) -> Result<(), FunctionError> {
        if len != self.array.bands() {
            return Err(FunctionError::InvalidLayer {
                layer: self.name.clone(),
                reason: format!("{what} has {len} entries for {} bands", self.array.bands()),
            });
        }
        Ok(())
    }

    /// Per-band no-data values
    pub fn with_band_no_data(mut self, no_data: Vec<Option<f64>>) -> Result<Self, FunctionError> {
        self.check_bands("no-data list", no_data.len())?;
        self.band_no_data = no_data;
        Ok(self)
    }

    /// Band center wavelengths
    pub fn with_wavelengths(
        mut self,
        wavelengths: Vec<f64>,
        unit: WavelengthUnit,
    ) -> Result<Self, FunctionError> {
        self.check_bands("wavelength list", wavelengths.len())?;
        self.wavelengths = Some(wavelengths);
        self.wavelength_unit = unit;
        Ok(self)
    }

    /// Bad band flags (`true` = bad)
    pub fn with_bad_bands(mut self, bad_bands: Vec<bool>) -> Result<Self, FunctionError> {
        self.check_bands("bad band list", bad_bands.len())?;
        self.bad_bands = Some(bad_bands);
        Ok(self)
    }

    /// Band-sequential pixel data
    pub fn array(&self) -> &RasterArray {
        &self.array
    }

    /// Pixel to map transformation
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Number of bands
    pub fn bands(&self) -> usize {
        self.array.bands()
    }

    /// Number of rows
    pub fn lines(&self) -> usize {
        self.array.lines()
    }

    /// Number of columns
    pub fn samples(&self) -> usize {
        self.array.samples()
    }

    /// Band center wavelengths, if the layer has a spectral axis
    pub fn wavelengths(&self) -> Option<&[f64]> {
        self.wavelengths.as_deref()
    }

    /// Unit of [`RasterLayer::wavelengths`]
    pub fn wavelength_unit(&self) -> WavelengthUnit {
        self.wavelength_unit
    }

    /// Bad-band mask, `true` for bands to ignore
    pub fn bad_bands(&self) -> Option<&[bool]> {
        self.bad_bands.as_deref()
    }

    /// Cell containing a map coordinate, if it lies on the raster
    pub fn cell_at(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let (col, row) = self.transform.to_pixel(x, y);
        self.cell_index(col.floor(), row.floor())
    }

    /// `(line, sample)` of integral pixel coordinates inside the raster
    pub(crate) fn cell_index(&self, col: f64, row: f64) -> Option<(usize, usize)> {
        if !(col.is_finite() && row.is_finite()) || col < 0.0 || row < 0.0 {
            return None;
        }
        let (sample, line) = (col as usize, row as usize);
        (line < self.lines() && sample < self.samples()).then_some((line, sample))
    }

    /// Values of all bands at a cell; no-data becomes `NaN`
    pub fn pixel(&self, line: usize, sample: usize) -> Option<Vec<f64>> {
        let values = self.array.pixel_profile(line, sample)?;
        Some(
            values
                .into_iter()
                .zip(&self.band_no_data)
                .map(|(v, nd)| match nd {
                    Some(nd) if *nd == v => f64::NAN,
                    _ => v,
                })
                .collect(),
        )
    }
}

/// Named raster layers available to expression functions
#[derive(Debug, Clone, Default)]
pub struct LayerRegistry {
    layers: BTreeMap<String, RasterLayer>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layer under its name, replacing any layer of the same name
    pub fn insert(&mut self, layer: RasterLayer) -> Option<RasterLayer> {
        self.layers.insert(layer.name.clone(), layer)
    }

    pub fn get(&self, name: &str) -> Option<&RasterLayer> {
        self.layers.get(name)
    }

    /// Layer names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
