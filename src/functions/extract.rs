use geo::Geometry;
use log::debug;

use super::geometry::{geometry_cells, is_single_point};
use super::{Aggregate, FunctionError, RasterLayer};
use crate::profile::{SpectralProfile, SpectralProfileBuilder, WavelengthUnit};

/// Profile of one raster cell
#[derive(Debug, Clone, PartialEq)]
pub struct CellProfile {
    pub line: usize,
    pub sample: usize,
    pub profile: SpectralProfile,
}

/// Result of [`profile_at`]
#[derive(Debug, Clone, PartialEq)]
pub enum PixelProfiles {
    /// One profile: the aggregate, or the single pixel of a point
    Single {
        profile: SpectralProfile,
        /// Cells the profile was computed from
        cells: Vec<(usize, usize)>,
    },
    /// One profile per cell (aggregate `none`)
    PerCell(Vec<CellProfile>),
}

impl PixelProfiles {
    /// All profiles, in cell order
    pub fn profiles(&self) -> Vec<&SpectralProfile> {
        match self {
            PixelProfiles::Single { profile, .. } => vec![profile],
            PixelProfiles::PerCell(cells) => cells.iter().map(|c| &c.profile).collect(),
        }
    }
}

fn layer_profile(layer: &RasterLayer, values: Vec<f64>) -> Result<SpectralProfile, FunctionError> {
    let mut builder = SpectralProfileBuilder::new(values);
    if let Some(wavelengths) = layer.wavelengths() {
        builder = builder.wavelengths(wavelengths.to_vec());
        if layer.wavelength_unit() != WavelengthUnit::Unspecified {
            builder = builder.wavelength_unit(layer.wavelength_unit());
        }
    }
    if let Some(bad_bands) = layer.bad_bands() {
        builder = builder.bad_bands(bad_bands.to_vec());
    }
    Ok(builder.build()?)
}

/// Extract the pixel profiles of `layer` under `geometry`.
///
/// No-data values become `NaN`; cells where every band is `NaN` are dropped.
/// With [`Aggregate::None`] a non-point geometry yields one profile per cell.
pub fn profile_at(
    layer: &RasterLayer,
    geometry: &Geometry<f64>,
    aggregate: Aggregate,
    all_touched: bool,
) -> Result<PixelProfiles, FunctionError> {
    let mut cells = Vec::new();
    let mut pixels = Vec::new();
    for (line, sample) in geometry_cells(layer, geometry, all_touched) {
        let Some(values) = layer.pixel(line, sample) else {
            continue;
        };
        if values.iter().all(|v| v.is_nan()) {
            continue;
        }
        cells.push((line, sample));
        pixels.push(values);
    }

    if pixels.is_empty() {
        return Err(FunctionError::NoPixels);
    }
    debug!(
        "Layer '{}': {} pixel(s) under geometry, aggregate {}",
        layer.name,
        pixels.len(),
        aggregate
    );

    if let Some(values) = aggregate.reduce(&pixels, layer.bands()) {
        return Ok(PixelProfiles::Single {
            profile: layer_profile(layer, values)?,
            cells,
        });
    }

    if is_single_point(geometry) {
        let values = pixels.swap_remove(0);
        return Ok(PixelProfiles::Single {
            profile: layer_profile(layer, values)?,
            cells,
        });
    }

    let per_cell = cells
        .into_iter()
        .zip(pixels)
        .map(|((line, sample), values)| {
            Ok(CellProfile {
                line,
                sample,
                profile: layer_profile(layer, values)?,
            })
        })
        .collect::<Result<Vec<_>, FunctionError>>()?;
    Ok(PixelProfiles::PerCell(per_cell))
}
