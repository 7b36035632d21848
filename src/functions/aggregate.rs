use std::fmt;
use std::str::FromStr;

use super::FunctionError;

/// Per-band reduction of the pixels under a geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregate {
    #[default]
    Mean,
    Median,
    Min,
    Max,
    /// Keep one profile per pixel
    None,
}

impl Aggregate {
    pub fn name(&self) -> &'static str {
        match self {
            Aggregate::Mean => "mean",
            Aggregate::Median => "median",
            Aggregate::Min => "min",
            Aggregate::Max => "max",
            Aggregate::None => "none",
        }
    }

    /// Reduce `pixels` (one value vector per pixel) to one value per band.
    ///
    /// `NaN` values are ignored; a band without any finite value yields `NaN`.
    /// Returns `None` for [`Aggregate::None`].
    pub fn reduce(&self, pixels: &[Vec<f64>], bands: usize) -> Option<Vec<f64>> {
        if *self == Aggregate::None {
            return None;
        }
        let reduced = (0..bands)
            .map(|b| {
                let mut values: Vec<f64> = pixels
                    .iter()
                    .filter_map(|p| p.get(b).copied())
                    .filter(|v| !v.is_nan())
                    .collect();
                if values.is_empty() {
                    return f64::NAN;
                }
                match self {
                    Aggregate::Mean => values.iter().sum::<f64>() / values.len() as f64,
                    Aggregate::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
                    Aggregate::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                    Aggregate::Median => median(&mut values),
                    Aggregate::None => f64::NAN,
                }
            })
            .collect();
        Some(reduced)
    }
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

impl FromStr for Aggregate {
    type Err = FunctionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mean" => Ok(Aggregate::Mean),
            "median" => Ok(Aggregate::Median),
            "min" => Ok(Aggregate::Min),
            "max" => Ok(Aggregate::Max),
            "none" => Ok(Aggregate::None),
            _ => Err(FunctionError::UnknownAggregate(s.to_string())),
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
