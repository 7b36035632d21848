use super::MapperError;

/// Element storage of a [`RasterArray`]
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    /// 32-bit integers (class codes, boolean fields)
    Int32(Vec<i32>),
    /// 64-bit integers
    Int64(Vec<i64>),
    /// 64-bit floats
    Float64(Vec<f64>),
}

impl ArrayData {
    /// Number of elements
    pub fn len(&self) -> usize {
        match self {
            ArrayData::Int32(v) => v.len(),
            ArrayData::Int64(v) => v.len(),
            ArrayData::Float64(v) => v.len(),
        }
    }

    /// True without elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True for integer storage
    pub fn is_integral(&self) -> bool {
        !matches!(self, ArrayData::Float64(_))
    }

    /// Element `i` as `f64`
    pub fn value_f64(&self, i: usize) -> Option<f64> {
        match self {
            ArrayData::Int32(v) => v.get(i).map(|x| f64::from(*x)),
            ArrayData::Int64(v) => v.get(i).map(|x| *x as f64),
            ArrayData::Float64(v) => v.get(i).copied(),
        }
    }

    /// Element `i` as `i64`; floats are truncated, `NaN` gives `None`
    pub fn value_i64(&self, i: usize) -> Option<i64> {
        match self {
            ArrayData::Int32(v) => v.get(i).map(|x| i64::from(*x)),
            ArrayData::Int64(v) => v.get(i).copied(),
            ArrayData::Float64(v) => v.get(i).filter(|x| x.is_finite()).map(|x| *x as i64),
        }
    }

    /// Type name used in log messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ArrayData::Int32(_) => "Int32",
            ArrayData::Int64(_) => "Int64",
            ArrayData::Float64(_) => "Float64",
        }
    }
}

/// Dense band-sequential array of shape `bands x lines x samples`
///
/// Element `(band, line, sample)` is stored at
/// `band * lines * samples + line * samples + sample`. Arrays produced from
/// attribute tables always have one line; each sample is one table row.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterArray {
    bands: usize,
    lines: usize,
    samples: usize,
    data: ArrayData,
    /// Output name used when the array is written back
    pub name: Option<String>,
    /// Value marking missing elements
    pub no_data: Option<f64>,
}

impl RasterArray {
    /// Create an array, checking that `data` holds `bands * lines * samples` elements
    pub fn new(
        bands: usize,
        lines: usize,
        samples: usize,
        data: ArrayData,
    ) -> Result<Self, MapperError> {
        let expected = bands * lines * samples;
        if data.len() != expected {
            return Err(MapperError::InvalidArray(format!(
                "{} x {} x {} needs {} elements, got {}",
                bands,
                lines,
                samples,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            bands,
            lines,
            samples,
            data,
            name: None,
            no_data: None,
        })
    }

    /// Set the output name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the no-data value
    pub fn with_no_data(mut self, no_data: f64) -> Self {
        self.no_data = Some(no_data);
        self
    }

    /// `(bands, lines, samples)`
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.bands, self.lines, self.samples)
    }

    /// Number of bands
    pub fn bands(&self) -> usize {
        self.bands
    }

    /// Number of lines
    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Number of samples per line
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Raw element storage
    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    /// True for integer storage
    pub fn is_integral(&self) -> bool {
        self.data.is_integral()
    }

    fn index(&self, band: usize, line: usize, sample: usize) -> Option<usize> {
        if band < self.bands && line < self.lines && sample < self.samples {
            Some(band * self.lines * self.samples + line * self.samples + sample)
        } else {
            None
        }
    }

    /// Element at `(band, line, sample)`
    pub fn get(&self, band: usize, line: usize, sample: usize) -> Option<f64> {
        self.index(band, line, sample)
            .and_then(|i| self.data.value_f64(i))
    }

    /// Element at `(band, line, sample)` as integer
    pub fn get_i64(&self, band: usize, line: usize, sample: usize) -> Option<i64> {
        self.index(band, line, sample)
            .and_then(|i| self.data.value_i64(i))
    }

    /// All band values of one cell
    pub fn pixel_profile(&self, line: usize, sample: usize) -> Option<Vec<f64>> {
        (0..self.bands)
            .map(|b| self.get(b, line, sample))
            .collect()
    }

    /// True if `value` marks a missing element (`NaN` or the no-data value)
    pub fn is_no_data(&self, value: f64) -> bool {
        value.is_nan() || self.no_data.is_some_and(|nd| nd == value)
    }
}
