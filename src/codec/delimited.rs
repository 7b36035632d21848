//! Delimited spectral tables (CSV / TSV / ASD ViewSpecPro exports)
//!
//! The first column holds the wavelength axis, every further column one
//! profile named by its header cell:
//!
//! ```text
//! Wavelength;sample_01.asd;sample_02.asd
//! 350;0.041;0.038
//! 351;0.042;0.039
//! ```
//!
//! The delimiter is picked from the header line (`;`, then tab, then `,`).
//! A unit in the first header cell (`wavelength [nm]`, `Wavelength (µm)`)
//! is taken as stated; otherwise it is inferred with the [`UnitPolicy`].
//! Empty cells are read as `NaN`.

use std::collections::BTreeMap;

use log::debug;

use super::{CodecError, FileFormat, NamedProfile, ParsedFile};
use crate::profile::{SpectralProfileBuilder, UnitPolicy, WavelengthUnit};

/// Header names accepted for the wavelength column
const WAVELENGTH_NAMES: [&str; 11] = [
    "wavelength",
    "wavelengths",
    "wvl",
    "wl",
    "lambda",
    "band",
    "x",
    "nm",
    "um",
    "µm",
    "μm",
];

fn pick_delimiter(header: &str) -> u8 {
    if header.contains(';') {
        b';'
    } else if header.contains('\t') {
        b'\t'
    } else {
        b','
    }
}

/// Split a header cell like `Wavelength [nm]` into its name and unit
fn split_unit(cell: &str) -> (String, Option<WavelengthUnit>) {
    let cell = cell.trim().trim_matches('"');
    if let Some(unit) = WavelengthUnit::from_symbol(cell) {
        return (cell.to_ascii_lowercase(), Some(unit));
    }
    for (open, close) in [('[', ']'), ('(', ')')] {
        if let (Some(start), Some(end)) = (cell.find(open), cell.rfind(close)) {
            if start < end {
                let name = cell[..start].trim().to_ascii_lowercase();
                let unit = WavelengthUnit::from_symbol(&cell[start + 1..end]);
                return (name, unit);
            }
        }
    }
    (cell.to_ascii_lowercase(), None)
}

fn first_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|l| !l.is_empty())
}

pub(crate) fn sniff(bytes: &[u8]) -> bool {
    let Ok(text) = std::str::from_utf8(bytes) else {
        return false;
    };
    let Some(header) = first_line(text) else {
        return false;
    };
    let delimiter = pick_delimiter(header) as char;
    let mut cells = header.split(delimiter);
    let Some(first) = cells.next() else {
        return false;
    };
    if cells.next().is_none() {
        return false;
    }
    let (name, _) = split_unit(first);
    WAVELENGTH_NAMES.contains(&name.as_str())
}

fn parse_cell(cell: &str, line: u64, column: usize) -> Result<f64, CodecError> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(f64::NAN);
    }
    cell.parse::<f64>().map_err(|_| {
        CodecError::malformed(
            FileFormat::DelimitedTable,
            format!("bad number {cell:?} at line {line}, column {column}"),
        )
    })
}

pub(crate) fn parse(bytes: &[u8], policy: &UnitPolicy) -> Result<ParsedFile, CodecError> {
    let text = std::str::from_utf8(bytes).map_err(|e| {
        CodecError::malformed(FileFormat::DelimitedTable, format!("not UTF-8 text: {e}"))
    })?;
    let header = first_line(text)
        .ok_or_else(|| CodecError::malformed(FileFormat::DelimitedTable, "empty file"))?;
    let delimiter = pick_delimiter(header);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| CodecError::malformed(FileFormat::DelimitedTable, e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.len() < 2 {
        return Err(CodecError::malformed(
            FileFormat::DelimitedTable,
            "header needs a wavelength column and at least one value column",
        ));
    }
    let (_, stated_unit) = split_unit(&headers[0]);

    let mut wavelengths = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); headers.len() - 1];

    for record in reader.records() {
        let record =
            record.map_err(|e| CodecError::malformed(FileFormat::DelimitedTable, e.to_string()))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        if record.iter().all(str::is_empty) {
            continue;
        }
        if record.len() != headers.len() {
            return Err(CodecError::malformed(
                FileFormat::DelimitedTable,
                format!(
                    "line {line} has {} cells, header has {}",
                    record.len(),
                    headers.len()
                ),
            ));
        }
        wavelengths.push(parse_cell(&record[0], line, 1)?);
        for (i, column) in columns.iter_mut().enumerate() {
            column.push(parse_cell(&record[i + 1], line, i + 2)?);
        }
    }

    if wavelengths.is_empty() {
        return Err(CodecError::malformed(
            FileFormat::DelimitedTable,
            "no data rows",
        ));
    }

    let unit = stated_unit.unwrap_or_else(|| policy.infer(&wavelengths));
    debug!(
        "Delimited table: {} rows, {} profile column(s), unit {}",
        wavelengths.len(),
        columns.len(),
        unit
    );

    let mut profiles = Vec::with_capacity(columns.len());
    for (i, values) in columns.into_iter().enumerate() {
        let name = match headers[i + 1].trim() {
            "" => format!("Column{}", i + 1),
            name => name.to_string(),
        };
        profiles.push(NamedProfile {
            name,
            profile: SpectralProfileBuilder::new(values)
                .wavelengths(wavelengths.clone())
                .wavelength_unit(unit)
                .build()?,
        });
    }

    Ok(ParsedFile {
        format: FileFormat::DelimitedTable,
        name: None,
        profiles,
        metadata: BTreeMap::new(),
        primary: 0,
    })
}
