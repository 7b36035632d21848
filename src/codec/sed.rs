//! Spectral Evolution `.sed` files
//!
//! A block of `Key: value` lines followed by a data table whose header starts
//! with `Wvl`:
//!
//! ```text
//! Comment:
//! Version: 2.3 [1.2.6]
//! Instrument: PSR-3500_SN1234 [3]
//! Date: 04/27/2018,04/27/2018
//! Temperature (C): 31.4,8.0,31.4,8.0
//! Units: Radiance
//! Channels: 1024
//! Data:
//! Wvl	Rad. (Ref.)	Rad. (Target)	Tgt./Ref. %
//! 350.0	1.2e-01	4.5e-02	37.50
//! ```
//!
//! Keys measured once for the reference and once for the target carry both
//! values separated by commas; they are split into `<Key>_R` / `<Key>_T`
//! metadata entries.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use log::debug;

use super::{CodecError, FileFormat, NamedProfile, ParsedFile};
use crate::profile::{MetadataValue, SpectralProfileBuilder, WavelengthUnit};

/// Highest major `Version:` this reader understands
const MAX_MAJOR_VERSION: u32 = 2;

/// How a composite value is split: (key, metadata stem, reference index, target index, kind)
const COMPOSITE_KEYS: [(&str, &str, usize, usize, ValueKind); 8] = [
    ("Date", "Date", 0, 1, ValueKind::Date),
    ("Time", "Time", 0, 1, ValueKind::Time),
    ("Temperature (C)", "Temperature", 0, 2, ValueKind::Number),
    ("Battery Voltage", "BatteryVoltage", 0, 1, ValueKind::Number),
    ("Averages", "Averages", 0, 1, ValueKind::Integer),
    ("Integration", "Integration", 0, 2, ValueKind::Integer),
    ("Dark Mode", "DarkMode", 0, 1, ValueKind::Text),
    ("Foreoptic", "ForeOptic", 0, 1, ValueKind::Text),
];

/// Single-valued keys and the metadata names they are stored under
const SIMPLE_KEYS: [(&str, &str, ValueKind); 16] = [
    ("Comment", "Comment", ValueKind::Text),
    ("Version", "Version", ValueKind::Text),
    ("File Name", "FileName", ValueKind::Text),
    ("Instrument", "Instrument", ValueKind::Text),
    ("Detectors", "Detectors", ValueKind::Text),
    ("Measurement", "Measurement", ValueKind::Text),
    ("Radiometric Calibration", "RadiometricCalibration", ValueKind::Text),
    ("Units", "Units", ValueKind::Text),
    ("Wavelength Range", "WavelengthRange", ValueKind::Text),
    ("Latitude", "Latitude", ValueKind::Number),
    ("Longitude", "Longitude", ValueKind::Number),
    ("Altitude", "Altitude", ValueKind::Number),
    ("GPS Time", "GPSTime", ValueKind::Time),
    ("Satellites", "Satellites", ValueKind::Text),
    (
        "Calibrated Reference Correction File",
        "CalRefCorFile",
        ValueKind::Text,
    ),
    ("Channels", "Channels", ValueKind::Integer),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Text,
    Integer,
    Number,
    Date,
    Time,
}

impl ValueKind {
    /// Typed value, or the trimmed text when it does not parse as the kind
    fn convert(&self, raw: &str) -> MetadataValue {
        let raw = raw.trim();
        let typed = match self {
            ValueKind::Text => None,
            ValueKind::Integer => raw.parse::<i64>().ok().map(MetadataValue::Integer),
            ValueKind::Number => raw.parse::<f64>().ok().map(MetadataValue::Number),
            ValueKind::Date => NaiveDate::parse_from_str(raw, "%m/%d/%Y")
                .ok()
                .map(|d| MetadataValue::Text(d.format("%Y-%m-%d").to_string())),
            ValueKind::Time => NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
                .ok()
                .map(|t| MetadataValue::Text(t.format("%H:%M:%S").to_string())),
        };
        typed.unwrap_or_else(|| MetadataValue::Text(raw.to_string()))
    }
}

/// `Key: value` split of a header line
fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}

fn is_table_header(line: &str) -> bool {
    line.starts_with("Wvl") && !line.contains(':')
}

pub(crate) fn sniff(bytes: &[u8]) -> bool {
    let Ok(text) = std::str::from_utf8(bytes) else {
        return false;
    };
    let mut lines = text.lines().map(str::trim_end).filter(|l| !l.is_empty());
    match lines.next() {
        Some(first) if split_key_value(first).is_some() => {}
        _ => return false,
    }
    lines.any(is_table_header)
}

/// Major number of a `Version:` value such as `2.3 [1.2.6]`
fn major_version(version: &str) -> Option<u32> {
    let digits: String = version
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Sub-profile name for a table column label
fn column_name(label: &str, index: usize, width: usize) -> String {
    let lower = label.to_ascii_lowercase();
    if lower.contains('%') || lower.contains("tgt./ref") || lower.starts_with("reflect") {
        "Reflectance".to_string()
    } else if lower.contains("ref") {
        "Reference".to_string()
    } else if lower.contains("target") || lower.contains("tgt") {
        "Target".to_string()
    } else if width == 4 {
        ["Reference", "Target", "Reflectance"][index].to_string()
    } else if label.trim().is_empty() {
        format!("Column{}", index + 1)
    } else {
        label.trim().to_string()
    }
}

pub(crate) fn parse(bytes: &[u8]) -> Result<ParsedFile, CodecError> {
    let text = String::from_utf8_lossy(bytes);
    let lines: Vec<&str> = text.lines().collect();

    let mut metadata = BTreeMap::new();
    let mut header_line = None;

    for (i, line) in lines.iter().enumerate() {
        let line = line.trim_end();
        if is_table_header(line) {
            header_line = Some(i);
            break;
        }
        let Some((key, value)) = split_key_value(line) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }

        if key == "Version" {
            if let Some(major) = major_version(value) {
                if major > MAX_MAJOR_VERSION {
                    return Err(CodecError::UnsupportedVersion {
                        format: FileFormat::SpectralEvolution,
                        version: value.to_string(),
                    });
                }
            }
        }

        if let Some((_, stem, r, t, kind)) = COMPOSITE_KEYS.iter().find(|c| c.0 == key) {
            let parts: Vec<&str> = value.split(',').collect();
            if let Some(raw) = parts.get(*r) {
                metadata.insert(format!("{stem}_R"), kind.convert(raw));
            }
            if let Some(raw) = parts.get(*t) {
                metadata.insert(format!("{stem}_T"), kind.convert(raw));
            }
        } else if let Some((_, name, kind)) = SIMPLE_KEYS.iter().find(|s| s.0 == key) {
            metadata.insert(name.to_string(), kind.convert(value));
        } else {
            debug!("Ignoring SED header key {key:?}");
        }
    }

    let header_line = header_line.ok_or_else(|| {
        CodecError::malformed(FileFormat::SpectralEvolution, "no 'Wvl' table header")
    })?;
    let labels: Vec<&str> = lines[header_line].trim().split('\t').collect();

    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (i, line) in lines.iter().enumerate().skip(header_line + 1) {
        let cells: Vec<&str> = line.split_whitespace().collect();
        if cells.is_empty() {
            break;
        }
        if let Some(first) = rows.first() {
            if cells.len() != first.len() {
                break;
            }
        }
        let row = cells
            .iter()
            .enumerate()
            .map(|(col, cell)| {
                cell.parse::<f64>().map_err(|_| {
                    CodecError::malformed(
                        FileFormat::SpectralEvolution,
                        format!("bad number {cell:?} at line {}, column {}", i + 1, col + 1),
                    )
                })
            })
            .collect::<Result<Vec<f64>, _>>()?;
        rows.push(row);
    }

    let width = rows.first().map(Vec::len).unwrap_or(0);
    if width < 2 {
        return Err(CodecError::malformed(
            FileFormat::SpectralEvolution,
            "no spectral data below the table header",
        ));
    }

    let wavelengths: Vec<f64> = rows.iter().map(|r| r[0]).collect();
    let units = metadata
        .get("Units")
        .and_then(MetadataValue::as_str)
        .map(str::to_string);

    let mut profiles = Vec::with_capacity(width - 1);
    for col in 1..width {
        let label = if labels.len() == width { labels[col] } else { "" };
        let mut name = column_name(label, col - 1, width);
        if profiles.iter().any(|p: &NamedProfile| p.name == name) {
            name = format!("{name}_{col}");
        }
        let values: Vec<f64> = rows.iter().map(|r| r[col]).collect();
        let mut builder = SpectralProfileBuilder::new(values)
            .wavelengths(wavelengths.clone())
            .wavelength_unit(WavelengthUnit::Nanometers);
        if name == "Reflectance" {
            builder = builder.value_unit("%");
        } else if let Some(units) = &units {
            builder = builder.value_unit(units.clone());
        }
        profiles.push(NamedProfile {
            name,
            profile: builder.build()?,
        });
    }

    let primary = profiles
        .iter()
        .position(|p| p.name == "Reflectance")
        .unwrap_or(profiles.len() - 1);

    debug!(
        "SED file: {} bands, profiles {:?}",
        wavelengths.len(),
        profiles.iter().map(|p| p.name.as_str()).collect::<Vec<_>>()
    );

    Ok(ParsedFile {
        format: FileFormat::SpectralEvolution,
        name: None,
        profiles,
        metadata,
        primary,
    })
}
