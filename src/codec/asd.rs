//! ASD FieldSpec binary files
//!
//! Layout (ASD File Format v8): a fixed 484-byte little-endian header, the
//! spectrum (`channels` values in the header's data format), then an optional
//! reference block:
//!
//! ```text
//! 0    char[3]  signature (ASD, asd, as6, as7, as8)
//! 3    char[157] comments
//! 160  i16[9]   save time (struct tm)
//! 178  u8       program version (major << 4 | minor)
//! 179  u8       file version
//! 181  u8       dark current subtracted
//! 182  i32      dark current time (unix seconds)
//! 186  u8       data type
//! 187  i32      white reference time (unix seconds)
//! 191  f32      first channel wavelength [nm]
//! 195  f32      wavelength step [nm]
//! 199  u8       data format (0 = f32, 1 = i32, 2 = f64)
//! 204  u16      channels
//! 334  f64[5]   GPS heading, speed, latitude, longitude (DDMM.mm), altitude
//! 390  u32      integration time [ms]
//! ...
//! 484           spectrum data
//! ```
//!
//! Reference block at `o = 484 + spectrum size`: flag byte at `o`, two
//! timestamps at `o + 2` / `o + 10`, a u16-length-prefixed description at
//! `o + 18`, the reference spectrum right after the description.

use std::collections::BTreeMap;
use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};
use chrono::{DateTime, NaiveDate};
use log::{debug, warn};

use super::{CodecError, FileFormat, NamedProfile, ParsedFile};
use crate::profile::{MetadataValue, SpectralProfileBuilder, WavelengthUnit};

/// Size of the fixed file header
pub(crate) const HEADER_SIZE: usize = 484;

const SUPPORTED_SIGNATURES: [&[u8; 3]; 5] = [b"ASD", b"asd", b"as6", b"as7", b"as8"];

const DATA_TYPES: [&str; 9] = [
    "raw",
    "reflectance",
    "radiance",
    "no_units",
    "irradiance",
    "qi",
    "transmittance",
    "unknown",
    "absorbance",
];

const INSTRUMENTS: [&str; 8] = [
    "UNKNOWN",
    "PSII",
    "LSVNIR",
    "FSVNIR",
    "FSFR",
    "FSNIR",
    "CHEM",
    "FSFR_UNATTENDED",
];

/// Numeric layout of the stored spectra
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataFormat {
    Float32,
    Int32,
    Float64,
}

impl DataFormat {
    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(DataFormat::Float32),
            1 => Some(DataFormat::Int32),
            2 => Some(DataFormat::Float64),
            _ => None,
        }
    }

    fn byte_size(&self) -> usize {
        match self {
            DataFormat::Float32 | DataFormat::Int32 => 4,
            DataFormat::Float64 => 8,
        }
    }
}

/// True for `as1` .. `as5`: older ASD layouts this reader does not decode
fn is_legacy_signature(sig: &[u8]) -> bool {
    sig.len() == 3 && sig[0] == b'a' && sig[1] == b's' && (b'1'..=b'5').contains(&sig[2])
}

pub(crate) fn sniff(bytes: &[u8]) -> bool {
    if bytes.len() < 3 {
        return false;
    }
    let sig = &bytes[..3];
    SUPPORTED_SIGNATURES.iter().any(|s| s.as_slice() == sig) || is_legacy_signature(sig)
}

/// Little-endian reads at fixed offsets
struct HeaderReader<'a> {
    bytes: &'a [u8],
}

impl<'a> HeaderReader<'a> {
    fn at(&self, offset: usize) -> Result<Cursor<&'a [u8]>, CodecError> {
        if offset > self.bytes.len() {
            return Err(truncated(offset));
        }
        Ok(Cursor::new(&self.bytes[offset..]))
    }

    fn u8(&self, offset: usize) -> Result<u8, CodecError> {
        self.bytes.get(offset).copied().ok_or_else(|| truncated(offset))
    }

    fn u16(&self, offset: usize) -> Result<u16, CodecError> {
        self.at(offset)?
            .read_u16::<LittleEndian>()
            .map_err(|_| truncated(offset))
    }

    fn i16(&self, offset: usize) -> Result<i16, CodecError> {
        self.at(offset)?
            .read_i16::<LittleEndian>()
            .map_err(|_| truncated(offset))
    }

    fn i32(&self, offset: usize) -> Result<i32, CodecError> {
        self.at(offset)?
            .read_i32::<LittleEndian>()
            .map_err(|_| truncated(offset))
    }

    fn u32(&self, offset: usize) -> Result<u32, CodecError> {
        self.at(offset)?
            .read_u32::<LittleEndian>()
            .map_err(|_| truncated(offset))
    }

    fn f32(&self, offset: usize) -> Result<f32, CodecError> {
        self.at(offset)?
            .read_f32::<LittleEndian>()
            .map_err(|_| truncated(offset))
    }

    fn f64(&self, offset: usize) -> Result<f64, CodecError> {
        self.at(offset)?
            .read_f64::<LittleEndian>()
            .map_err(|_| truncated(offset))
    }

    /// `count` values in `format` starting at `offset`
    fn spectrum(&self, offset: usize, count: usize, format: DataFormat) -> Result<Vec<f64>, CodecError> {
        let end = offset + count * format.byte_size();
        if end > self.bytes.len() {
            return Err(CodecError::malformed(
                FileFormat::AsdBinary,
                format!(
                    "truncated spectrum: need {} bytes, file has {}",
                    end,
                    self.bytes.len()
                ),
            ));
        }
        let mut cursor = self.at(offset)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            let value = match format {
                DataFormat::Float32 => cursor.read_f32::<LittleEndian>().map(f64::from),
                DataFormat::Int32 => cursor.read_i32::<LittleEndian>().map(f64::from),
                DataFormat::Float64 => cursor.read_f64::<LittleEndian>(),
            };
            values.push(value.map_err(|_| truncated(offset))?);
        }
        Ok(values)
    }

    fn text(&self, offset: usize, len: usize) -> String {
        let end = (offset + len).min(self.bytes.len());
        let raw = &self.bytes[offset.min(end)..end];
        String::from_utf8_lossy(raw)
            .trim_end_matches('\0')
            .trim()
            .to_string()
    }
}

fn truncated(offset: usize) -> CodecError {
    CodecError::malformed(
        FileFormat::AsdBinary,
        format!("truncated file at byte {offset}"),
    )
}

/// Degrees + minutes (`DDDMM.mmm`) to decimal degrees
fn dm_to_decimal(dm: f64) -> f64 {
    let degrees = (dm / 100.0).trunc();
    let minutes = dm - degrees * 100.0;
    degrees + minutes / 60.0
}

fn unix_time(seconds: i64) -> Option<String> {
    DateTime::from_timestamp(seconds, 0).map(|t| t.to_rfc3339())
}

/// `struct tm` at offset 160
fn save_time(header: &HeaderReader<'_>) -> Result<Option<String>, CodecError> {
    let mut tm = [0i16; 6];
    for (i, v) in tm.iter_mut().enumerate() {
        *v = header.i16(160 + 2 * i)?;
    }
    let [sec, min, hour, mday, mon, year] = tm;
    let time = NaiveDate::from_ymd_opt(
        i32::from(year) + 1900,
        u32::try_from(i32::from(mon) + 1).unwrap_or(0),
        u32::try_from(mday).unwrap_or(0),
    )
    .and_then(|d| {
        d.and_hms_opt(
            u32::try_from(hour).unwrap_or(99),
            u32::try_from(min).unwrap_or(99),
            u32::try_from(sec).unwrap_or(99),
        )
    });
    Ok(time.map(|t| t.format("%Y-%m-%dT%H:%M:%S").to_string()))
}

/// Description and reference spectrum of the block starting at `offset`
fn read_reference(
    header: &HeaderReader<'_>,
    offset: usize,
    channels: usize,
    format: DataFormat,
) -> Result<(String, Vec<f64>), CodecError> {
    let description_len = header.u16(offset + 18)? as usize;
    let description = header.text(offset + 20, description_len);
    let reference = header.spectrum(offset + 20 + description_len, channels, format)?;
    Ok((description, reference))
}

pub(crate) fn parse(bytes: &[u8]) -> Result<ParsedFile, CodecError> {
    if bytes.len() < 3 {
        return Err(truncated(bytes.len()));
    }
    let signature = &bytes[..3];
    if is_legacy_signature(signature) {
        return Err(CodecError::UnsupportedVersion {
            format: FileFormat::AsdBinary,
            version: String::from_utf8_lossy(signature).into_owned(),
        });
    }
    if !SUPPORTED_SIGNATURES.iter().any(|s| s.as_slice() == signature) {
        return Err(CodecError::malformed(
            FileFormat::AsdBinary,
            "missing ASD signature",
        ));
    }
    if bytes.len() < HEADER_SIZE {
        return Err(CodecError::malformed(
            FileFormat::AsdBinary,
            format!("truncated header: {} of {} bytes", bytes.len(), HEADER_SIZE),
        ));
    }

    let header = HeaderReader { bytes };
    let channels = header.u16(204)? as usize;
    if channels == 0 {
        return Err(CodecError::malformed(FileFormat::AsdBinary, "zero channels"));
    }
    let format_code = header.u8(199)?;
    let data_format = DataFormat::from_code(format_code).ok_or_else(|| {
        CodecError::malformed(
            FileFormat::AsdBinary,
            format!("unknown data format {format_code}"),
        )
    })?;

    let first_wavelength = f64::from(header.f32(191)?);
    let step = f64::from(header.f32(195)?);
    let wavelengths: Vec<f64> = (0..channels)
        .map(|i| first_wavelength + i as f64 * step)
        .collect();

    let data_type = DATA_TYPES
        .get(header.u8(186)? as usize)
        .copied()
        .unwrap_or("unknown");

    let mut metadata = BTreeMap::new();
    let mut put = |key: &str, value: MetadataValue| {
        metadata.insert(key.to_string(), value);
    };

    put("co", String::from_utf8_lossy(signature).into_owned().into());
    let comments = header.text(3, 157);
    if !comments.is_empty() {
        put("comments", comments.into());
    }
    if let Some(when) = save_time(&header)? {
        put("when", when.into());
    }
    let program_version = header.u8(178)?;
    put(
        "program_version",
        format!("{}.{}", program_version >> 4, program_version & 0x0f).into(),
    );
    put("file_version", i64::from(header.u8(179)?).into());
    put("dc_corr", (header.u8(181)? != 0).into());
    if let Some(t) = unix_time(i64::from(header.i32(182)?)) {
        put("dc_time", t.into());
    }
    put("data_type", data_type.into());
    if let Some(t) = unix_time(i64::from(header.i32(187)?)) {
        put("ref_time", t.into());
    }
    put("ch1_wavel", first_wavelength.into());
    put("wavel_step", step.into());
    put("channels", (channels as i64).into());

    let latitude = dm_to_decimal(header.f64(334 + 16)?);
    let longitude = -dm_to_decimal(header.f64(334 + 24)?);
    put("gps_true_heading", header.f64(334)?.into());
    put("gps_speed", header.f64(334 + 8)?.into());
    put("latitude", latitude.into());
    put("longitude", longitude.into());
    put("altitude", header.f64(334 + 32)?.into());

    put("it", header.u32(390)?.into());
    put("fo", i64::from(header.i16(394)?).into());
    put("dcc", i64::from(header.i16(396)?).into());
    put("calibration", i64::from(header.u16(398)?).into());
    put("instrument_num", i64::from(header.u16(400)?).into());
    put("ip_numbits", i64::from(header.u16(418)?).into());
    put("xmode", i64::from(header.u8(420)?).into());
    put("dc_count", i64::from(header.u16(425)?).into());
    put("ref_count", i64::from(header.u16(427)?).into());
    put("sample_count", i64::from(header.u16(429)?).into());
    let instrument = INSTRUMENTS
        .get(header.u8(431)? as usize)
        .copied()
        .unwrap_or("UNKNOWN");
    put("instrument", instrument.into());
    put("splice1_wavelength", f64::from(header.f32(444)?).into());
    put("splice2_wavelength", f64::from(header.f32(448)?).into());

    let spectrum = header.spectrum(HEADER_SIZE, channels, data_format)?;
    let size = channels * data_format.byte_size();

    let mut profiles = vec![NamedProfile {
        name: "Spectrum".to_string(),
        profile: SpectralProfileBuilder::new(spectrum)
            .wavelengths(wavelengths.clone())
            .wavelength_unit(WavelengthUnit::Nanometers)
            .value_unit(data_type)
            .build()?,
    }];

    let offset = HEADER_SIZE + size;
    if bytes.get(offset).is_some_and(|flag| *flag != 0) {
        match read_reference(&header, offset, channels, data_format) {
            Ok((description, reference)) => {
                if !description.is_empty() {
                    put("spectrum_description", description.into());
                }
                profiles.push(NamedProfile {
                    name: "Reference".to_string(),
                    profile: SpectralProfileBuilder::new(reference)
                        .wavelengths(wavelengths)
                        .wavelength_unit(WavelengthUnit::Nanometers)
                        .build()?,
                });
            }
            Err(e) => warn!("ASD reference block flagged but unreadable: {e}"),
        }
    }

    debug!(
        "ASD {} file: {} channels, data type {}, {} profile(s)",
        String::from_utf8_lossy(signature),
        channels,
        data_type,
        profiles.len()
    );

    Ok(ParsedFile {
        format: FileFormat::AsdBinary,
        name: None,
        profiles,
        metadata,
        primary: 0,
    })
}
