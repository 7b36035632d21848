use super::*;
use crate::profile::{MetadataValue, UnitPolicy, WavelengthUnit};
use byteorder::{LittleEndian, WriteBytesExt};

/// Minimal ASD file: float32 spectrum, optional reference block
fn asd_file(signature: &[u8; 3], spectrum: &[f32], reference: Option<&[f32]>) -> Vec<u8> {
    let mut bytes = vec![0u8; asd::HEADER_SIZE];
    bytes[..3].copy_from_slice(signature);
    bytes[3..3 + 12].copy_from_slice(b"field sample");

    let mut put = |offset: usize, data: Vec<u8>| {
        bytes[offset..offset + data.len()].copy_from_slice(&data);
    };
    let le_i16 = |v: i16| {
        let mut buf = Vec::new();
        buf.write_i16::<LittleEndian>(v).unwrap();
        buf
    };
    // 2019-06-12 10:30:15
    for (i, v) in [15i16, 30, 10, 12, 5, 119].iter().enumerate() {
        put(160 + 2 * i, le_i16(*v));
    }
    put(178, vec![0x62]);
    put(179, vec![8]);
    put(186, vec![1]);
    let mut buf = Vec::new();
    buf.write_f32::<LittleEndian>(350.0).unwrap();
    buf.write_f32::<LittleEndian>(1.0).unwrap();
    put(191, buf);
    put(199, vec![0]);
    let mut buf = Vec::new();
    buf.write_u16::<LittleEndian>(spectrum.len() as u16).unwrap();
    put(204, buf);
    let mut buf = Vec::new();
    for v in [0.0f64, 0.0, 5230.5, 1327.8, 45.0] {
        buf.write_f64::<LittleEndian>(v).unwrap();
    }
    put(334, buf);
    let mut buf = Vec::new();
    buf.write_u32::<LittleEndian>(17).unwrap();
    put(390, buf);
    let mut buf = Vec::new();
    buf.write_u16::<LittleEndian>(18120).unwrap();
    put(400, buf);
    let mut buf = Vec::new();
    buf.write_u16::<LittleEndian>(10).unwrap();
    buf.write_u16::<LittleEndian>(10).unwrap();
    buf.write_u16::<LittleEndian>(25).unwrap();
    put(425, buf);
    put(431, vec![4]);

    for v in spectrum {
        bytes.write_f32::<LittleEndian>(*v).unwrap();
    }
    if let Some(reference) = reference {
        bytes.push(1);
        bytes.push(0);
        bytes.write_i64::<LittleEndian>(0).unwrap();
        bytes.write_i64::<LittleEndian>(0).unwrap();
        let description = b"white panel";
        bytes
            .write_u16::<LittleEndian>(description.len() as u16)
            .unwrap();
        bytes.extend_from_slice(description);
        for v in reference {
            bytes.write_f32::<LittleEndian>(*v).unwrap();
        }
    }
    bytes
}

const SED_SAMPLE: &str = "Comment:
Version: 2.3 [1.2.6]
File Name: C:\\data\\sample_0001.sed
Instrument: PSR-3500_SN1234 [3]
Detectors: 512,256,256
Measurement: REFLECTANCE
Date: 04/27/2018,04/28/2018
Time: 10:22:05.12,10:23:41.50
Temperature (C): 31.4,8.0,30.9,7.5
Battery Voltage: 7.37,7.35
Averages: 10,20
Integration: 15,30,25,40
Dark Mode: AUTO,AUTO
Foreoptic: LENS4 {DN}, LENS4 {DN}
Radiometric Calibration: RADIANCE
Units: W/m^2/sr/nm
Wavelength Range: 350,2500
Latitude: 52.4321
Longitude: 13.3012
Altitude: 34.0
Channels: 3
Data:
Wvl\tRad. (Ref.)\tRad. (Target)\tTgt./Ref. %
350.0\t1.20e-01\t4.50e-02\t37.50
351.0\t1.22e-01\t4.60e-02\t37.70
352.0\t1.25e-01\t4.80e-02\t38.40
";

#[test]
fn test_delimited_minimal_table() {
    let profile = parse(b"wavelength,value\n350,0.10\n360,0.12\n", None).unwrap();
    assert_eq!(profile.values(), &[0.10, 0.12]);
    assert_eq!(profile.wavelengths(), Some(&[350.0, 360.0][..]));
    assert_eq!(profile.wavelength_unit(), WavelengthUnit::Nanometers);
}

#[test]
fn test_delimited_multiple_profiles() {
    let text = "Wavelength;leaf_01.asd;leaf_02.asd\n0.40;0.041;0.038\n0.41;;0.039\n";
    let parsed = parse_file(text.as_bytes(), None).unwrap();
    assert_eq!(parsed.format, FileFormat::DelimitedTable);
    assert_eq!(parsed.profile_names(), vec!["leaf_01.asd", "leaf_02.asd"]);

    let first = parsed.profile("leaf_01.asd").unwrap();
    assert_eq!(first.wavelength_unit(), WavelengthUnit::Micrometers);
    assert_eq!(first.values()[0], 0.041);
    assert!(first.values()[1].is_nan());
    assert_eq!(parsed.primary().unwrap().name, "leaf_01.asd");
}

#[test]
fn test_delimited_unit_from_header() {
    let text = "wavelength [nm]\tsample\n0.5\t1.0\n0.6\t2.0\n";
    let profile = parse(text.as_bytes(), None).unwrap();
    assert_eq!(profile.wavelength_unit(), WavelengthUnit::Nanometers);

    let text = "Wavelength (µm),sample\n400,1.0\n";
    let profile = parse(text.as_bytes(), None).unwrap();
    assert_eq!(profile.wavelength_unit(), WavelengthUnit::Micrometers);
}

#[test]
fn test_delimited_custom_threshold() {
    let codec = Codec::new().with_unit_policy(UnitPolicy::new(1000.0));
    let profile = codec
        .parse(b"wl,v\n350,0.1\n900,0.2\n", Some(FileFormat::DelimitedTable))
        .unwrap();
    assert_eq!(profile.wavelength_unit(), WavelengthUnit::Micrometers);
}

#[test]
fn test_delimited_bad_cell_reports_position() {
    let err = parse(b"wavelength,value\n350,0.10\n360,abc\n", None).unwrap_err();
    match err {
        CodecError::MalformedFile { format, reason } => {
            assert_eq!(format, FileFormat::DelimitedTable);
            assert!(reason.contains("line 3"), "{reason}");
            assert!(reason.contains("column 2"), "{reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_delimited_inconsistent_width() {
    let err = parse(b"wavelength,a,b\n350,1,2\n360,1\n", None).unwrap_err();
    assert!(matches!(err, CodecError::MalformedFile { .. }));
}

#[test]
fn test_delimited_without_rows() {
    let err = parse(b"wavelength,value\n", Some(FileFormat::DelimitedTable)).unwrap_err();
    assert!(matches!(err, CodecError::MalformedFile { .. }));
}

#[test]
fn test_asd_spectrum_and_reference() {
    let bytes = asd_file(b"as7", &[0.1, 0.2, 0.3, 0.4], Some(&[1.0, 1.0, 0.9, 0.8]));
    assert_eq!(detect(&bytes), Some(FileFormat::AsdBinary));

    let parsed = parse_file(&bytes, None).unwrap();
    assert_eq!(parsed.profile_names(), vec!["Spectrum", "Reference"]);

    let spectrum = &parsed.primary().unwrap().profile;
    assert_eq!(spectrum.band_count(), 4);
    assert_eq!(spectrum.wavelengths(), Some(&[350.0, 351.0, 352.0, 353.0][..]));
    assert_eq!(spectrum.wavelength_unit(), WavelengthUnit::Nanometers);
    assert_eq!(spectrum.value_unit(), Some("reflectance"));
    assert!((spectrum.values()[1] - 0.2).abs() < 1e-6);

    let reference = parsed.profile("Reference").unwrap();
    assert!((reference.values()[3] - 0.8).abs() < 1e-6);

    let meta = &parsed.metadata;
    assert_eq!(meta["co"], MetadataValue::from("as7"));
    assert_eq!(meta["comments"], MetadataValue::from("field sample"));
    assert_eq!(meta["when"], MetadataValue::from("2019-06-12T10:30:15"));
    assert_eq!(meta["program_version"], MetadataValue::from("6.2"));
    assert_eq!(meta["instrument"], MetadataValue::from("FSFR"));
    assert_eq!(meta["instrument_num"], MetadataValue::Integer(18120));
    assert_eq!(meta["sample_count"], MetadataValue::Integer(25));
    assert_eq!(meta["it"], MetadataValue::Integer(17));
    assert_eq!(meta["spectrum_description"], MetadataValue::from("white panel"));

    let latitude = meta["latitude"].as_f64().unwrap();
    let longitude = meta["longitude"].as_f64().unwrap();
    assert!((latitude - (52.0 + 30.5 / 60.0)).abs() < 1e-9);
    assert!((longitude + (13.0 + 27.8 / 60.0)).abs() < 1e-9);
}

#[test]
fn test_asd_without_reference() {
    let bytes = asd_file(b"ASD", &[0.5, 0.6], None);
    let parsed = parse_file(&bytes, Some(FileFormat::AsdBinary)).unwrap();
    assert_eq!(parsed.profile_names(), vec!["Spectrum"]);
}

#[test]
fn test_asd_legacy_version_rejected() {
    let bytes = asd_file(b"as3", &[0.5, 0.6], None);
    let err = parse(&bytes, None).unwrap_err();
    match err {
        CodecError::UnsupportedVersion { format, version } => {
            assert_eq!(format, FileFormat::AsdBinary);
            assert_eq!(version, "as3");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_asd_truncated() {
    let bytes = asd_file(b"as7", &[0.1, 0.2, 0.3], None);
    let err = parse(&bytes[..200], None).unwrap_err();
    assert!(matches!(err, CodecError::MalformedFile { .. }));

    let err = parse(&bytes[..bytes.len() - 2], None).unwrap_err();
    assert!(matches!(err, CodecError::MalformedFile { .. }));
}

#[test]
fn test_asd_zero_channels() {
    let bytes = asd_file(b"as7", &[], None);
    let err = parse(&bytes, None).unwrap_err();
    match err {
        CodecError::MalformedFile { reason, .. } => assert!(reason.contains("zero channels")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_sed_profiles_and_metadata() {
    assert_eq!(detect(SED_SAMPLE.as_bytes()), Some(FileFormat::SpectralEvolution));

    let parsed = parse_file(SED_SAMPLE.as_bytes(), None).unwrap();
    assert_eq!(parsed.profile_names(), vec!["Reference", "Target", "Reflectance"]);
    assert_eq!(parsed.primary().unwrap().name, "Reflectance");

    let reflectance = parsed.profile("Reflectance").unwrap();
    assert_eq!(reflectance.values(), &[37.50, 37.70, 38.40]);
    assert_eq!(reflectance.value_unit(), Some("%"));
    assert_eq!(reflectance.wavelength_unit(), WavelengthUnit::Nanometers);

    let target = parsed.profile("Target").unwrap();
    assert_eq!(target.values(), &[4.5e-2, 4.6e-2, 4.8e-2]);
    assert_eq!(target.value_unit(), Some("W/m^2/sr/nm"));

    let meta = &parsed.metadata;
    assert_eq!(meta["Date_R"], MetadataValue::from("2018-04-27"));
    assert_eq!(meta["Date_T"], MetadataValue::from("2018-04-28"));
    assert_eq!(meta["Temperature_R"], MetadataValue::Number(31.4));
    assert_eq!(meta["Temperature_T"], MetadataValue::Number(30.9));
    assert_eq!(meta["Integration_R"], MetadataValue::Integer(15));
    assert_eq!(meta["Integration_T"], MetadataValue::Integer(25));
    assert_eq!(meta["ForeOptic_T"], MetadataValue::from("LENS4 {DN}"));
    assert_eq!(meta["Channels"], MetadataValue::Integer(3));
    assert_eq!(meta["Latitude"], MetadataValue::Number(52.4321));
    assert!(!meta.contains_key("Comment"));
}

#[test]
fn test_sed_newer_version_rejected() {
    let text = SED_SAMPLE.replace("Version: 2.3 [1.2.6]", "Version: 3.0");
    let err = parse(text.as_bytes(), None).unwrap_err();
    assert!(matches!(
        err,
        CodecError::UnsupportedVersion {
            format: FileFormat::SpectralEvolution,
            ..
        }
    ));
}

#[test]
fn test_sed_bad_number() {
    let text = SED_SAMPLE.replace("351.0\t1.22e-01", "351.0\tx.yz");
    let err = parse(text.as_bytes(), None).unwrap_err();
    match err {
        CodecError::MalformedFile { reason, .. } => assert!(reason.contains("x.yz")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unknown_format() {
    let err = parse(b"\x00\x01\x02 not a spectrum", None).unwrap_err();
    assert!(matches!(err, CodecError::UnknownFormat));
    assert_eq!(detect(b"just some text\nwithout structure"), None);
    assert!("xyz".parse::<FileFormat>().is_err());
}

#[test]
fn test_format_from_extension() {
    assert_eq!(FileFormat::from_extension("ASD"), Some(FileFormat::AsdBinary));
    assert_eq!(FileFormat::from_extension("001"), Some(FileFormat::AsdBinary));
    assert_eq!(FileFormat::from_extension("sed"), Some(FileFormat::SpectralEvolution));
    assert_eq!(FileFormat::from_extension("tsv"), Some(FileFormat::DelimitedTable));
    assert_eq!(FileFormat::from_extension("parquet"), None);
    assert_eq!("sed".parse::<FileFormat>().unwrap(), FileFormat::SpectralEvolution);
}

#[test]
fn test_parse_path_uses_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("leaf.csv");
    std::fs::write(&path, "wl;a\n500;0.3\n600;0.4\n").unwrap();

    let parsed = Codec::new().parse_path(&path, None).unwrap();
    assert_eq!(parsed.name.as_deref(), Some("leaf.csv"));
    assert_eq!(parsed.profile_names(), vec!["a"]);
}
