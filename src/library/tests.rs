use arrow::array::{Array, AsArray};
use tempfile::tempdir;

use super::*;
use crate::codec::parse_file;
use crate::profile::{decode_profile, SpectralProfile, SpectralProfileBuilder};
use crate::schema::is_profile_field;

fn two_column_file() -> ParsedFile {
    let mut parsed =
        parse_file(b"wavelength;leaf;bark\n400;0.1;0.3\n500;0.2;0.4\n", None).unwrap();
    parsed.name = Some("trees.csv".to_string());
    parsed
}

fn one_column_file() -> ParsedFile {
    let mut parsed = parse_file(b"wavelength,soil\n1.5,0.25\n2.0,0.3\n", None).unwrap();
    parsed.name = Some("soil.csv".to_string());
    parsed
}

fn flat(value: f64) -> SpectralProfile {
    SpectralProfileBuilder::new(vec![value; 2])
        .wavelengths(vec![400.0, 500.0])
        .build()
        .unwrap()
}

fn named(name: &str, value: f64) -> NamedProfile {
    NamedProfile {
        name: name.to_string(),
        profile: flat(value),
    }
}

#[test]
fn test_builder_columns_and_nulls() {
    let mut builder = LibraryBuilder::new();
    assert!(builder.is_empty());
    builder
        .add_profiles(
            Some("a.asd"),
            "asd",
            &[named("Spectrum", 0.1), named("Reference", 0.9)],
        )
        .unwrap();
    builder
        .add_profiles(Some("b.sed"), "sed", &[named("Reflectance", 0.5)])
        .unwrap();
    assert_eq!(builder.len(), 2);

    let batch = builder.finish().unwrap();
    let schema = batch.schema();
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    assert_eq!(
        names,
        vec!["name", "source_format", "Spectrum", "Reference", "Reflectance"]
    );
    assert!(schema.fields()[2..].iter().all(|f| is_profile_field(f)));
    assert!(!is_profile_field(schema.field(0)));

    let file_names = batch.column(0).as_string::<i32>();
    assert_eq!(file_names.value(0), "a.asd");
    assert_eq!(batch.column(1).as_string::<i32>().value(1), "sed");

    let spectrum = batch.column(2).as_binary::<i32>();
    assert!(spectrum.is_valid(0));
    assert!(spectrum.is_null(1));
    let reflectance = batch.column(4).as_binary::<i32>();
    assert!(reflectance.is_null(0));
    let profile = decode_profile(reflectance.value(1)).unwrap();
    assert_eq!(profile.values(), &[0.5, 0.5]);
}

#[test]
fn test_delimited_columns_become_rows() {
    let mut builder = LibraryBuilder::new();
    builder.add_file(&two_column_file()).unwrap();
    builder.add_file(&one_column_file()).unwrap();
    assert_eq!(builder.len(), 3);

    let batch = builder.finish().unwrap();
    let schema = batch.schema();
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    assert_eq!(names, vec!["name", "source_format", DELIMITED_PROFILE_COLUMN]);

    let row_names: Vec<Option<&str>> = batch.column(0).as_string::<i32>().iter().collect();
    assert_eq!(row_names, vec![Some("leaf"), Some("bark"), Some("soil")]);
    let formats: Vec<Option<&str>> = batch.column(1).as_string::<i32>().iter().collect();
    assert_eq!(formats, vec![Some("csv"); 3]);

    let spectra = batch.column(2).as_binary::<i32>();
    assert_eq!(spectra.null_count(), 0);
    let bark = decode_profile(spectra.value(1)).unwrap();
    assert_eq!(bark.values(), &[0.3, 0.4]);
    assert_eq!(bark.wavelengths(), Some(&[400.0, 500.0][..]));
    let soil = decode_profile(spectra.value(2)).unwrap();
    assert_eq!(soil.values(), &[0.25, 0.3]);
}

#[test]
fn test_delimited_and_instrument_rows_share_column() {
    let mut builder = LibraryBuilder::new();
    builder
        .add_profiles(Some("a.asd"), "asd", &[named("Spectrum", 0.1)])
        .unwrap();
    builder.add_file(&two_column_file()).unwrap();

    let batch = builder.finish().unwrap();
    assert_eq!(batch.num_rows(), 3);
    assert_eq!(batch.num_columns(), 3);
    assert_eq!(batch.column(2).null_count(), 0);
}

#[test]
fn test_reserved_profile_name() {
    let profile = SpectralProfileBuilder::new(vec![1.0]).build().unwrap();
    let mut builder = LibraryBuilder::new();
    let err = builder
        .add_profiles(
            Some("x"),
            "csv",
            &[NamedProfile {
                name: "name".to_string(),
                profile,
            }],
        )
        .unwrap_err();
    assert!(matches!(err, LibraryError::ReservedName(n) if n == "name"));
    assert!(builder.is_empty());
}

#[test]
fn test_parquet_roundtrip() {
    let dir = tempdir().unwrap();
    let mut builder = LibraryBuilder::new();
    builder.add_file(&two_column_file()).unwrap();
    builder.add_file(&one_column_file()).unwrap();
    let batch = builder.finish().unwrap();

    for (i, compression) in [
        CompressionType::default(),
        CompressionType::Snappy,
        CompressionType::Uncompressed,
    ]
    .into_iter()
    .enumerate()
    {
        let path = dir.path().join(format!("library_{i}.parquet"));
        write_parquet(&path, &batch, compression).unwrap();

        let stored = read_parquet(&path).unwrap();
        assert_eq!(stored.format_version(), Some(SPECLIB_FORMAT_VERSION));
        assert!(!stored.metadata.contains_key("ARROW:schema"));
        assert_eq!(stored.batch.num_rows(), 3);
        assert_eq!(stored.batch.num_columns(), 3);

        let schema = stored.batch.schema();
        let spectra = schema.field_with_name(DELIMITED_PROFILE_COLUMN).unwrap();
        assert!(is_profile_field(spectra));

        let column = stored.batch.column(2).as_binary::<i32>();
        let profile = decode_profile(column.value(1)).unwrap();
        assert_eq!(profile.values(), &[0.3, 0.4]);
        assert_eq!(profile.wavelengths(), Some(&[400.0, 500.0][..]));
    }
}

#[test]
fn test_compression_names() {
    assert_eq!("zstd".parse::<CompressionType>().unwrap(), CompressionType::Zstd(3));
    assert_eq!("Snappy".parse::<CompressionType>().unwrap(), CompressionType::Snappy);
    assert_eq!("none".parse::<CompressionType>().unwrap(), CompressionType::Uncompressed);
    assert!(matches!(
        "lz4".parse::<CompressionType>(),
        Err(LibraryError::UnknownCompression(_))
    ));
}

#[test]
fn test_empty_library() {
    let batch = LibraryBuilder::new().finish().unwrap();
    assert_eq!(batch.num_rows(), 0);
    assert_eq!(batch.num_columns(), 2);
    assert_eq!(
        batch.schema().metadata().get(FORMAT_VERSION_KEY).map(String::as_str),
        Some(SPECLIB_FORMAT_VERSION)
    );
}

#[test]
fn test_read_missing_file() {
    let dir = tempdir().unwrap();
    let err = read_parquet(dir.path().join("missing.parquet")).unwrap_err();
    assert!(matches!(err, LibraryError::IoError(_)));
}
