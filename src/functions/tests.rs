use std::io::Write;

use super::*;
use crate::mapper::{ArrayData, RasterArray};
use crate::profile::{decode_profile, encode_profile, SpectralProfileBuilder, WavelengthUnit};

const NODATA: f64 = -9999.0;

/// 3 bands, 4 x 4 cells of 1 x 1 map units, upper-left corner at (0, 4).
///
/// Band `b` of cell (`line`, `sample`) holds `100 b + 10 line + sample`; the
/// upper-left cell is no-data in every band.
fn test_layer() -> RasterLayer {
    let (bands, lines, samples) = (3, 4, 4);
    let mut data = Vec::with_capacity(bands * lines * samples);
    for b in 0..bands {
        for line in 0..lines {
            for sample in 0..samples {
                if line == 0 && sample == 0 {
                    data.push(NODATA);
                } else {
                    data.push((100 * b + 10 * line + sample) as f64);
                }
            }
        }
    }
    let array = RasterArray::new(bands, lines, samples, ArrayData::Float64(data))
        .unwrap()
        .with_no_data(NODATA);
    RasterLayer::new("image", array, GeoTransform::new(0.0, 4.0, 1.0, -1.0))
        .unwrap()
        .with_wavelengths(vec![450.0, 550.0, 650.0], WavelengthUnit::Nanometers)
        .unwrap()
        .with_bad_bands(vec![false, false, true])
        .unwrap()
}

fn doubles(values: &[f64]) -> ExprValue {
    ExprValue::Array(values.iter().map(|v| ExprValue::Double(*v)).collect())
}

fn registry() -> LayerRegistry {
    let mut layers = LayerRegistry::new();
    layers.insert(test_layer());
    layers
}

fn geometry(wkt: &str) -> geo::Geometry<f64> {
    parse_geometry(wkt).unwrap()
}

fn single(result: PixelProfiles) -> (Vec<f64>, Vec<(usize, usize)>) {
    match result {
        PixelProfiles::Single { profile, cells } => (profile.values().to_vec(), cells),
        other => panic!("expected a single profile, got {other:?}"),
    }
}

#[test]
fn test_point_cell() {
    let layer = test_layer();
    let (values, cells) = single(
        profile_at(&layer, &geometry("POINT (1.5 2.5)"), Aggregate::Mean, false).unwrap(),
    );
    assert_eq!(cells, vec![(1, 1)]);
    assert_eq!(values, vec![11.0, 111.0, 211.0]);
}

#[test]
fn test_point_with_none_aggregate_stays_single() {
    let layer = test_layer();
    let (values, _) = single(
        profile_at(&layer, &geometry("POINT (3.5 0.5)"), Aggregate::None, false).unwrap(),
    );
    assert_eq!(values, vec![33.0, 133.0, 233.0]);
}

#[test]
fn test_no_pixels() {
    let layer = test_layer();
    let outside = profile_at(&layer, &geometry("POINT (10 10)"), Aggregate::Mean, false);
    assert!(matches!(outside, Err(FunctionError::NoPixels)));

    let no_data = profile_at(&layer, &geometry("POINT (0.5 3.5)"), Aggregate::Mean, false);
    assert!(matches!(no_data, Err(FunctionError::NoPixels)));
}

#[test]
fn test_polygon_centers_and_all_touched() {
    let layer = test_layer();
    let polygon = geometry("POLYGON ((0.6 0.6, 2.4 0.6, 2.4 2.4, 0.6 2.4, 0.6 0.6))");

    assert_eq!(geometry_cells(&layer, &polygon, false), vec![(2, 1)]);

    let touched = geometry_cells(&layer, &polygon, true);
    let expected: Vec<(usize, usize)> = (1..=3)
        .flat_map(|line| (0..=2).map(move |sample| (line, sample)))
        .collect();
    assert_eq!(touched, expected);

    match profile_at(&layer, &polygon, Aggregate::None, true).unwrap() {
        PixelProfiles::PerCell(cells) => {
            assert_eq!(cells.len(), 9);
            assert_eq!((cells[0].line, cells[0].sample), (1, 0));
            assert_eq!(cells[0].profile.values(), &[10.0, 110.0, 210.0]);
        }
        other => panic!("expected per-cell profiles, got {other:?}"),
    }
}

#[test]
fn test_polygon_hole_is_excluded() {
    let layer = test_layer();
    let polygon = geometry(
        "POLYGON ((0 0, 4 0, 4 4, 0 4, 0 0), (1 1, 3 1, 3 3, 1 3, 1 1))",
    );
    let cells = geometry_cells(&layer, &polygon, false);
    assert_eq!(cells.len(), 12);
    assert!(!cells.contains(&(1, 1)));
    assert!(!cells.contains(&(2, 2)));

    // the no-data cell (0, 0) is dropped as well
    let result = profile_at(&layer, &polygon, Aggregate::None, false).unwrap();
    assert_eq!(result.profiles().len(), 11);
}

#[test]
fn test_line_cells() {
    let layer = test_layer();
    let horizontal = geometry("LINESTRING (0.5 0.5, 3.5 0.5)");
    let expected = vec![(3, 0), (3, 1), (3, 2), (3, 3)];
    assert_eq!(geometry_cells(&layer, &horizontal, false), expected);
    assert_eq!(geometry_cells(&layer, &horizontal, true), expected);

    let diagonal = geometry("LINESTRING (0.2 0.2, 3.8 3.8)");
    let sampled = geometry_cells(&layer, &diagonal, false);
    assert_eq!(sampled, vec![(0, 3), (1, 2), (2, 1), (3, 0)]);

    let touched = geometry_cells(&layer, &diagonal, true);
    assert_eq!(touched.len(), 7);
    assert!(sampled.iter().all(|c| touched.contains(c)));
}

#[test]
fn test_line_clipped_to_raster() {
    let layer = test_layer();
    let line = geometry("LINESTRING (-2 1.5, 6 1.5)");
    let cells = geometry_cells(&layer, &line, true);
    assert_eq!(cells, vec![(2, 0), (2, 1), (2, 2), (2, 3)]);
}

#[test]
fn test_far_segments_are_clipped() {
    let layer = test_layer();

    let along = geometry("LINESTRING (0 0, 100000000000 0)");
    assert!(geometry_cells(&layer, &along, false).is_empty());
    assert!(geometry_cells(&layer, &along, true).is_empty());

    let across = geometry("LINESTRING (-100000000000 2.5, 100000000000 2.5)");
    let expected = vec![(1, 0), (1, 1), (1, 2), (1, 3)];
    assert_eq!(geometry_cells(&layer, &across, false), expected);
    assert_eq!(geometry_cells(&layer, &across, true), expected);

    let away = geometry("LINESTRING (1000000 1000000, 2000000000 -3000000000)");
    assert!(geometry_cells(&layer, &away, true).is_empty());

    let huge = geometry(
        "POLYGON ((-1e11 -1e11, 1e11 -1e11, 1e11 1e11, -1e11 1e11, -1e11 -1e11))",
    );
    assert_eq!(geometry_cells(&layer, &huge, true).len(), 16);
}

#[test]
fn test_aggregates() {
    let pixels = vec![
        vec![1.0, f64::NAN, f64::NAN],
        vec![3.0, f64::NAN, 4.0],
        vec![2.0, 5.0, 8.0],
        vec![6.0, f64::NAN, f64::NAN],
    ];
    assert_eq!(Aggregate::Mean.reduce(&pixels, 2), Some(vec![3.0, 5.0]));
    assert_eq!(Aggregate::Median.reduce(&pixels, 2), Some(vec![2.5, 5.0]));
    assert_eq!(Aggregate::Min.reduce(&pixels, 2), Some(vec![1.0, 5.0]));
    assert_eq!(Aggregate::Max.reduce(&pixels, 2), Some(vec![6.0, 5.0]));
    assert_eq!(Aggregate::Median.reduce(&pixels[1..], 3).unwrap()[2], 6.0);
    assert_eq!(Aggregate::None.reduce(&pixels, 2), None);

    let empty_band = Aggregate::Mean.reduce(&[vec![f64::NAN]], 1).unwrap();
    assert!(empty_band[0].is_nan());
}

#[test]
fn test_aggregate_names() {
    assert_eq!("MEDIAN".parse::<Aggregate>().unwrap(), Aggregate::Median);
    assert_eq!(Aggregate::default(), Aggregate::Mean);
    assert!(matches!(
        "average".parse::<Aggregate>(),
        Err(FunctionError::UnknownAggregate(a)) if a == "average"
    ));
}

#[test]
fn test_raster_profile_map() {
    let layers = registry();
    let ctx = EvalContext::new(&layers);
    let value = RasterProfileFunction
        .call(
            &[
                ExprValue::from("image"),
                ExprValue::from("POLYGON ((0.6 0.6, 2.4 0.6, 2.4 2.4, 0.6 2.4, 0.6 0.6))"),
                ExprValue::from("max"),
                ExprValue::Int(1),
            ],
            &ctx,
        )
        .unwrap();

    assert_eq!(
        value.get("y"),
        Some(&doubles(&[32.0, 132.0, 232.0]))
    );
    assert_eq!(value.get("xUnit"), Some(&ExprValue::from("nm")));
    assert_eq!(
        value.get("bbl"),
        Some(&ExprValue::Array(vec![ExprValue::Int(1), ExprValue::Int(1), ExprValue::Int(0)]))
    );
}

#[test]
fn test_raster_profile_uses_context_geometry() {
    let layers = registry();
    let point = geometry("POINT (2.5 1.5)");
    let ctx = EvalContext::new(&layers).with_geometry(&point);

    let value = RasterProfileFunction
        .call(
            &[
                ExprValue::from("image"),
                ExprValue::Null,
                ExprValue::Null,
                ExprValue::Null,
                ExprValue::from("bytes"),
            ],
            &ctx,
        )
        .unwrap();
    let ExprValue::Bytes(bytes) = value else {
        panic!("expected bytes, got {value:?}");
    };
    let profile = decode_profile(&bytes).unwrap();
    assert_eq!(profile.values(), &[22.0, 122.0, 222.0]);
    assert_eq!(profile.wavelengths(), Some(&[450.0, 550.0, 650.0][..]));
    assert_eq!(profile.bad_bands(), Some(&[false, false, true][..]));

    let no_geometry = EvalContext::new(&layers);
    let err = RasterProfileFunction
        .call(&[ExprValue::from("image")], &no_geometry)
        .unwrap_err();
    assert!(matches!(err, FunctionError::MissingGeometry));
}

#[test]
fn test_raster_profile_per_cell_text() {
    let layers = registry();
    let ctx = EvalContext::new(&layers);
    let value = RasterProfileFunction
        .call(
            &[
                ExprValue::from("image"),
                ExprValue::from("LINESTRING (0.5 0.5, 3.5 0.5)"),
                ExprValue::from("none"),
                ExprValue::Bool(false),
                ExprValue::from("text"),
            ],
            &ctx,
        )
        .unwrap();

    let ExprValue::Array(items) = value else {
        panic!("expected an array, got {value:?}");
    };
    assert_eq!(items.len(), 4);
    let first = decode_profile(items[0].as_str().unwrap().as_bytes()).unwrap();
    assert_eq!(first.values(), &[30.0, 130.0, 230.0]);
}

#[test]
fn test_raster_array_band_values() {
    let layers = registry();
    let ctx = EvalContext::new(&layers);
    let line = ExprValue::from("LINESTRING (0.5 0.5, 3.5 0.5)");

    let by_band = RasterArrayFunction
        .call(
            &[ExprValue::from("image"), line.clone(), ExprValue::from("none")],
            &ctx,
        )
        .unwrap();
    assert_eq!(
        by_band,
        ExprValue::Array(vec![
            doubles(&[30.0, 31.0, 32.0, 33.0]),
            doubles(&[130.0, 131.0, 132.0, 133.0]),
            doubles(&[230.0, 231.0, 232.0, 233.0]),
        ])
    );

    let by_cell = RasterArrayFunction
        .call(
            &[
                ExprValue::from("image"),
                line,
                ExprValue::from("none"),
                ExprValue::Bool(true),
            ],
            &ctx,
        )
        .unwrap();
    let ExprValue::Array(cells) = by_cell else {
        panic!("expected an array, got {by_cell:?}");
    };
    assert_eq!(cells.len(), 4);
    assert_eq!(cells[0], doubles(&[30.0, 130.0, 230.0]));
    assert_eq!(cells[3], doubles(&[33.0, 133.0, 233.0]));

    // Points and aggregates give one value per band, `t` or not
    let point = geometry("POINT (2.5 1.5)");
    let point_ctx = EvalContext::new(&layers).with_geometry(&point);
    for transpose in [false, true] {
        let value = RasterArrayFunction
            .call(
                &[
                    ExprValue::from("image"),
                    ExprValue::Null,
                    ExprValue::from("none"),
                    ExprValue::Bool(transpose),
                ],
                &point_ctx,
            )
            .unwrap();
        assert_eq!(value, doubles(&[22.0, 122.0, 222.0]));
    }

    let max = RasterArrayFunction
        .call(
            &[
                ExprValue::from("image"),
                ExprValue::from("POLYGON ((0.6 0.6, 2.4 0.6, 2.4 2.4, 0.6 2.4, 0.6 0.6))"),
                ExprValue::from("max"),
                ExprValue::Bool(false),
                ExprValue::Bool(true),
            ],
            &ctx,
        )
        .unwrap();
    assert_eq!(max, doubles(&[32.0, 132.0, 232.0]));

    let err = RasterArrayFunction
        .call(
            &[
                ExprValue::from("image"),
                ExprValue::from("POINT (1.5 1.5)"),
                ExprValue::Null,
                ExprValue::from("sideways"),
            ],
            &ctx,
        )
        .unwrap_err();
    assert!(matches!(err, FunctionError::InvalidArgument { parameter: "t", .. }));
}

#[test]
fn test_raster_profile_argument_errors() {
    let layers = registry();
    let ctx = EvalContext::new(&layers);
    let point = ExprValue::from("POINT (1.5 1.5)");

    let err = RasterProfileFunction
        .call(&[ExprValue::from("missing"), point.clone()], &ctx)
        .unwrap_err();
    assert!(matches!(err, FunctionError::LayerNotFound(ref l) if l == "missing"));

    let err = RasterProfileFunction
        .call(
            &[ExprValue::from("image"), point.clone(), ExprValue::from("sum")],
            &ctx,
        )
        .unwrap_err();
    assert!(matches!(err, FunctionError::UnknownAggregate(_)));

    let err = RasterProfileFunction
        .call(
            &[
                ExprValue::from("image"),
                point.clone(),
                ExprValue::Null,
                ExprValue::Null,
                ExprValue::from("xml"),
            ],
            &ctx,
        )
        .unwrap_err();
    assert!(matches!(err, FunctionError::UnknownEncoding(_)));

    let err = RasterProfileFunction
        .call(&[ExprValue::from("image"), ExprValue::from("POINT (1")], &ctx)
        .unwrap_err();
    assert!(matches!(err, FunctionError::InvalidGeometry(_)));

    let err = RasterProfileFunction.call(&[], &ctx).unwrap_err();
    assert!(matches!(
        err,
        FunctionError::MissingArgument { parameter: "layer", .. }
    ));

    let too_many = vec![ExprValue::Null; 6];
    let err = RasterProfileFunction.call(&too_many, &ctx).unwrap_err();
    assert!(matches!(err, FunctionError::TooManyArguments { actual: 6, .. }));
}

#[test]
fn test_spectral_profile_reads_file() {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    file.write_all(b"wavelength,value\n350,0.10\n360,0.12\n").unwrap();
    let path = file.path().to_string_lossy().into_owned();

    let layers = LayerRegistry::new();
    let ctx = EvalContext::new(&layers);
    let value = SpectralProfileFunction
        .call(&[ExprValue::from(path.as_str())], &ctx)
        .unwrap();

    assert_eq!(value.get("format"), Some(&ExprValue::from("csv")));
    let profile = value.get("value").unwrap();
    assert_eq!(
        profile.get("y"),
        Some(&doubles(&[0.10, 0.12]))
    );
    assert_eq!(profile.get("xUnit"), Some(&ExprValue::from("nm")));

    let err = SpectralProfileFunction
        .call(&[ExprValue::from(path.as_str()), ExprValue::from("xyz")], &ctx)
        .unwrap_err();
    assert!(matches!(err, FunctionError::InvalidArgument { parameter: "type", .. }));

    let err = SpectralProfileFunction
        .call(&[ExprValue::from("/does/not/exist.csv")], &ctx)
        .unwrap_err();
    assert!(matches!(err, FunctionError::CodecError(_)));
}

#[test]
fn test_spectral_data_decodes_stored_values() {
    let profile = SpectralProfileBuilder::new(vec![0.1, 0.2])
        .wavelengths(vec![0.45, 0.5])
        .build()
        .unwrap();
    let bytes = encode_profile(&profile).unwrap();
    let layers = LayerRegistry::new();
    let ctx = EvalContext::new(&layers);

    let from_bytes = SpectralDataFunction
        .call(&[ExprValue::Bytes(bytes.clone())], &ctx)
        .unwrap();
    assert_eq!(from_bytes.get("xUnit"), Some(&ExprValue::from("μm")));

    let text = String::from_utf8(bytes).unwrap();
    let from_text = SpectralDataFunction
        .call(&[ExprValue::from(text.as_str())], &ctx)
        .unwrap();
    assert_eq!(from_text, from_bytes);

    let from_map = SpectralDataFunction.call(&[from_bytes.clone()], &ctx).unwrap();
    assert_eq!(from_map, from_bytes);

    assert_eq!(
        SpectralDataFunction.call(&[ExprValue::Null], &ctx).unwrap(),
        ExprValue::Null
    );
    assert!(SpectralDataFunction
        .call(&[ExprValue::from("not a profile")], &ctx)
        .is_err());
    assert!(SpectralDataFunction.call(&[ExprValue::Int(3)], &ctx).is_err());
}

#[test]
fn test_encode_profile_switches_encoding() {
    let profile = SpectralProfileBuilder::new(vec![0.1, 0.2])
        .wavelengths(vec![400.0, 500.0])
        .build()
        .unwrap();
    let bytes = encode_profile(&profile).unwrap();
    let layers = LayerRegistry::new();
    let ctx = EvalContext::new(&layers);

    let text = EncodeProfileFunction
        .call(&[ExprValue::Bytes(bytes.clone())], &ctx)
        .unwrap();
    let decoded = decode_profile(text.as_str().unwrap().as_bytes()).unwrap();
    assert_eq!(decoded.values(), profile.values());
    assert_eq!(decoded.wavelengths(), profile.wavelengths());

    let as_bytes = EncodeProfileFunction
        .call(&[text.clone(), ExprValue::from("bytes")], &ctx)
        .unwrap();
    assert_eq!(as_bytes, ExprValue::Bytes(bytes.clone()));

    let as_map = EncodeProfileFunction
        .call(&[as_bytes, ExprValue::from("map")], &ctx)
        .unwrap();
    assert_eq!(as_map, SpectralDataFunction.call(&[text], &ctx).unwrap());

    assert_eq!(
        EncodeProfileFunction.call(&[ExprValue::Null], &ctx).unwrap(),
        ExprValue::Null
    );
    let err = EncodeProfileFunction
        .call(&[ExprValue::Bytes(bytes), ExprValue::from("yaml")], &ctx)
        .unwrap_err();
    assert!(matches!(err, FunctionError::UnknownEncoding(ref e) if e == "yaml"));
}

#[test]
fn test_evaluate_rows_isolates_failures() {
    let layers = registry();
    let ctx = EvalContext::new(&layers);
    let rows = vec![
        RowInput::new(0, vec![ExprValue::from("image")]).with_geometry(geometry("POINT (1.5 1.5)")),
        RowInput::new(1, vec![ExprValue::from("image")]).with_geometry(geometry("POINT (50 50)")),
        RowInput::new(2, vec![ExprValue::from("image")]),
        RowInput::new(3, vec![ExprValue::from("image")]).with_geometry(geometry("POINT (3.5 3.5)")),
    ];

    let outcomes = evaluate_rows(&RasterProfileFunction, rows, &ctx);
    assert_eq!(outcomes.len(), 4);
    assert_eq!(
        outcomes.iter().map(RowOutcome::row).collect::<Vec<_>>(),
        vec![0, 1, 2, 3]
    );
    assert!(outcomes[0].is_ok());
    assert_eq!(outcomes[1].error(), Some("No pixels with data under the geometry"));
    assert_eq!(outcomes[1].value(), ExprValue::Null);
    assert_eq!(outcomes[2].error(), Some("Unable to find geometry"));
    assert_eq!(
        outcomes[3].value().get("y"),
        Some(&doubles(&[3.0, 103.0, 203.0]))
    );
}

#[test]
fn test_signatures() {
    let sigs = signatures();
    let names: Vec<&str> = sigs.iter().map(|s| s.name).collect();
    assert_eq!(
        names,
        vec![
            "raster_profile",
            "raster_array",
            "spectral_profile",
            "spectral_data",
            "encode_profile"
        ]
    );
    assert!(sigs.iter().all(|s| s.group == FUNCTION_GROUP));

    assert_eq!(
        sigs[0].to_string(),
        "raster_profile(layer, geometry=@geometry, aggregate='mean', at=false, encoding='map')"
    );
    assert!(sigs[0].uses_geometry);
    assert_eq!(
        sigs[1].to_string(),
        "raster_array(layer, geometry=@geometry, aggregate='mean', t=false, at=false)"
    );
    assert_eq!(sigs[1].returns, ReturnKind::Array);
    assert_eq!(sigs[2].parameters[1].name, "type");
    assert!(sigs[2].parameters[1].optional);
    assert_eq!(sigs[4].to_string(), "encode_profile(profile_field, encoding='text')");
    assert!(!sigs[4].uses_geometry);

    let functions = builtin_functions();
    for (function, signature) in functions.iter().zip(&sigs) {
        assert_eq!(function.signature(), *signature);
    }
}

#[test]
fn test_layer_validation() {
    let array = RasterArray::new(2, 1, 1, ArrayData::Float64(vec![1.0, 2.0])).unwrap();
    let layer = RasterLayer::new("a", array.clone(), GeoTransform::default()).unwrap();
    assert!(matches!(
        layer.with_wavelengths(vec![400.0], WavelengthUnit::Nanometers),
        Err(FunctionError::InvalidLayer { .. })
    ));
    assert!(matches!(
        RasterLayer::new("b", array, GeoTransform::new(0.0, 0.0, 0.0, -1.0)),
        Err(FunctionError::InvalidLayer { .. })
    ));
}

#[test]
fn test_band_no_data() {
    let array = RasterArray::new(2, 1, 1, ArrayData::Int32(vec![0, 7])).unwrap();
    let layer = RasterLayer::new("a", array, GeoTransform::default())
        .unwrap()
        .with_band_no_data(vec![Some(0.0), None])
        .unwrap();
    let pixel = layer.pixel(0, 0).unwrap();
    assert!(pixel[0].is_nan());
    assert_eq!(pixel[1], 7.0);
}
