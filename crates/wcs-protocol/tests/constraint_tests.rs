//! End-to-end tests for constraint-expression compilation.

use test_utils::fixtures::{coverage, requests};
use wcs_common::WcsError;
use wcs_protocol::{
    ConstraintCompiler, CoverageDescription, DimensionSubset, DomainCoordinate, Field,
    GetCoverageRequest, ScaleMode, ScaleRequest, SubsetMap,
};

fn sst_coverage(fields: Vec<Field>) -> CoverageDescription {
    let coords: Vec<DomainCoordinate> =
        serde_yaml::from_str(coverage::DOMAIN_COORDINATES_YAML).unwrap();
    CoverageDescription::new(coverage::COVERAGE_ID, coords, fields, "netcdf").unwrap()
}

fn temp_only() -> CoverageDescription {
    sst_coverage(vec![Field::new(coverage::FIELD.0, coverage::FIELD.1)])
}

fn subsets(list: Vec<DimensionSubset>) -> SubsetMap {
    list.into_iter()
        .map(|s| (s.dimension_id().to_string(), s))
        .collect()
}

// ============================================================================
// Reference scenarios
// ============================================================================

#[test]
fn test_value_trim_uses_grid() {
    let cov = temp_only();
    let subs = subsets(vec![DimensionSubset::value_trim("latitude", "-10", "10").unwrap()]);

    let ce = ConstraintCompiler::new(&cov)
        .compile_unencoded(&[], &subs, None)
        .unwrap();
    assert_eq!(ce, r#"grid(T,"-10<=latitude<=10")"#);
}

#[test]
fn test_array_slice_in_storage_order() {
    let cov = temp_only();
    let subs = subsets(vec![DimensionSubset::slice("time", "5").unwrap()]);

    let ce = ConstraintCompiler::new(&cov)
        .compile_unencoded(&[], &subs, None)
        .unwrap();
    assert_eq!(ce, "T[5][*][*]");
}

#[test]
fn test_uniform_scale_factor() {
    let cov = temp_only();
    let scale = ScaleRequest {
        mode: Some(ScaleMode::Factor(0.5)),
        ..Default::default()
    };

    let ce = ConstraintCompiler::new(&cov)
        .compile_unencoded(&[], &SubsetMap::new(), Some(&scale))
        .unwrap();
    assert_eq!(ce, "scale_grid(T,90,180)");
}

#[test]
fn test_mixed_trim_bounds_rejected() {
    let doc = r#"<wcs:DimensionTrim xmlns:wcs="http://www.opengis.net/wcs/2.0">
        <wcs:Dimension>latitude</wcs:Dimension>
        <wcs:TrimLow>*</wcs:TrimLow>
        <wcs:TrimHigh>5.5</wcs:TrimHigh>
    </wcs:DimensionTrim>"#;
    let element = wcs_common::XmlElement::parse(doc).unwrap();

    assert!(matches!(
        DimensionSubset::from_xml(&element),
        Err(WcsError::InvalidParameterValue { .. })
    ));
}

// ============================================================================
// Ordering and combination
// ============================================================================

#[test]
fn test_array_clauses_follow_storage_not_request_order() {
    let cov = temp_only();
    let subs = subsets(vec![
        DimensionSubset::from_kvp("longitude(10,20)").unwrap(),
        DimensionSubset::from_kvp("time(0,3)").unwrap(),
    ]);

    let ce = ConstraintCompiler::new(&cov)
        .compile_unencoded(&[], &subs, None)
        .unwrap();
    assert_eq!(ce, "T[0:1:3][*][10:1:20]");
}

#[test]
fn test_array_and_value_subsets_combine() {
    let cov = temp_only();
    let subs = subsets(vec![
        DimensionSubset::from_kvp("time(2)").unwrap(),
        DimensionSubset::from_kvp("latitude(-10.5,10.5)").unwrap(),
    ]);

    let ce = ConstraintCompiler::new(&cov)
        .compile_unencoded(&[], &subs, None)
        .unwrap();
    assert_eq!(ce, r#"grid(T[2][*][*],"-10.5<=latitude<=10.5")"#);
}

#[test]
fn test_value_constraints_in_storage_order() {
    let cov = temp_only();
    let subs = subsets(vec![
        DimensionSubset::from_kvp("longitude(0.5,1.5)").unwrap(),
        DimensionSubset::from_kvp("latitude(2.5)").unwrap(),
    ]);

    let ce = ConstraintCompiler::new(&cov)
        .compile_unencoded(&[], &subs, None)
        .unwrap();
    assert_eq!(ce, r#"grid(T,"latitude=2.5","0.5<=longitude<=1.5")"#);
}

#[test]
fn test_value_constraint_uses_backend_variable() {
    let coords = vec![
        DomainCoordinate::new("latitude", "lat", "degrees_north", 180, None),
        DomainCoordinate::new("longitude", "lon", "degrees_east", 360, None),
    ];
    let cov = CoverageDescription::new("c", coords, vec![Field::new("sst", "analysed_sst")], "netcdf").unwrap();
    let subs = subsets(vec![DimensionSubset::from_kvp("latitude(1.5,2.5)").unwrap()]);

    let ce = ConstraintCompiler::new(&cov)
        .compile_unencoded(&[], &subs, None)
        .unwrap();
    assert_eq!(ce, r#"grid(analysed_sst,"1.5<=lat<=2.5")"#);
}

#[test]
fn test_all_fields_by_default_in_coverage_order() {
    let cov = sst_coverage(vec![Field::new("temp", "T"), Field::new("mask", "M")]);

    let ce = ConstraintCompiler::new(&cov)
        .compile_unencoded(&[], &SubsetMap::new(), None)
        .unwrap();
    assert_eq!(ce, "T,M");
}

#[test]
fn test_requested_fields_in_request_order() {
    let cov = sst_coverage(vec![Field::new("temp", "T"), Field::new("mask", "M")]);
    let subs = subsets(vec![DimensionSubset::slice("time", "0").unwrap()]);

    let ce = ConstraintCompiler::new(&cov)
        .compile_unencoded(&["mask".to_string(), "temp".to_string()], &subs, None)
        .unwrap();
    assert_eq!(ce, "M[0][*][*],T[0][*][*]");
}

#[test]
fn test_wildcard_trim() {
    let cov = temp_only();
    let subs = subsets(vec![DimensionSubset::trim("latitude", "*", "*").unwrap()]);

    let ce = ConstraintCompiler::new(&cov)
        .compile_unencoded(&[], &subs, None)
        .unwrap();
    assert_eq!(ce, "T[*][*][*]");
}

// ============================================================================
// Temporal subsets
// ============================================================================

#[test]
fn test_time_positions_converted_to_units() {
    let cov = temp_only();
    let subs = subsets(vec![DimensionSubset::from_kvp(
        "time(\"1900-01-02T00:00:00Z\",\"1900-01-03\")",
    )
    .unwrap()]);

    let ce = ConstraintCompiler::new(&cov)
        .compile_unencoded(&[], &subs, None)
        .unwrap();
    assert_eq!(ce, r#"grid(T,"24<=time<=48")"#);
}

#[test]
fn test_bad_time_position_fails_whole_compile() {
    let cov = temp_only();
    let subs = subsets(vec![DimensionSubset::from_kvp("time(\"whenever\")").unwrap()]);

    assert!(ConstraintCompiler::new(&cov)
        .compile(&[], &subs, None)
        .is_err());
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_unknown_dimension_lists_valid_names() {
    let cov = temp_only();
    let subs = subsets(vec![DimensionSubset::from_kvp("depth(0,10)").unwrap()]);

    match ConstraintCompiler::new(&cov).compile(&[], &subs, None) {
        Err(WcsError::InvalidParameterValue { message, .. }) => {
            assert!(message.contains("'depth'"));
            assert!(message.contains("time, latitude, longitude"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_unknown_field() {
    let cov = temp_only();
    assert!(matches!(
        ConstraintCompiler::new(&cov).compile(&["salinity".to_string()], &SubsetMap::new(), None),
        Err(WcsError::InvalidParameterValue { .. })
    ));
}

#[test]
fn test_scale_needs_two_coordinates() {
    let coords = vec![DomainCoordinate::new("time", "time", "", 10, None)];
    let cov = CoverageDescription::new("c", coords, vec![Field::new("a", "A")], "netcdf").unwrap();
    let scale = ScaleRequest {
        mode: Some(ScaleMode::Factor(2.0)),
        ..Default::default()
    };

    assert!(matches!(
        ConstraintCompiler::new(&cov).compile(&[], &SubsetMap::new(), Some(&scale)),
        Err(WcsError::Internal(_))
    ));
}

// ============================================================================
// Whole requests
// ============================================================================

#[test]
fn test_compile_is_idempotent() {
    let cov = temp_only();
    let req = GetCoverageRequest::from_query(requests::KVP_LAT_TRIM).unwrap();
    let compiler = ConstraintCompiler::new(&cov);

    let first = compiler
        .compile(&req.requested_fields, &req.dimension_subsets, Some(&req.scale))
        .unwrap();
    let second = compiler
        .compile(&req.requested_fields, &req.dimension_subsets, Some(&req.scale))
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_kvp_request_encoded() {
    let cov = temp_only();
    let req = GetCoverageRequest::from_query(requests::KVP_LAT_TRIM).unwrap();

    let ce = ConstraintCompiler::new(&cov)
        .compile(&req.requested_fields, &req.dimension_subsets, Some(&req.scale))
        .unwrap();
    assert_eq!(ce, "grid%28T%2C%22-10.5%3C%3Dlatitude%3C%3D10.5%22%29");
}

#[test]
fn test_xml_request_with_time_and_scale() {
    let cov = temp_only();
    let req = GetCoverageRequest::from_xml_str(requests::XML_TRIM_SLICE_SCALE).unwrap();

    let ce = ConstraintCompiler::new(&cov)
        .compile_unencoded(&req.requested_fields, &req.dimension_subsets, Some(&req.scale))
        .unwrap();
    assert_eq!(
        ce,
        r#"scale_grid(grid(T,"time=24","-10.5<=latitude<=10.5"),90,180)"#
    );
}
