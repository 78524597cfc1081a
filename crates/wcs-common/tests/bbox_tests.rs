//! Tests for BoundingBox algebra, parsing and rendering.

use chrono::{TimeZone, Utc};
use wcs_common::bbox::{BoundingBox, CoordinateDimension, TimePeriod};
use wcs_common::{WcsError, XmlElement};

fn lat_lon(lat: (f64, f64), lon: (f64, f64)) -> BoundingBox {
    BoundingBox::from_corners(&["lat", "lon"], &[lat.0, lon.0], &[lat.1, lon.1], None).unwrap()
}

fn period(start_day: u32, end_day: u32) -> TimePeriod {
    TimePeriod::new(
        Utc.with_ymd_and_hms(2020, 1, start_day, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2020, 1, end_day, 0, 0, 0).unwrap(),
    )
    .unwrap()
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_kvp_four_values_no_crs() {
    let bbox = BoundingBox::from_kvp("10,20,30,40").unwrap();
    assert_eq!(bbox.lower_corner(), vec![10.0, 20.0]);
    assert_eq!(bbox.upper_corner(), vec![30.0, 40.0]);
    assert!(bbox.crs().is_none());
    assert!(!bbox.has_time_period());
}

#[test]
fn test_kvp_trailing_crs() {
    let bbox = BoundingBox::from_kvp("1,2,3,4,5,6,http://www.opengis.net/def/crs/EPSG/0/4326").unwrap();
    assert_eq!(bbox.dimensions().len(), 3);
    assert_eq!(bbox.lower_corner(), vec![1.0, 2.0, 3.0]);
    assert_eq!(bbox.upper_corner(), vec![4.0, 5.0, 6.0]);
    assert_eq!(bbox.crs(), Some("http://www.opengis.net/def/crs/EPSG/0/4326"));
}

#[test]
fn test_kvp_odd_numeric_count_rejected() {
    let err = BoundingBox::from_kvp("10,20,30").unwrap_err();
    assert!(matches!(err, WcsError::InvalidParameterValue { .. }));
}

#[test]
fn test_kvp_bad_number_rejected() {
    let err = BoundingBox::from_kvp("10,abc,30,40").unwrap_err();
    assert!(matches!(err, WcsError::InvalidParameterValue { .. }));
}

#[test]
fn test_kvp_crs_only_rejected() {
    assert!(BoundingBox::from_kvp("EPSG:4326").is_err());
}

#[test]
fn test_kvp_relabel() {
    let bbox = BoundingBox::from_kvp("10,20,30,40")
        .unwrap()
        .with_axis_labels(&["lat", "lon"])
        .unwrap();
    assert_eq!(bbox.dimension("lon"), Some(&CoordinateDimension::new("lon", 20.0, 40.0)));
    assert!(BoundingBox::from_kvp("10,20,30,40")
        .unwrap()
        .with_axis_labels(&["lat"])
        .is_err());
}

#[test]
fn test_corner_length_mismatch() {
    assert!(BoundingBox::from_corners(&["lat", "lon"], &[0.0], &[1.0, 2.0], None).is_err());
}

#[test]
fn test_duplicate_axis_rejected() {
    assert!(BoundingBox::from_corners(&["lat", "lat"], &[0.0, 0.0], &[1.0, 1.0], None).is_err());
}

#[test]
fn test_reversed_time_period_rejected() {
    let start = Utc.with_ymd_and_hms(2020, 2, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    assert!(TimePeriod::new(start, end).is_err());
}

#[test]
fn test_envelope_with_time_period_xml() {
    let doc = r#"<gml:boundedBy xmlns:gml="http://www.opengis.net/gml/3.2">
        <gml:EnvelopeWithTimePeriod srsName="urn:ogc:def:crs:EPSG::4326" axisLabels="latitude longitude" srsDimension="2">
            <gml:lowerCorner>-90 -180</gml:lowerCorner>
            <gml:upperCorner>90 180</gml:upperCorner>
            <gml:beginPosition>2002-07-01T00:00:00Z</gml:beginPosition>
            <gml:endPosition>2002-07-31T00:00:00Z</gml:endPosition>
        </gml:EnvelopeWithTimePeriod>
    </gml:boundedBy>"#;
    let bbox = BoundingBox::from_envelope_xml(&XmlElement::parse(doc).unwrap()).unwrap();

    assert_eq!(bbox.axis_labels(), vec!["latitude", "longitude"]);
    assert_eq!(bbox.lower_corner(), vec![-90.0, -180.0]);
    assert_eq!(bbox.crs(), Some("urn:ogc:def:crs:EPSG::4326"));
    let tp = bbox.time_period().unwrap();
    assert_eq!(tp.start, Utc.with_ymd_and_hms(2002, 7, 1, 0, 0, 0).unwrap());
    assert_eq!(tp.end, Utc.with_ymd_and_hms(2002, 7, 31, 0, 0, 0).unwrap());
}

#[test]
fn test_envelope_corner_count_mismatch() {
    let doc = r#"<Envelope axisLabels="lat lon"><lowerCorner>0</lowerCorner><upperCorner>1 1</upperCorner></Envelope>"#;
    let err = BoundingBox::from_envelope_xml(&XmlElement::parse(doc).unwrap()).unwrap_err();
    assert!(matches!(err, WcsError::InvalidParameterValue { .. }));
}

#[test]
fn test_envelope_missing_labels() {
    let doc = r#"<Envelope><lowerCorner>0 0</lowerCorner><upperCorner>1 1</upperCorner></Envelope>"#;
    let err = BoundingBox::from_envelope_xml(&XmlElement::parse(doc).unwrap()).unwrap_err();
    assert!(matches!(err, WcsError::MissingParameter { .. }));
}

// ============================================================================
// Algebra
// ============================================================================

#[test]
fn test_self_intersection() {
    let a = lat_lon((-10.0, 10.0), (0.0, 20.0));
    assert!(a.intersects(&a).unwrap());
}

#[test]
fn test_degenerate_box_does_not_self_intersect() {
    let point = lat_lon((5.0, 5.0), (5.0, 5.0));
    assert!(!point.intersects(&point).unwrap());
}

#[test]
fn test_intersection_requires_every_axis() {
    let a = lat_lon((0.0, 10.0), (0.0, 10.0));
    let b = lat_lon((5.0, 15.0), (20.0, 30.0));
    assert!(!a.intersects(&b).unwrap());

    let c = lat_lon((5.0, 15.0), (5.0, 15.0));
    assert!(a.intersects(&c).unwrap());
}

#[test]
fn test_temporal_overlap() {
    let a = lat_lon((0.0, 10.0), (0.0, 10.0)).with_time_period(period(1, 10));
    let b = lat_lon((0.0, 10.0), (0.0, 10.0)).with_time_period(period(10, 20));
    let c = lat_lon((0.0, 10.0), (0.0, 10.0)).with_time_period(period(5, 20));

    assert!(!a.intersects(&b).unwrap());
    assert!(a.intersects(&c).unwrap());
}

#[test]
fn test_time_ignored_when_one_side_has_none() {
    let a = lat_lon((0.0, 10.0), (0.0, 10.0)).with_time_period(period(1, 10));
    let b = lat_lon((0.0, 10.0), (0.0, 10.0));
    assert!(a.intersects(&b).unwrap());
    assert!(a.contains(&b).unwrap());
}

#[test]
fn test_incompatible_crs() {
    let a = BoundingBox::from_corners(&["x", "y"], &[0.0, 0.0], &[1.0, 1.0], Some("EPSG:4326")).unwrap();
    let b = BoundingBox::from_corners(&["x", "y"], &[0.0, 0.0], &[1.0, 1.0], Some("EPSG:3857")).unwrap();

    match a.intersects(&b) {
        Err(WcsError::InvalidParameterValue { message, .. }) => {
            assert!(message.contains("incompatible CRS"))
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(a.union(&b).is_err());
    assert!(a.contains(&b).is_err());
}

#[test]
fn test_one_sided_crs_is_compatible() {
    let a = BoundingBox::from_corners(&["x", "y"], &[0.0, 0.0], &[1.0, 1.0], Some("EPSG:4326")).unwrap();
    let b = BoundingBox::from_corners(&["x", "y"], &[0.0, 0.0], &[1.0, 1.0], None).unwrap();
    assert!(a.intersects(&b).unwrap());
}

#[test]
fn test_mismatched_axes() {
    let a = lat_lon((0.0, 1.0), (0.0, 1.0));
    let b = BoundingBox::from_corners(&["x", "y"], &[0.0, 0.0], &[1.0, 1.0], None).unwrap();
    assert!(a.intersects(&b).is_err());
}

#[test]
fn test_union_contains_both_operands() {
    let a = lat_lon((-10.0, 10.0), (0.0, 20.0));
    let b = lat_lon((5.0, 30.0), (-40.0, 5.0));
    let u = a.union(&b).unwrap();

    assert!(u.contains(&a).unwrap());
    assert!(u.contains(&b).unwrap());
    assert_eq!(u.lower_corner(), vec![-10.0, -40.0]);
    assert_eq!(u.upper_corner(), vec![30.0, 20.0]);
}

#[test]
fn test_union_time_envelope() {
    let a = lat_lon((0.0, 1.0), (0.0, 1.0)).with_time_period(period(1, 5));
    let b = lat_lon((0.0, 1.0), (0.0, 1.0)).with_time_period(period(3, 9));
    let u = a.union(&b).unwrap();
    assert_eq!(u.time_period(), Some(&period(1, 9)));

    let c = lat_lon((0.0, 1.0), (0.0, 1.0));
    assert!(a.union(&c).unwrap().time_period().is_none());
}

#[test]
fn test_time_containment_is_strict() {
    // Shared time bounds are not contained, unlike shared axis bounds.
    let a = lat_lon((0.0, 1.0), (0.0, 1.0)).with_time_period(period(1, 5));
    let u = a.union(&a).unwrap();
    assert!(!u.contains(&a).unwrap());

    let wider = lat_lon((0.0, 1.0), (0.0, 1.0)).with_time_period(period(1, 9));
    let inner = lat_lon((0.0, 1.0), (0.0, 1.0)).with_time_period(period(2, 8));
    assert!(wider.contains(&inner).unwrap());
}

#[test]
fn test_shared_boundary_asymmetry() {
    // Boxes touching along an edge neither intersect nor contain each other.
    let left = lat_lon((0.0, 10.0), (0.0, 10.0));
    let right = lat_lon((0.0, 10.0), (10.0, 20.0));

    assert!(!left.intersects(&right).unwrap());
    assert!(!left.contains(&right).unwrap());
    assert!(!right.contains(&left).unwrap());

    // Coinciding axis bounds still count as containment.
    assert!(left.contains(&left).unwrap());
}

// ============================================================================
// Rendering
// ============================================================================

#[test]
fn test_gml_envelope_with_time() {
    let bbox = BoundingBox::from_corners(&["lat", "lon"], &[-90.0, -180.0], &[90.0, 180.0], Some("EPSG:4326"))
        .unwrap()
        .with_time_period(period(1, 2));

    let xml = bbox.to_gml_envelope();
    assert!(xml.starts_with(r#"<gml:EnvelopeWithTimePeriod srsName="EPSG:4326" axisLabels="lat lon" srsDimension="2">"#));
    assert!(xml.contains("<gml:lowerCorner>-90 -180</gml:lowerCorner>"));
    assert!(xml.contains("<gml:beginPosition>2020-01-01T00:00:00.000Z</gml:beginPosition>"));
    assert!(xml.ends_with("</gml:EnvelopeWithTimePeriod>"));
}

#[test]
fn test_gml_envelope_reparses() {
    let bbox = BoundingBox::from_corners(&["lat", "lon"], &[-1.5, 2.0], &[3.0, 4.25], Some("EPSG:4326"))
        .unwrap()
        .with_time_period(period(3, 4));

    let parsed = BoundingBox::from_envelope_xml(&XmlElement::parse(&bbox.to_gml_envelope()).unwrap()).unwrap();
    assert_eq!(parsed, bbox);
}

#[test]
fn test_wgs84_requires_lat_lon() {
    let bbox = BoundingBox::from_kvp("0,0,1,1").unwrap();
    assert!(bbox.to_wgs84_xml().is_none());
}
