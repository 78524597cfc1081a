//! Common test fixtures for WCS gateway tests.
//!
//! The fixtures describe one small sea surface temperature coverage in every
//! form the gateway consumes: a DMR document, catalog configuration and
//! GetCoverage requests.

/// The reference coverage: `[time, latitude, longitude]` with sizes 10, 180, 360.
pub mod coverage {
    pub const COVERAGE_ID: &str = "ghrsst/sst.nc";
    pub const DATASET_URL: &str = "http://test.opendap.org/opendap/ghrsst/sst.nc";
    pub const TIME_UNITS: &str = "hours since 1900-01-01 00:00:0.0";

    pub const TIME_SIZE: u64 = 10;
    pub const LAT_SIZE: u64 = 180;
    pub const LON_SIZE: u64 = 360;

    /// Field name and its backend variable.
    pub const FIELD: (&str, &str) = ("temp", "T");

    /// Domain coordinates as YAML, in storage order.
    pub const DOMAIN_COORDINATES_YAML: &str = r#"
- name: time
  backend_variable_id: time
  units: "hours since 1900-01-01 00:00:0.0"
  size: 10
  role: time
- name: latitude
  backend_variable_id: latitude
  units: degrees_north
  size: 180
  role: latitude
- name: longitude
  backend_variable_id: longitude
  units: degrees_east
  size: 360
  role: longitude
"#;
}

/// DMR documents as served by the backend at `<dataset>.dmr.xml`.
pub mod dmr {
    /// DMR for [`super::coverage`], with CF standard names and global extents.
    pub const SST_DMR: &str = r#"<?xml version="1.0" encoding="ISO-8859-1"?>
<Dataset xmlns="http://xml.opendap.org/ns/DAP/4.0#" dapVersion="4.0" dmrVersion="1.0" name="sst.nc" xml:base="http://test.opendap.org/opendap/ghrsst/sst.nc">
    <Dimension name="time" size="10"/>
    <Dimension name="lat" size="180"/>
    <Dimension name="lon" size="360"/>
    <Dimension name="nv" size="2"/>
    <Float64 name="time">
        <Dim name="/time"/>
        <Attribute name="standard_name" type="String"><Value>time</Value></Attribute>
        <Attribute name="units" type="String"><Value>hours since 1900-01-01 00:00:0.0</Value></Attribute>
    </Float64>
    <Float32 name="lat">
        <Dim name="/lat"/>
        <Attribute name="standard_name" type="String"><Value>latitude</Value></Attribute>
        <Attribute name="units" type="String"><Value>degrees_north</Value></Attribute>
    </Float32>
    <Float32 name="lon">
        <Dim name="/lon"/>
        <Attribute name="standard_name" type="String"><Value>longitude</Value></Attribute>
        <Attribute name="units" type="String"><Value>degrees_east</Value></Attribute>
    </Float32>
    <Float32 name="lat_bnds">
        <Dim name="/lat"/>
        <Dim name="/nv"/>
    </Float32>
    <Float32 name="T">
        <Dim name="/time"/>
        <Dim name="/lat"/>
        <Dim name="/lon"/>
        <Attribute name="long_name" type="String"><Value>sea surface temperature</Value></Attribute>
        <Attribute name="units" type="String"><Value>kelvin</Value></Attribute>
    </Float32>
    <Int16 name="mask">
        <Dim name="/time"/>
        <Dim name="/lat"/>
        <Dim name="/lon"/>
    </Int16>
    <Attribute name="NC_GLOBAL" type="Container">
        <Attribute name="SouthernmostLatitude" type="Float32"><Value>-89.5</Value></Attribute>
        <Attribute name="NorthernmostLatitude" type="Float32"><Value>89.5</Value></Attribute>
        <Attribute name="WesternmostLongitude" type="Float32"><Value>-179.5</Value></Attribute>
        <Attribute name="EasternmostLongitude" type="Float32"><Value>179.5</Value></Attribute>
        <Attribute name="RangeBeginningDate" type="String"><Value>2002-07-01</Value></Attribute>
        <Attribute name="RangeBeginningTime" type="String"><Value>00:00:00</Value></Attribute>
        <Attribute name="RangeEndingDate" type="String"><Value>2002-07-10</Value></Attribute>
        <Attribute name="RangeEndingTime" type="String"><Value>00:00:00</Value></Attribute>
    </Attribute>
</Dataset>
"#;

    /// A DMR with no CF metadata: every coordinate falls back to its template.
    pub const BARE_DMR: &str = r#"<?xml version="1.0" encoding="ISO-8859-1"?>
<Dataset xmlns="http://xml.opendap.org/ns/DAP/4.0#" name="bare.nc">
    <Dimension name="y" size="4"/>
    <Dimension name="x" size="8"/>
    <Float32 name="y"><Dim name="/y"/></Float32>
    <Float32 name="x"><Dim name="/x"/></Float32>
    <Float32 name="chlor_a"><Dim name="/y"/><Dim name="/x"/></Float32>
</Dataset>
"#;
}

/// Catalog configuration documents.
pub mod catalog {
    /// A LocalFile catalog describing the reference coverage and a series.
    pub const LOCAL_CATALOG_YAML: &str = r#"
coverages:
  - coverage_id: sst
    dataset_url: http://test.opendap.org/opendap/sst.nc
    native_format: netcdf
    domain_coordinates:
      - { name: time, backend_variable_id: time, units: "hours since 1900-01-01 00:00:0.0", size: 10, role: time }
      - { name: latitude, backend_variable_id: latitude, units: degrees_north, size: 180, role: latitude }
      - { name: longitude, backend_variable_id: longitude, units: degrees_east, size: 360, role: longitude }
    fields:
      - { name: temp, backend_variable_id: T, units: kelvin }
    bounding_box:
      srs_name: "urn:ogc:def:crs:EPSG::4326"
      axis_labels: [latitude, longitude]
      lower_corner: [-90.0, -180.0]
      upper_corner: [0.0, 0.0]
  - coverage_id: sst_north
    dataset_url: http://test.opendap.org/opendap/sst_north.nc
    native_format: netcdf
    domain_coordinates:
      - { name: latitude, backend_variable_id: latitude, size: 90 }
      - { name: longitude, backend_variable_id: longitude, size: 360 }
    fields:
      - { name: temp, backend_variable_id: T }
    bounding_box:
      srs_name: "urn:ogc:def:crs:EPSG::4326"
      axis_labels: [latitude, longitude]
      lower_corner: [0.0, -180.0]
      upper_corner: [90.0, 180.0]
dataset_series:
  - id: sst_series
    members: [sst, sst_north]
"#;

    /// DynamicService definitions with coordinate templates.
    pub const DYNAMIC_SERVICES_YAML: &str = r#"
- prefix: "ghrsst/"
  name: GHRSST
  href: "http://test.opendap.org/opendap/ghrsst/"
  srs: "urn:ogc:def:crs:EPSG::4326"
  native_format: netcdf
  domain_coordinates:
    - { name: time, backend_variable_id: time, units: "seconds since 1970-01-01", size: 1, role: time }
    - { name: latitude, backend_variable_id: lat, units: degrees_north, size: 1, role: latitude, min: -90.0, max: 90.0 }
    - { name: longitude, backend_variable_id: lon, units: degrees_east, size: 1, role: longitude, min: -180.0, max: 180.0 }
- prefix: "ghrsst/l4/"
  name: GHRSST L4
  href: "http://l4.test.opendap.org/opendap/"
  srs: "urn:ogc:def:crs:EPSG::4326"
  native_format: netcdf
  domain_coordinates:
    - { name: y, backend_variable_id: y, size: 4, min: 0.0, max: 4.0 }
    - { name: x, backend_variable_id: x, size: 8, min: 0.0, max: 8.0 }
"#;
}

/// GetCoverage requests against [`super::coverage`].
pub mod requests {
    /// KVP request trimming latitude by value.
    pub const KVP_LAT_TRIM: &str =
        "SERVICE=WCS&VERSION=2.0.1&REQUEST=GetCoverage&COVERAGEID=ghrsst/sst.nc&SUBSET=latitude(-10.5,10.5)";

    /// XML request with a value trim, a time slice and a scale factor.
    pub const XML_TRIM_SLICE_SCALE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<wcs:GetCoverage xmlns:wcs="http://www.opengis.net/wcs/2.0"
                 xmlns:scal="http://www.opengis.net/wcs/scaling/1.0"
                 service="WCS" version="2.0.1">
    <wcs:CoverageId>ghrsst/sst.nc</wcs:CoverageId>
    <wcs:DimensionTrim>
        <wcs:Dimension>latitude</wcs:Dimension>
        <wcs:TrimLow>-10.5</wcs:TrimLow>
        <wcs:TrimHigh>10.5</wcs:TrimHigh>
    </wcs:DimensionTrim>
    <wcs:DimensionSlice>
        <wcs:Dimension>time</wcs:Dimension>
        <wcs:SlicePoint>1900-01-02T00:00:00Z</wcs:SlicePoint>
    </wcs:DimensionSlice>
    <wcs:format>application/x-netcdf</wcs:format>
    <wcs:Extension>
        <scal:ScaleByFactor>
            <scal:scaleFactor>0.5</scal:scaleFactor>
        </scal:ScaleByFactor>
    </wcs:Extension>
</wcs:GetCoverage>
"#;
}
