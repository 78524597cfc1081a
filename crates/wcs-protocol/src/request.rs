//! GetCoverage request decoding (KVP and XML) and re-serialisation.

use tracing::debug;

use wcs_common::xml::escape;
use wcs_common::{WcsError, WcsResult, XmlElement};

use crate::constraint::SubsetMap;
use crate::format::ResponseFormat;
use crate::kvp::KvpParams;
use crate::scale::ScaleRequest;
use crate::subset::DimensionSubset;

/// The only multipart packaging WCS 2.0 defines.
pub const MULTIPART_MEDIA_TYPE: &str = "multipart/related";

/// A decoded GetCoverage request.
#[derive(Debug, Clone, PartialEq)]
pub struct GetCoverageRequest {
    pub coverage_id: String,
    pub format: Option<String>,
    pub media_type: Option<String>,
    /// Requested fields in request order. Empty means every field.
    pub requested_fields: Vec<String>,
    pub dimension_subsets: SubsetMap,
    pub scale: ScaleRequest,
}

/// Parse a `RangeSubset` list of field names.
fn parse_range_subset(s: &str) -> WcsResult<Vec<String>> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            if item.contains(':') {
                Err(WcsError::unsupported(
                    "RangeSubset",
                    format!("Range intervals ('{}') are not supported", item),
                ))
            } else if item.contains('[') || item.contains('(') {
                Err(WcsError::unsupported(
                    "RangeSubset",
                    format!("Axis subsetting within a field ('{}') is not supported", item),
                ))
            } else {
                Ok(item.to_string())
            }
        })
        .collect()
}

fn check_media_type(media_type: Option<&str>) -> WcsResult<()> {
    match media_type {
        Some(mt) if mt != MULTIPART_MEDIA_TYPE => Err(WcsError::invalid(
            "mediaType",
            format!("mediaType must be '{}', got '{}'", MULTIPART_MEDIA_TYPE, mt),
        )),
        _ => Ok(()),
    }
}

impl GetCoverageRequest {
    pub fn new(coverage_id: impl Into<String>) -> Self {
        Self {
            coverage_id: coverage_id.into(),
            format: None,
            media_type: None,
            requested_fields: Vec::new(),
            dimension_subsets: SubsetMap::new(),
            scale: ScaleRequest::default(),
        }
    }

    /// Add a subset. Each dimension may be subset at most once.
    pub fn add_subset(&mut self, subset: DimensionSubset) -> WcsResult<()> {
        let dimension = subset.dimension_id().to_string();
        if self.dimension_subsets.contains_key(&dimension) {
            return Err(WcsError::invalid(
                "subset",
                format!("Dimension '{}' is subset more than once", dimension),
            ));
        }
        self.dimension_subsets.insert(dimension, subset);
        Ok(())
    }

    /// Decode a KVP query string.
    pub fn from_query(query: &str) -> WcsResult<Self> {
        Self::from_kvp(&KvpParams::parse(query)?)
    }

    pub fn from_kvp(kvp: &KvpParams) -> WcsResult<Self> {
        if let Some(service) = kvp.get("service") {
            if service != "WCS" {
                return Err(WcsError::invalid("service", "SERVICE must be WCS"));
            }
        }
        if let Some(version) = kvp.get("version") {
            if !version.starts_with("2.0") {
                return Err(WcsError::invalid(
                    "version",
                    format!("Unsupported version '{}', expected 2.0.x", version),
                ));
            }
        }
        if let Some(request) = kvp.get("request") {
            if request != "GetCoverage" {
                return Err(WcsError::invalid(
                    "request",
                    format!("Expected a GetCoverage request, got '{}'", request),
                ));
            }
        }
        if kvp.contains("subsettingcrs") {
            return Err(WcsError::unsupported(
                "SUBSETTINGCRS",
                "Subsetting in a CRS other than the native CRS is not supported",
            ));
        }

        let coverage_id = kvp
            .get("coverageid")
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| WcsError::missing("coverageId", "GetCoverage requires a coverageId"))?;

        let mut request = Self::new(coverage_id.trim());
        request.format = kvp.get("format").map(str::to_string);
        request.media_type = kvp.get("mediatype").map(str::to_string);
        check_media_type(request.media_type.as_deref())?;

        for subset in kvp.get_all("subset") {
            request.add_subset(DimensionSubset::from_kvp(subset)?)?;
        }
        if let Some(range) = kvp.get("rangesubset") {
            request.requested_fields = parse_range_subset(range)?;
        }
        request.scale = ScaleRequest::from_kvp(kvp)?;

        debug!(
            coverage_id = %request.coverage_id,
            subsets = request.dimension_subsets.len(),
            "Decoded KVP GetCoverage request"
        );
        Ok(request)
    }

    /// Decode a GetCoverage XML document.
    pub fn from_xml_str(xml: &str) -> WcsResult<Self> {
        Self::from_xml(&XmlElement::parse(xml)?)
    }

    pub fn from_xml(root: &XmlElement) -> WcsResult<Self> {
        if root.name != "GetCoverage" {
            return Err(WcsError::invalid(
                "request",
                format!("Expected a GetCoverage document, got '{}'", root.name),
            ));
        }
        if !root.descendants_named("subsettingCrs").is_empty() {
            return Err(WcsError::unsupported(
                "subsettingCrs",
                "Subsetting in a CRS other than the native CRS is not supported",
            ));
        }

        let coverage_id = root
            .child_text("CoverageId")
            .filter(|id| !id.is_empty())
            .ok_or_else(|| WcsError::missing("CoverageId", "GetCoverage requires a CoverageId"))?;

        let mut request = Self::new(coverage_id);
        request.format = root.child_text("format").map(str::to_string);
        request.media_type = root.child_text("mediaType").map(str::to_string);
        check_media_type(request.media_type.as_deref())?;

        for child in &root.children {
            if child.name.starts_with("Dimension") {
                request.add_subset(DimensionSubset::from_xml(child)?)?;
            }
        }

        if !root.descendants_named("RangeInterval").is_empty() {
            return Err(WcsError::unsupported(
                "RangeSubset",
                "Range intervals are not supported",
            ));
        }
        request.requested_fields = root
            .descendants_named("RangeComponent")
            .iter()
            .map(|c| c.text.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();

        request.scale = ScaleRequest::from_xml(root)?;

        debug!(
            coverage_id = %request.coverage_id,
            subsets = request.dimension_subsets.len(),
            "Decoded XML GetCoverage request"
        );
        Ok(request)
    }

    /// The requested format, falling back to the coverage's native format.
    pub fn response_format(&self, native_format: &str) -> WcsResult<ResponseFormat> {
        ResponseFormat::lookup(self.format.as_deref().unwrap_or(native_format))
    }

    /// Render the request as a GetCoverage XML document.
    pub fn to_xml(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<wcs:GetCoverage xmlns:wcs="http://www.opengis.net/wcs/2.0" xmlns:rsub="http://www.opengis.net/wcs/range-subsetting/1.0" xmlns:scal="http://www.opengis.net/wcs/scaling/1.0" xmlns:int="http://www.opengis.net/wcs/interpolation/1.0" xmlns:crs="http://www.opengis.net/wcs/crs/1.0" service="WCS" version="2.0.1">"#,
        );

        xml.push_str(&format!(
            "<wcs:CoverageId>{}</wcs:CoverageId>",
            escape(&self.coverage_id)
        ));
        for subset in self.dimension_subsets.values() {
            xml.push_str(&subset.to_xml());
        }
        if let Some(format) = &self.format {
            xml.push_str(&format!("<wcs:format>{}</wcs:format>", escape(format)));
        }
        if let Some(media_type) = &self.media_type {
            xml.push_str(&format!("<wcs:mediaType>{}</wcs:mediaType>", escape(media_type)));
        }

        let scale = self.scale.to_xml();
        if !self.requested_fields.is_empty() || !scale.is_empty() {
            xml.push_str("<wcs:Extension>");
            if !self.requested_fields.is_empty() {
                xml.push_str("<rsub:RangeSubset>");
                for field in &self.requested_fields {
                    xml.push_str(&format!(
                        "<rsub:RangeItem><rsub:RangeComponent>{}</rsub:RangeComponent></rsub:RangeItem>",
                        escape(field)
                    ));
                }
                xml.push_str("</rsub:RangeSubset>");
            }
            xml.push_str(&scale);
            xml.push_str("</wcs:Extension>");
        }

        xml.push_str("</wcs:GetCoverage>");
        xml
    }
}
