//! Per-dimension subsets (trims and slices).
//!
//! A subset is either value based (bounds in the axis' natural units, applied
//! through the `grid()` server side function) or array-index based (integer
//! positions, applied as `[low:1:high]` hyperslabs on the raw array).

use serde::{Deserialize, Serialize};
use std::fmt;

use wcs_common::time::{format_as_units, parse_time_position};
use wcs_common::xml::escape;
use wcs_common::{WcsError, WcsResult, XmlElement};

/// Matches the whole axis on that side of a trim.
pub const WILDCARD: &str = "*";

/// The shape of a subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubsetKind {
    Trim { low: String, high: String },
    Slice { point: String },
}

/// One client requested subset on a named dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionSubset {
    dimension_id: String,
    kind: SubsetKind,
    array_index: bool,
}

/// Strip surrounding quotes and whitespace from an endpoint.
fn clean_endpoint(raw: &str) -> String {
    raw.trim_matches([' ', '\t', '\n', '\r', '"', '\'']).to_string()
}

fn is_array_like(endpoint: &str) -> bool {
    endpoint == WILDCARD || endpoint.parse::<i64>().is_ok()
}

fn check_endpoint(dimension_id: &str, endpoint: &str) -> WcsResult<()> {
    if endpoint.is_empty() {
        return Err(WcsError::invalid(
            "subset",
            format!("Empty subset bound for dimension '{}'", dimension_id),
        ));
    }
    if endpoint.contains('"') {
        return Err(WcsError::invalid(
            "subset",
            format!("Illegal character in subset bound '{}'", endpoint),
        ));
    }
    Ok(())
}

fn check_not_wildcard(dimension_id: &str, endpoint: &str) -> WcsResult<()> {
    if endpoint == WILDCARD {
        return Err(WcsError::invalid(
            "subset",
            format!(
                "Dimension '{}': wildcard bounds are only valid for array index subsets",
                dimension_id
            ),
        ));
    }
    Ok(())
}

impl DimensionSubset {
    /// Create a trim. Both bounds must be array-like or both value-like.
    pub fn trim(
        dimension_id: impl Into<String>,
        low: impl AsRef<str>,
        high: impl AsRef<str>,
    ) -> WcsResult<Self> {
        let dimension_id = dimension_id.into();
        let low = clean_endpoint(low.as_ref());
        let high = clean_endpoint(high.as_ref());
        check_endpoint(&dimension_id, &low)?;
        check_endpoint(&dimension_id, &high)?;

        let array_index = match (is_array_like(&low), is_array_like(&high)) {
            (true, true) => true,
            (false, false) => false,
            _ => {
                return Err(WcsError::invalid(
                    "subset",
                    format!(
                        "Dimension '{}': cannot mix array index ({}) with value based ({}) subset bounds",
                        dimension_id,
                        if is_array_like(&low) { &low } else { &high },
                        if is_array_like(&low) { &high } else { &low },
                    ),
                ))
            }
        };

        Ok(Self {
            dimension_id,
            kind: SubsetKind::Trim { low, high },
            array_index,
        })
    }

    /// Create a slice at a single point.
    pub fn slice(dimension_id: impl Into<String>, point: impl AsRef<str>) -> WcsResult<Self> {
        let dimension_id = dimension_id.into();
        let point = clean_endpoint(point.as_ref());
        check_endpoint(&dimension_id, &point)?;
        let array_index = is_array_like(&point);

        Ok(Self {
            dimension_id,
            kind: SubsetKind::Slice { point },
            array_index,
        })
    }

    /// Create a value based trim, even when the bounds look like integers.
    pub fn value_trim(
        dimension_id: impl Into<String>,
        low: impl AsRef<str>,
        high: impl AsRef<str>,
    ) -> WcsResult<Self> {
        let dimension_id = dimension_id.into();
        let low = clean_endpoint(low.as_ref());
        let high = clean_endpoint(high.as_ref());
        for bound in [&low, &high] {
            check_endpoint(&dimension_id, bound)?;
            check_not_wildcard(&dimension_id, bound)?;
        }

        Ok(Self {
            dimension_id,
            kind: SubsetKind::Trim { low, high },
            array_index: false,
        })
    }

    /// Create a value based slice, even when the point looks like an integer.
    pub fn value_slice(dimension_id: impl Into<String>, point: impl AsRef<str>) -> WcsResult<Self> {
        let dimension_id = dimension_id.into();
        let point = clean_endpoint(point.as_ref());
        check_endpoint(&dimension_id, &point)?;
        check_not_wildcard(&dimension_id, &point)?;

        Ok(Self {
            dimension_id,
            kind: SubsetKind::Slice { point },
            array_index: false,
        })
    }

    /// Parse a KVP subset: `dim(low,high)` or `dim(point)`.
    pub fn from_kvp(s: &str) -> WcsResult<Self> {
        let open = s.find('(');
        let close = s.rfind(')');

        let (open, close) = match (open, close) {
            (Some(o), Some(c)) if o < c => (o, c),
            _ => {
                return Err(WcsError::invalid(
                    "subset",
                    format!("Subset '{}' must have the form dim(low,high) or dim(point)", s),
                ))
            }
        };

        let dimension_id = s[..open].trim();
        if dimension_id.is_empty() {
            return Err(WcsError::invalid(
                "subset",
                format!("Subset '{}' has no dimension name", s),
            ));
        }
        if !s[close + 1..].trim().is_empty() {
            return Err(WcsError::invalid(
                "subset",
                format!("Unexpected text after ')' in subset '{}'", s),
            ));
        }

        let inner = &s[open + 1..close];
        match inner.split_once(',') {
            Some((low, high)) => Self::trim(dimension_id, low, high),
            None => Self::slice(dimension_id, inner),
        }
    }

    /// Parse a `DimensionTrim` or `DimensionSlice` element.
    pub fn from_xml(element: &XmlElement) -> WcsResult<Self> {
        let dimension_id = || {
            element
                .child_text("Dimension")
                .filter(|d| !d.is_empty())
                .ok_or_else(|| {
                    WcsError::missing(
                        element.name.clone(),
                        format!("{} must have a Dimension child", element.name),
                    )
                })
        };

        match element.name.as_str() {
            "DimensionTrim" => {
                let low = element.child_text("TrimLow").unwrap_or(WILDCARD);
                let high = element.child_text("TrimHigh").unwrap_or(WILDCARD);
                Self::trim(dimension_id()?, low, high)
            }
            "DimensionSlice" => {
                let point = element.child_text("SlicePoint").ok_or_else(|| {
                    WcsError::missing("SlicePoint", "DimensionSlice must have a SlicePoint child")
                })?;
                Self::slice(dimension_id()?, point)
            }
            other => Err(WcsError::invalid(
                "subset",
                format!(
                    "Unrecognized subset element '{}', expected DimensionTrim or DimensionSlice",
                    other
                ),
            )),
        }
    }

    pub fn dimension_id(&self) -> &str {
        &self.dimension_id
    }

    pub fn kind(&self) -> &SubsetKind {
        &self.kind
    }

    pub fn is_array_index(&self) -> bool {
        self.array_index
    }

    pub fn is_value(&self) -> bool {
        !self.array_index
    }

    /// Quoted `grid()` constraint for the given backend variable.
    pub fn value_constraint(&self, variable: &str) -> String {
        match &self.kind {
            SubsetKind::Trim { low, high } => format!("\"{}<={}<={}\"", low, variable, high),
            SubsetKind::Slice { point } => format!("\"{}={}\"", variable, point),
        }
    }

    /// Hyperslab clause, or `None` for value based subsets.
    pub fn array_index_constraint(&self) -> Option<String> {
        if !self.array_index {
            return None;
        }

        let clause = match &self.kind {
            SubsetKind::Trim { low, high } if low == WILDCARD && high == WILDCARD => {
                "[*]".to_string()
            }
            SubsetKind::Trim { low, high } => {
                let low = if low == WILDCARD { "0" } else { low.as_str() };
                format!("[{}:1:{}]", low, high)
            }
            SubsetKind::Slice { point } => format!("[{}]", point),
        };
        Some(clause)
    }

    /// Render as a WCS `DimensionTrim` or `DimensionSlice` element.
    ///
    /// Wildcard trim bounds are omitted.
    pub fn to_xml(&self) -> String {
        let dimension = format!(
            "<wcs:Dimension>{}</wcs:Dimension>",
            escape(&self.dimension_id)
        );

        match &self.kind {
            SubsetKind::Trim { low, high } => {
                let mut xml = format!("<wcs:DimensionTrim>{}", dimension);
                if low != WILDCARD {
                    xml.push_str(&format!("<wcs:TrimLow>{}</wcs:TrimLow>", escape(low)));
                }
                if high != WILDCARD {
                    xml.push_str(&format!("<wcs:TrimHigh>{}</wcs:TrimHigh>", escape(high)));
                }
                xml.push_str("</wcs:DimensionTrim>");
                xml
            }
            SubsetKind::Slice { point } => format!(
                "<wcs:DimensionSlice>{}<wcs:SlicePoint>{}</wcs:SlicePoint></wcs:DimensionSlice>",
                dimension,
                escape(point)
            ),
        }
    }
}

impl fmt::Display for DimensionSubset {
    /// KVP form, e.g. `lat(-10,10)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SubsetKind::Trim { low, high } => write!(f, "{}({},{})", self.dimension_id, low, high),
            SubsetKind::Slice { point } => write!(f, "{}({})", self.dimension_id, point),
        }
    }
}

/// A subset on a time axis.
///
/// Endpoints that are not plain numbers are read as time positions and
/// converted into the coordinate's units before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemporalSubset<'a> {
    subset: &'a DimensionSubset,
    units: &'a str,
}

impl<'a> TemporalSubset<'a> {
    pub fn new(subset: &'a DimensionSubset, units: &'a str) -> Self {
        Self { subset, units }
    }

    fn to_units(&self, endpoint: &str) -> WcsResult<String> {
        if endpoint.parse::<f64>().is_ok() {
            return Ok(endpoint.to_string());
        }
        let instant = parse_time_position(endpoint)?;
        Ok(format_as_units(instant, self.units))
    }

    pub fn value_constraint(&self, variable: &str) -> WcsResult<String> {
        let converted = match self.subset.kind() {
            SubsetKind::Trim { low, high } => DimensionSubset {
                dimension_id: self.subset.dimension_id.clone(),
                kind: SubsetKind::Trim {
                    low: self.to_units(low)?,
                    high: self.to_units(high)?,
                },
                array_index: false,
            },
            SubsetKind::Slice { point } => DimensionSubset {
                dimension_id: self.subset.dimension_id.clone(),
                kind: SubsetKind::Slice {
                    point: self.to_units(point)?,
                },
                array_index: false,
            },
        };
        Ok(converted.value_constraint(variable))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kvp_trim_value() {
        let s = DimensionSubset::from_kvp("lat(-10.5,10.5)").unwrap();
        assert_eq!(s.dimension_id(), "lat");
        assert!(s.is_value());
        assert_eq!(s.value_constraint("lat"), "\"-10.5<=lat<=10.5\"");
        assert_eq!(s.array_index_constraint(), None);
    }

    #[test]
    fn test_kvp_time_renders_value_form() {
        let s = DimensionSubset::from_kvp("time(10,20)").unwrap();
        assert_eq!(s.value_constraint("time"), "\"10<=time<=20\"");
    }

    #[test]
    fn test_kvp_strips_quotes_and_whitespace() {
        let s = DimensionSubset::from_kvp("time(\"2002-07-01\", '2002-07-31' )").unwrap();
        assert_eq!(
            s.kind(),
            &SubsetKind::Trim {
                low: "2002-07-01".into(),
                high: "2002-07-31".into()
            }
        );
    }

    #[test]
    fn test_kvp_slice_array() {
        let s = DimensionSubset::from_kvp("time(5)").unwrap();
        assert!(s.is_array_index());
        assert_eq!(s.array_index_constraint().as_deref(), Some("[5]"));
    }

    #[test]
    fn test_array_wildcards() {
        let both = DimensionSubset::trim("lat", "*", "*").unwrap();
        assert_eq!(both.array_index_constraint().as_deref(), Some("[*]"));

        let low = DimensionSubset::trim("lat", "*", "20").unwrap();
        assert_eq!(low.array_index_constraint().as_deref(), Some("[0:1:20]"));

        let high = DimensionSubset::trim("lat", "3", "*").unwrap();
        assert_eq!(high.array_index_constraint().as_deref(), Some("[3:1:*]"));
    }

    /// Bounds recovered from a rendered hyperslab clause.
    fn reparse(clause: &str) -> SubsetKind {
        let inner = clause.trim_start_matches('[').trim_end_matches(']');
        match inner.split(':').collect::<Vec<_>>().as_slice() {
            [low, "1", high] => SubsetKind::Trim {
                low: low.to_string(),
                high: high.to_string(),
            },
            ["*"] => SubsetKind::Trim {
                low: WILDCARD.to_string(),
                high: WILDCARD.to_string(),
            },
            [point] => SubsetKind::Slice {
                point: point.to_string(),
            },
            _ => panic!("unexpected clause {}", clause),
        }
    }

    #[test]
    fn test_array_index_reparses_to_same_bounds() {
        let cases = [
            ("lat(*,*)", "*", "*"),
            ("lat(*,20)", "0", "20"),
            ("lat(3,*)", "3", "*"),
            ("lat(3,20)", "3", "20"),
        ];
        for (kvp, low, high) in cases {
            let subset = DimensionSubset::from_kvp(kvp).unwrap();
            let clause = subset.array_index_constraint().unwrap();
            assert_eq!(
                reparse(&clause),
                SubsetKind::Trim {
                    low: low.to_string(),
                    high: high.to_string()
                },
                "{} rendered {}",
                kvp,
                clause
            );
        }

        let slice = DimensionSubset::from_kvp("time(7)").unwrap();
        assert_eq!(reparse(&slice.array_index_constraint().unwrap()), *slice.kind());
    }

    fn xml(s: &str) -> XmlElement {
        XmlElement::parse(s).unwrap()
    }

    #[test]
    fn test_xml_trim_without_bounds_is_wildcard() {
        let s = DimensionSubset::from_xml(&xml(
            r#"<wcs:DimensionTrim xmlns:wcs="http://www.opengis.net/wcs/2.0"><wcs:Dimension>lat</wcs:Dimension></wcs:DimensionTrim>"#,
        ))
        .unwrap();
        assert_eq!(s.dimension_id(), "lat");
        assert_eq!(
            *s.kind(),
            SubsetKind::Trim {
                low: "*".to_string(),
                high: "*".to_string()
            }
        );
        assert_eq!(s.array_index_constraint().as_deref(), Some("[*]"));
    }

    #[test]
    fn test_xml_trim_with_one_bound() {
        let s = DimensionSubset::from_xml(&xml(
            "<DimensionTrim><Dimension>lat</Dimension><TrimHigh>20</TrimHigh></DimensionTrim>",
        ))
        .unwrap();
        assert_eq!(s.array_index_constraint().as_deref(), Some("[0:1:20]"));
    }

    #[test]
    fn test_xml_slice() {
        let s = DimensionSubset::from_xml(&xml(
            "<DimensionSlice><Dimension>time</Dimension><SlicePoint>5</SlicePoint></DimensionSlice>",
        ))
        .unwrap();
        assert_eq!(s.array_index_constraint().as_deref(), Some("[5]"));
    }

    #[test]
    fn test_xml_slice_without_point_is_missing() {
        let err = DimensionSubset::from_xml(&xml(
            "<DimensionSlice><Dimension>time</Dimension></DimensionSlice>",
        ))
        .unwrap_err();
        assert!(matches!(err, WcsError::MissingParameter { .. }));
        assert_eq!(err.locator(), Some("SlicePoint"));
    }

    #[test]
    fn test_xml_without_dimension_is_missing() {
        let err = DimensionSubset::from_xml(&xml(
            "<DimensionTrim><TrimLow>1</TrimLow></DimensionTrim>",
        ))
        .unwrap_err();
        assert!(matches!(err, WcsError::MissingParameter { .. }));
    }

    #[test]
    fn test_xml_unknown_element_is_invalid() {
        let err = DimensionSubset::from_xml(&xml(
            "<DimensionFoo><Dimension>lat</Dimension></DimensionFoo>",
        ))
        .unwrap_err();
        assert!(matches!(err, WcsError::InvalidParameterValue { .. }));
    }

    #[test]
    fn test_mixed_endpoints_rejected() {
        let err = DimensionSubset::trim("lat", "*", "5.5").unwrap_err();
        assert!(matches!(err, WcsError::InvalidParameterValue { .. }));
        assert!(DimensionSubset::from_kvp("lat(3,5.5)").is_err());
    }

    #[test]
    fn test_kvp_malformed() {
        for bad in ["lat", "lat)1,2(", "(1,2)", "lat(1,2)x", "lat()", "lat(1,)"] {
            assert!(DimensionSubset::from_kvp(bad).is_err(), "accepted {}", bad);
        }
    }

    #[test]
    fn test_display_is_kvp() {
        let s = DimensionSubset::from_kvp("lon( 1 , 2 )").unwrap();
        assert_eq!(s.to_string(), "lon(1,2)");
    }

    #[test]
    fn test_temporal_conversion() {
        let s = DimensionSubset::from_kvp("time(\"1970-01-02\",\"1970-01-03\")").unwrap();
        let t = TemporalSubset::new(&s, "hours since 1970-01-01");
        assert_eq!(t.value_constraint("time").unwrap(), "\"24<=time<=48\"");
    }

    #[test]
    fn test_temporal_passes_numbers_through() {
        let s = DimensionSubset::slice("time", "36.5").unwrap();
        let t = TemporalSubset::new(&s, "hours since 1970-01-01");
        assert_eq!(t.value_constraint("t").unwrap(), "\"t=36.5\"");
    }

    #[test]
    fn test_temporal_bad_time() {
        let s = DimensionSubset::slice("time", "noonish").unwrap();
        let t = TemporalSubset::new(&s, "hours since 1970-01-01");
        assert!(t.value_constraint("time").is_err());
    }
}
