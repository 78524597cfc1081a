//! Bounding box types and operations.
//!
//! A WCS bounding box is an ordered set of named coordinate dimensions with
//! an optional time period and CRS. Boxes are only compared when they share
//! the same dimension names and (if both declare one) the same CRS; no
//! reprojection is attempted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{WcsError, WcsResult};
use crate::time::{format_gml_time, parse_time_position};
use crate::xml::{escape, XmlElement};

/// One named axis of a bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateDimension {
    pub name: String,
    pub min: f64,
    pub max: f64,
}

impl CoordinateDimension {
    pub fn new(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            min,
            max,
        }
    }
}

/// A closed time interval attached to a bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimePeriod {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> WcsResult<Self> {
        if start > end {
            return Err(WcsError::invalid(
                "TimePeriod",
                format!(
                    "Begin position {} is after end position {}",
                    format_gml_time(start),
                    format_gml_time(end)
                ),
            ));
        }
        Ok(Self { start, end })
    }
}

/// A multi-dimensional envelope with optional time period and CRS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    dimensions: Vec<CoordinateDimension>,
    time_period: Option<TimePeriod>,
    crs: Option<String>,
}

impl BoundingBox {
    /// Create a box from dimensions in axis order.
    pub fn new(dimensions: Vec<CoordinateDimension>, crs: Option<String>) -> WcsResult<Self> {
        let mut seen = BTreeSet::new();
        for dim in &dimensions {
            if !seen.insert(dim.name.as_str()) {
                return Err(WcsError::invalid(
                    "BoundingBox",
                    format!("Duplicate axis '{}'", dim.name),
                ));
            }
        }

        Ok(Self {
            dimensions,
            time_period: None,
            crs,
        })
    }

    /// Create a box from axis labels and matching lower/upper corners.
    pub fn from_corners(
        axis_labels: &[&str],
        lower: &[f64],
        upper: &[f64],
        crs: Option<&str>,
    ) -> WcsResult<Self> {
        if axis_labels.len() != lower.len() || axis_labels.len() != upper.len() {
            return Err(WcsError::invalid(
                "BoundingBox",
                format!(
                    "{} axis labels do not match corners of {} and {} values",
                    axis_labels.len(),
                    lower.len(),
                    upper.len()
                ),
            ));
        }

        let dimensions = axis_labels
            .iter()
            .zip(lower.iter().zip(upper))
            .map(|(name, (min, max))| CoordinateDimension::new(*name, *min, *max))
            .collect();

        Self::new(dimensions, crs.map(str::to_string))
    }

    /// Parse a KVP bounding box: `"min1,min2,...,max1,max2,...[,crsURI]"`.
    ///
    /// An odd number of elements means the last one is the CRS. Axes are
    /// named `axis0`, `axis1`, ... until relabelled with [`Self::with_axis_labels`].
    pub fn from_kvp(s: &str) -> WcsResult<Self> {
        let mut parts: Vec<&str> = s.split(',').map(str::trim).collect();

        let crs = if parts.len() % 2 == 1 {
            let last = parts.pop().unwrap_or_default();
            if last.parse::<f64>().is_ok() {
                return Err(WcsError::invalid(
                    "BoundingBox",
                    format!("Odd number of coordinate values in '{}'", s),
                ));
            }
            Some(last.to_string())
        } else {
            None
        };

        if parts.is_empty() {
            return Err(WcsError::invalid(
                "BoundingBox",
                format!("No coordinate values in '{}'", s),
            ));
        }

        let values = parts
            .iter()
            .map(|p| {
                p.parse::<f64>().map_err(|_| {
                    WcsError::invalid("BoundingBox", format!("Invalid number '{}'", p))
                })
            })
            .collect::<WcsResult<Vec<f64>>>()?;

        let (lower, upper) = values.split_at(values.len() / 2);
        let dimensions = lower
            .iter()
            .zip(upper)
            .enumerate()
            .map(|(i, (min, max))| CoordinateDimension::new(format!("axis{}", i), *min, *max))
            .collect();

        Self::new(dimensions, crs)
    }

    /// Parse a `boundedBy`, `Envelope` or `EnvelopeWithTimePeriod` element.
    pub fn from_envelope_xml(element: &XmlElement) -> WcsResult<Self> {
        let envelope = match element.name.as_str() {
            "Envelope" | "EnvelopeWithTimePeriod" => element,
            _ => element
                .child("EnvelopeWithTimePeriod")
                .or_else(|| element.child("Envelope"))
                .ok_or_else(|| {
                    WcsError::missing("Envelope", "Expected an Envelope or EnvelopeWithTimePeriod")
                })?,
        };

        let labels: Vec<&str> = envelope
            .attribute("axisLabels")
            .ok_or_else(|| WcsError::missing("axisLabels", "Envelope has no axisLabels"))?
            .split_whitespace()
            .collect();

        let lower = corner_values(envelope, "lowerCorner")?;
        let upper = corner_values(envelope, "upperCorner")?;
        let crs = envelope.attribute("srsName");

        let mut bbox = Self::from_corners(&labels, &lower, &upper, crs)?;

        match (
            envelope.child_text("beginPosition"),
            envelope.child_text("endPosition"),
        ) {
            (Some(begin), Some(end)) => {
                let period = TimePeriod::new(parse_time_position(begin)?, parse_time_position(end)?)?;
                bbox.time_period = Some(period);
            }
            (None, None) => {}
            (Some(_), None) => {
                return Err(WcsError::missing("endPosition", "Time period has no end"))
            }
            (None, Some(_)) => {
                return Err(WcsError::missing("beginPosition", "Time period has no begin"))
            }
        }

        Ok(bbox)
    }

    /// Rename the axes in order. The label count must match the dimension count.
    pub fn with_axis_labels(mut self, labels: &[&str]) -> WcsResult<Self> {
        if labels.len() != self.dimensions.len() {
            return Err(WcsError::invalid(
                "BoundingBox",
                format!(
                    "Expected {} axis labels, got {}",
                    self.dimensions.len(),
                    labels.len()
                ),
            ));
        }
        for (dim, label) in self.dimensions.iter_mut().zip(labels) {
            dim.name = label.to_string();
        }
        let time_period = self.time_period;
        let mut relabelled = Self::new(self.dimensions, self.crs)?;
        relabelled.time_period = time_period;
        Ok(relabelled)
    }

    pub fn with_time_period(mut self, period: TimePeriod) -> Self {
        self.time_period = Some(period);
        self
    }

    pub fn dimensions(&self) -> &[CoordinateDimension] {
        &self.dimensions
    }

    pub fn dimension(&self, name: &str) -> Option<&CoordinateDimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn time_period(&self) -> Option<&TimePeriod> {
        self.time_period.as_ref()
    }

    pub fn has_time_period(&self) -> bool {
        self.time_period.is_some()
    }

    pub fn crs(&self) -> Option<&str> {
        self.crs.as_deref()
    }

    pub fn axis_labels(&self) -> Vec<&str> {
        self.dimensions.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn lower_corner(&self) -> Vec<f64> {
        self.dimensions.iter().map(|d| d.min).collect()
    }

    pub fn upper_corner(&self) -> Vec<f64> {
        self.dimensions.iter().map(|d| d.max).collect()
    }

    /// Fail unless both boxes use the same axes and a compatible CRS.
    fn check_compatible(&self, other: &BoundingBox) -> WcsResult<()> {
        if let (Some(a), Some(b)) = (self.crs(), other.crs()) {
            if a != b {
                return Err(WcsError::invalid(
                    "BoundingBox",
                    format!("Bounding boxes have incompatible CRS '{}' and '{}'", a, b),
                ));
            }
        }

        let mine: BTreeSet<&str> = self.dimensions.iter().map(|d| d.name.as_str()).collect();
        let theirs: BTreeSet<&str> = other.dimensions.iter().map(|d| d.name.as_str()).collect();
        if mine != theirs {
            return Err(WcsError::invalid(
                "BoundingBox",
                format!(
                    "Bounding boxes have different axes [{}] and [{}]",
                    self.axis_labels().join(" "),
                    other.axis_labels().join(" ")
                ),
            ));
        }

        Ok(())
    }

    /// Pairs of (mine, theirs) in this box's axis order.
    fn paired<'a>(
        &'a self,
        other: &'a BoundingBox,
    ) -> impl Iterator<Item = (&'a CoordinateDimension, &'a CoordinateDimension)> {
        self.dimensions
            .iter()
            .filter_map(move |d| other.dimension(&d.name).map(|o| (d, o)))
    }

    /// Open-interval overlap on every axis, and on time when both have it.
    pub fn intersects(&self, other: &BoundingBox) -> WcsResult<bool> {
        self.check_compatible(other)?;

        let spatial = self
            .paired(other)
            .all(|(a, b)| a.min < b.max && a.max > b.min);

        let temporal = match (&self.time_period, &other.time_period) {
            (Some(a), Some(b)) => a.start < b.end && a.end > b.start,
            _ => true,
        };

        Ok(spatial && temporal)
    }

    /// True when this box encloses `other` on every axis.
    ///
    /// Axis bounds may coincide, time bounds may not: the start must be
    /// strictly before and the end strictly after the other period.
    pub fn contains(&self, other: &BoundingBox) -> WcsResult<bool> {
        self.check_compatible(other)?;

        let spatial = self
            .paired(other)
            .all(|(a, b)| a.min <= b.min && b.max <= a.max);

        let temporal = match (&self.time_period, &other.time_period) {
            (Some(a), Some(b)) => a.start < b.start && a.end > b.end,
            _ => true,
        };

        Ok(spatial && temporal)
    }

    /// Outer envelope of both boxes. Time is kept only when both have a period.
    pub fn union(&self, other: &BoundingBox) -> WcsResult<BoundingBox> {
        self.check_compatible(other)?;

        let dimensions = self
            .paired(other)
            .map(|(a, b)| CoordinateDimension::new(a.name.clone(), a.min.min(b.min), a.max.max(b.max)))
            .collect();

        let time_period = match (&self.time_period, &other.time_period) {
            (Some(a), Some(b)) => Some(TimePeriod {
                start: a.start.min(b.start),
                end: a.end.max(b.end),
            }),
            _ => None,
        };

        Ok(BoundingBox {
            dimensions,
            time_period,
            crs: self.crs.clone().or_else(|| other.crs.clone()),
        })
    }

    fn corner_text(values: &[f64]) -> String {
        values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Render as an `ows:BoundingBox` fragment.
    pub fn to_ows_xml(&self) -> String {
        let crs = self
            .crs
            .as_deref()
            .map(|c| format!(r#" crs="{}""#, escape(c)))
            .unwrap_or_default();

        format!(
            r#"<ows:BoundingBox{} dimensions="{}"><ows:LowerCorner>{}</ows:LowerCorner><ows:UpperCorner>{}</ows:UpperCorner></ows:BoundingBox>"#,
            crs,
            self.dimensions.len(),
            Self::corner_text(&self.lower_corner()),
            Self::corner_text(&self.upper_corner())
        )
    }

    /// Render as an `ows:WGS84BoundingBox` fragment (longitude first).
    ///
    /// Returns `None` unless the box has both a latitude and a longitude axis.
    pub fn to_wgs84_xml(&self) -> Option<String> {
        let find = |prefix: &str| {
            self.dimensions
                .iter()
                .find(|d| d.name.to_ascii_lowercase().starts_with(prefix))
        };
        let lon = find("lon")?;
        let lat = find("lat")?;

        Some(format!(
            r#"<ows:WGS84BoundingBox><ows:LowerCorner>{} {}</ows:LowerCorner><ows:UpperCorner>{} {}</ows:UpperCorner></ows:WGS84BoundingBox>"#,
            lon.min, lat.min, lon.max, lat.max
        ))
    }

    /// Render as a `gml:Envelope` or `gml:EnvelopeWithTimePeriod` fragment.
    pub fn to_gml_envelope(&self) -> String {
        let srs = self
            .crs
            .as_deref()
            .map(|c| format!(r#" srsName="{}""#, escape(c)))
            .unwrap_or_default();
        let element = if self.time_period.is_some() {
            "gml:EnvelopeWithTimePeriod"
        } else {
            "gml:Envelope"
        };

        let mut xml = format!(
            r#"<{}{} axisLabels="{}" srsDimension="{}"><gml:lowerCorner>{}</gml:lowerCorner><gml:upperCorner>{}</gml:upperCorner>"#,
            element,
            srs,
            escape(&self.axis_labels().join(" ")),
            self.dimensions.len(),
            Self::corner_text(&self.lower_corner()),
            Self::corner_text(&self.upper_corner())
        );

        if let Some(period) = &self.time_period {
            xml.push_str(&format!(
                "<gml:beginPosition>{}</gml:beginPosition><gml:endPosition>{}</gml:endPosition>",
                format_gml_time(period.start),
                format_gml_time(period.end)
            ));
        }

        xml.push_str(&format!("</{}>", element));
        xml
    }
}

fn corner_values(envelope: &XmlElement, name: &str) -> WcsResult<Vec<f64>> {
    envelope
        .child_text(name)
        .ok_or_else(|| WcsError::missing(name, format!("Envelope has no {}", name)))?
        .split_whitespace()
        .map(|v| {
            v.parse::<f64>()
                .map_err(|_| WcsError::invalid(name, format!("Invalid number '{}'", v)))
        })
        .collect()
}
