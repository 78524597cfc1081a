//! Scaling extension: resampling the two innermost axes with `scale_grid()`.

use serde::{Deserialize, Serialize};

use wcs_common::xml::escape;
use wcs_common::{WcsError, WcsResult, XmlElement};

use crate::coverage::DomainCoordinate;
use crate::kvp::KvpParams;

/// The single scaling mode a request may carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScaleMode {
    /// One factor for every scaled axis.
    Factor(f64),
    /// Per-axis factors, keyed by axis name.
    AxesByFactor(Vec<(String, f64)>),
    /// Per-axis target sizes, keyed by axis name.
    ToSize(Vec<(String, u64)>),
}

/// Scaling, output CRS and interpolation parameters of a GetCoverage request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScaleRequest {
    pub mode: Option<ScaleMode>,
    pub output_crs: Option<String>,
    pub interpolation: Option<String>,
}

const SINGLE_MODE: &str = "Only a single Scaling operation may be requested.";

fn parse_factor(locator: &str, raw: &str) -> WcsResult<f64> {
    match raw.trim().parse::<f64>() {
        Ok(f) if f.is_finite() && f > 0.0 => Ok(f),
        _ => Err(WcsError::invalid(
            locator,
            format!("Scale factor '{}' must be a positive number", raw),
        )),
    }
}

fn parse_size(locator: &str, raw: &str) -> WcsResult<u64> {
    raw.trim().parse::<u64>().map_err(|_| {
        WcsError::invalid(
            locator,
            format!("Target size '{}' must be a non-negative integer", raw),
        )
    })
}

/// Parse `axis(value),axis(value),...` into name/value pairs.
fn parse_axis_list(locator: &str, s: &str) -> WcsResult<Vec<(String, String)>> {
    let malformed = || {
        WcsError::invalid(
            locator,
            format!("'{}' must have the form axis(value),axis(value),...", s),
        )
    };

    let mut pairs = Vec::new();
    let mut rest = s.trim();
    while !rest.is_empty() {
        let open = rest.find('(').ok_or_else(malformed)?;
        let close = rest.find(')').ok_or_else(malformed)?;
        if close < open {
            return Err(malformed());
        }

        let axis = rest[..open].trim();
        let value = rest[open + 1..close].trim();
        if axis.is_empty() || value.is_empty() {
            return Err(malformed());
        }
        pairs.push((axis.to_string(), value.to_string()));

        rest = rest[close + 1..].trim_start();
        if let Some(next) = rest.strip_prefix(',') {
            rest = next.trim_start();
            if rest.is_empty() {
                return Err(malformed());
            }
        } else if !rest.is_empty() {
            return Err(malformed());
        }
    }

    if pairs.is_empty() {
        return Err(malformed());
    }
    Ok(pairs)
}

impl ScaleRequest {
    /// Read the scaling parameters from a KVP request.
    pub fn from_kvp(kvp: &KvpParams) -> WcsResult<Self> {
        let modes = ["scalefactor", "scaleaxes", "scalesize", "scaleextent"]
            .iter()
            .filter(|k| kvp.contains(k))
            .count();
        if modes > 1 {
            return Err(WcsError::invalid("scaling", SINGLE_MODE));
        }

        if kvp.contains("scaleextent") {
            return Err(WcsError::unsupported(
                "SCALEEXTENT",
                "Scaling by extent is not supported",
            ));
        }

        if let Some(per_axis) = kvp.get("interpolationperaxis") {
            for entry in per_axis.split(';').filter(|e| !e.trim().is_empty()) {
                match entry.split_once(',') {
                    Some((axis, method)) if !axis.trim().is_empty() && !method.trim().is_empty() => {}
                    _ => {
                        return Err(WcsError::invalid(
                            "INTERPOLATIONPERAXIS",
                            format!("'{}' must have the form axis,method", entry),
                        ))
                    }
                }
            }
            return Err(WcsError::unsupported(
                "INTERPOLATIONPERAXIS",
                "Per-axis interpolation is not supported",
            ));
        }

        let mode = if let Some(factor) = kvp.get("scalefactor") {
            Some(ScaleMode::Factor(parse_factor("SCALEFACTOR", factor)?))
        } else if let Some(axes) = kvp.get("scaleaxes") {
            let factors = parse_axis_list("SCALEAXES", axes)?
                .into_iter()
                .map(|(axis, f)| Ok((axis, parse_factor("SCALEAXES", &f)?)))
                .collect::<WcsResult<Vec<_>>>()?;
            Some(ScaleMode::AxesByFactor(factors))
        } else if let Some(sizes) = kvp.get("scalesize") {
            let sizes = parse_axis_list("SCALESIZE", sizes)?
                .into_iter()
                .map(|(axis, n)| Ok((axis, parse_size("SCALESIZE", &n)?)))
                .collect::<WcsResult<Vec<_>>>()?;
            Some(ScaleMode::ToSize(sizes))
        } else {
            None
        };

        Ok(Self {
            mode,
            output_crs: kvp.get("outputcrs").map(str::to_string),
            interpolation: kvp.get("interpolation").map(str::to_string),
        })
    }

    /// Read the scaling, interpolation and CRS extension elements of a
    /// GetCoverage document.
    pub fn from_xml(root: &XmlElement) -> WcsResult<Self> {
        let by_factor = root.descendants_named("ScaleByFactor");
        let by_axes = root.descendants_named("ScaleAxesByFactor");
        let to_size = root.descendants_named("ScaleToSize");
        let to_extent = root.descendants_named("ScaleToExtent");

        let modes = by_factor.len() + by_axes.len() + to_size.len() + to_extent.len();
        if modes > 1 {
            return Err(WcsError::invalid("scaling", SINGLE_MODE));
        }
        if !to_extent.is_empty() {
            return Err(WcsError::unsupported(
                "ScaleToExtent",
                "Scaling by extent is not supported",
            ));
        }
        if !root.descendants_named("InterpolationPerAxis").is_empty() {
            return Err(WcsError::unsupported(
                "InterpolationPerAxis",
                "Per-axis interpolation is not supported",
            ));
        }

        let mode = if let Some(el) = by_factor.first() {
            let factor = el
                .child_text("scaleFactor")
                .ok_or_else(|| WcsError::missing("scaleFactor", "ScaleByFactor needs a scaleFactor"))?;
            Some(ScaleMode::Factor(parse_factor("scaleFactor", factor)?))
        } else if let Some(el) = by_axes.first() {
            let factors = el
                .children_named("ScaleAxis")
                .map(|axis| {
                    let name = axis
                        .child_text("axis")
                        .ok_or_else(|| WcsError::missing("axis", "ScaleAxis needs an axis"))?;
                    let factor = axis.child_text("scaleFactor").ok_or_else(|| {
                        WcsError::missing("scaleFactor", "ScaleAxis needs a scaleFactor")
                    })?;
                    Ok((name.to_string(), parse_factor("scaleFactor", factor)?))
                })
                .collect::<WcsResult<Vec<_>>>()?;
            Some(ScaleMode::AxesByFactor(factors))
        } else if let Some(el) = to_size.first() {
            let sizes = el
                .children_named("TargetAxisSize")
                .map(|axis| {
                    let name = axis
                        .child_text("axis")
                        .ok_or_else(|| WcsError::missing("axis", "TargetAxisSize needs an axis"))?;
                    let size = axis.child_text("targetSize").ok_or_else(|| {
                        WcsError::missing("targetSize", "TargetAxisSize needs a targetSize")
                    })?;
                    Ok((name.to_string(), parse_size("targetSize", size)?))
                })
                .collect::<WcsResult<Vec<_>>>()?;
            Some(ScaleMode::ToSize(sizes))
        } else {
            None
        };

        let first_text = |name: &str| {
            root.descendants_named(name)
                .first()
                .map(|e| e.text.trim().to_string())
                .filter(|t| !t.is_empty())
        };

        Ok(Self {
            mode,
            output_crs: first_text("outputCrs"),
            interpolation: first_text("globalInterpolation"),
        })
    }

    /// Render the scaling, interpolation and output CRS extension elements.
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();

        match &self.mode {
            Some(ScaleMode::Factor(f)) => xml.push_str(&format!(
                "<scal:ScaleByFactor><scal:scaleFactor>{}</scal:scaleFactor></scal:ScaleByFactor>",
                f
            )),
            Some(ScaleMode::AxesByFactor(factors)) => {
                xml.push_str("<scal:ScaleAxesByFactor>");
                for (axis, f) in factors {
                    xml.push_str(&format!(
                        "<scal:ScaleAxis><scal:axis>{}</scal:axis><scal:scaleFactor>{}</scal:scaleFactor></scal:ScaleAxis>",
                        escape(axis),
                        f
                    ));
                }
                xml.push_str("</scal:ScaleAxesByFactor>");
            }
            Some(ScaleMode::ToSize(sizes)) => {
                xml.push_str("<scal:ScaleToSize>");
                for (axis, n) in sizes {
                    xml.push_str(&format!(
                        "<scal:TargetAxisSize><scal:axis>{}</scal:axis><scal:targetSize>{}</scal:targetSize></scal:TargetAxisSize>",
                        escape(axis),
                        n
                    ));
                }
                xml.push_str("</scal:ScaleToSize>");
            }
            None => {}
        }

        if let Some(method) = &self.interpolation {
            xml.push_str(&format!(
                "<int:Interpolation><int:globalInterpolation>{}</int:globalInterpolation></int:Interpolation>",
                escape(method)
            ));
        }
        if let Some(crs) = &self.output_crs {
            xml.push_str(&format!("<crs:outputCrs>{}</crs:outputCrs>", escape(crs)));
        }

        xml
    }

    /// Whether `scale_grid()` must be applied.
    pub fn is_active(&self) -> bool {
        self.mode.is_some() || self.output_crs.is_some() || self.interpolation.is_some()
    }

    /// Size of `coord` after scaling. Axes the mode does not name keep their size.
    fn scaled_size(&self, coord: &DomainCoordinate) -> u64 {
        match &self.mode {
            Some(ScaleMode::Factor(f)) => (coord.size as f64 * f) as u64,
            Some(ScaleMode::AxesByFactor(factors)) => factors
                .iter()
                .find(|(axis, _)| *axis == coord.name)
                .map(|(_, f)| (coord.size as f64 * f) as u64)
                .unwrap_or(coord.size),
            Some(ScaleMode::ToSize(sizes)) => sizes
                .iter()
                .find(|(axis, _)| *axis == coord.name)
                .map(|(_, n)| *n)
                .unwrap_or(coord.size),
            None => coord.size,
        }
    }

    fn named_axes(&self) -> Vec<&str> {
        match &self.mode {
            Some(ScaleMode::AxesByFactor(factors)) => factors.iter().map(|(a, _)| a.as_str()).collect(),
            Some(ScaleMode::ToSize(sizes)) => sizes.iter().map(|(a, _)| a.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// Wrap a field clause in `scale_grid(clause,ySize,xSize[,crs][,interp])`.
    ///
    /// The last two domain coordinates are taken as y and x.
    pub fn scale_expression(&self, clause: &str, coordinates: &[DomainCoordinate]) -> WcsResult<String> {
        if coordinates.len() < 2 {
            return Err(WcsError::Internal(format!(
                "Scaling needs at least two domain coordinates, coverage has {}",
                coordinates.len()
            )));
        }

        for axis in self.named_axes() {
            if !coordinates.iter().any(|c| c.name == axis) {
                return Err(WcsError::invalid(
                    "scaling",
                    format!(
                        "Unknown scale axis '{}'. Valid axes are: {}",
                        axis,
                        coordinates.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(", ")
                    ),
                ));
            }
        }

        let y = &coordinates[coordinates.len() - 2];
        let x = &coordinates[coordinates.len() - 1];

        let mut expr = format!(
            "scale_grid({},{},{}",
            clause,
            self.scaled_size(y),
            self.scaled_size(x)
        );
        if let Some(crs) = &self.output_crs {
            expr.push(',');
            expr.push_str(crs);
        }
        if let Some(method) = &self.interpolation {
            expr.push(',');
            expr.push_str(method);
        }
        expr.push(')');

        Ok(expr)
    }
}
