//! Coverage descriptions derived from DAP4 DMR documents.
//!
//! A service definition supplies coordinate templates in storage order. Each
//! template is matched to a DMR variable by its CF `standard_name`, falling
//! back to the template's backend variable name; whatever the DMR does not
//! say is taken from the template.

use std::collections::HashMap;
use tracing::{debug, warn};

use wcs_common::{
    instant_from_units, parse_time_position, BoundingBox, TimePeriod, WcsError, WcsResult,
    XmlElement,
};
use wcs_protocol::{CoordinateRole, CoverageDescription, DomainCoordinate, Field};

use crate::config::{CoordinateTemplate, ServiceDefinition};

/// DAP4 atomic types that declare variables.
const VARIABLE_TYPES: &[&str] = &[
    "Byte", "Char", "Int8", "UInt8", "Int16", "UInt16", "Int32", "UInt32", "Int64", "UInt64",
    "Float32", "Float64", "String", "URL",
];

/// A variable declared in a DMR.
#[derive(Debug, Clone, PartialEq)]
pub struct DmrVariable {
    pub name: String,
    pub data_type: String,
    /// Dimension names in storage order, without the leading `/`.
    pub dimensions: Vec<String>,
    pub attributes: HashMap<String, String>,
}

impl DmrVariable {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// The parts of a DMR the gateway uses.
#[derive(Debug, Clone, Default)]
pub struct Dmr {
    pub name: String,
    pub dimensions: HashMap<String, u64>,
    pub variables: Vec<DmrVariable>,
    pub global_attributes: HashMap<String, String>,
}

/// Attribute name to first value. Containers are flattened one level.
fn read_attributes(element: &XmlElement, into: &mut HashMap<String, String>) {
    for attr in element.children_named("Attribute") {
        let Some(name) = attr.attribute("name") else {
            continue;
        };
        if attr.attribute("type") == Some("Container") {
            read_attributes(attr, into);
        } else if let Some(value) = attr.child_text("Value") {
            into.insert(name.to_string(), value.to_string());
        }
    }
}

fn dimension_name(raw: &str) -> String {
    raw.rsplit('/').next().unwrap_or(raw).to_string()
}

impl Dmr {
    pub fn from_element(root: &XmlElement) -> WcsResult<Self> {
        if root.name != "Dataset" {
            return Err(WcsError::Internal(format!(
                "Expected a DMR Dataset element, got '{}'",
                root.name
            )));
        }

        let mut dmr = Dmr {
            name: root.attribute("name").unwrap_or_default().to_string(),
            ..Default::default()
        };

        for dim in root.children_named("Dimension") {
            let (Some(name), Some(size)) = (dim.attribute("name"), dim.attribute("size")) else {
                continue;
            };
            match size.trim().parse::<u64>() {
                Ok(size) => {
                    dmr.dimensions.insert(dimension_name(name), size);
                }
                Err(_) => warn!(dimension = name, size, "Ignoring DMR dimension with a bad size"),
            }
        }

        for child in &root.children {
            if !VARIABLE_TYPES.contains(&child.name.as_str()) {
                continue;
            }
            let Some(name) = child.attribute("name") else {
                continue;
            };
            let mut attributes = HashMap::new();
            read_attributes(child, &mut attributes);

            dmr.variables.push(DmrVariable {
                name: name.to_string(),
                data_type: child.name.clone(),
                dimensions: child
                    .children_named("Dim")
                    .filter_map(|d| d.attribute("name"))
                    .map(dimension_name)
                    .collect(),
                attributes,
            });
        }

        read_attributes(root, &mut dmr.global_attributes);
        Ok(dmr)
    }

    pub fn variable(&self, name: &str) -> Option<&DmrVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    fn global_f64(&self, name: &str) -> Option<f64> {
        self.global_attributes.get(name)?.trim().parse().ok()
    }

    /// The variable a coordinate template refers to.
    fn coordinate_variable(&self, template: &DomainCoordinate) -> Option<&DmrVariable> {
        let standard_name = match template.role {
            Some(CoordinateRole::Latitude) => "latitude",
            Some(CoordinateRole::Longitude) => "longitude",
            Some(CoordinateRole::Time) => "time",
            None => template.name.as_str(),
        };

        self.variables
            .iter()
            .find(|v| v.dimensions.len() == 1 && v.attribute("standard_name") == Some(standard_name))
            .or_else(|| self.variable(&template.backend_variable_id))
    }
}

/// A coordinate resolved against the DMR, with the dimension it spans.
struct ResolvedCoordinate<'a> {
    coordinate: DomainCoordinate,
    dimension: String,
    template: &'a CoordinateTemplate,
}

fn resolve_coordinate<'a>(dmr: &Dmr, template: &'a CoordinateTemplate) -> ResolvedCoordinate<'a> {
    let mut coordinate = template.coordinate.clone();

    let Some(var) = dmr.coordinate_variable(&template.coordinate) else {
        debug!(coordinate = %coordinate.name, "No DMR variable for coordinate, using template");
        return ResolvedCoordinate {
            dimension: coordinate.backend_variable_id.clone(),
            coordinate,
            template,
        };
    };

    coordinate.backend_variable_id = var.name.clone();
    if let Some(units) = var.attribute("units") {
        coordinate.units = units.to_string();
    }
    let dimension = var
        .dimensions
        .first()
        .cloned()
        .unwrap_or_else(|| var.name.clone());
    if let Some(size) = dmr.dimensions.get(&dimension) {
        coordinate.size = *size;
    }

    ResolvedCoordinate {
        coordinate,
        dimension,
        template,
    }
}

/// Fields are the non-coordinate variables gridded over every coordinate.
fn derive_fields(dmr: &Dmr, coords: &[ResolvedCoordinate<'_>]) -> Vec<Field> {
    let coordinate_dims: Vec<&str> = coords.iter().map(|c| c.dimension.as_str()).collect();
    let coordinate_vars: Vec<&str> = coords
        .iter()
        .map(|c| c.coordinate.backend_variable_id.as_str())
        .collect();

    dmr.variables
        .iter()
        .filter(|v| !coordinate_vars.contains(&v.name.as_str()))
        .filter(|v| {
            v.dimensions.len() >= coordinate_dims.len()
                && v.dimensions[v.dimensions.len() - coordinate_dims.len()..]
                    .iter()
                    .map(String::as_str)
                    .eq(coordinate_dims.iter().copied())
        })
        .map(|v| Field {
            name: v.name.clone(),
            backend_variable_id: v.name.clone(),
            description: v.attribute("long_name").map(str::to_string),
            units: v.attribute("units").map(str::to_string),
        })
        .collect()
}

fn range_instant(dmr: &Dmr, date_key: &str, time_key: &str) -> Option<String> {
    let date = dmr.global_attributes.get(date_key)?.trim();
    Some(match dmr.global_attributes.get(time_key) {
        Some(time) => format!("{}T{}Z", date, time.trim()),
        None => date.to_string(),
    })
}

/// Time period from the global range attributes, else from the time
/// coordinate's template extent read in its units.
fn derive_time_period(dmr: &Dmr, coords: &[ResolvedCoordinate<'_>]) -> Option<TimePeriod> {
    let (Some(begin), Some(end)) = (
        range_instant(dmr, "RangeBeginningDate", "RangeBeginningTime"),
        range_instant(dmr, "RangeEndingDate", "RangeEndingTime"),
    ) else {
        return template_time_period(coords);
    };

    let period = parse_time_position(&begin)
        .and_then(|start| TimePeriod::new(start, parse_time_position(&end)?));
    match period {
        Ok(period) => Some(period),
        Err(err) => {
            warn!(begin = %begin, end = %end, error = %err, "Ignoring unreadable DMR time range");
            None
        }
    }
}

fn template_time_period(coords: &[ResolvedCoordinate<'_>]) -> Option<TimePeriod> {
    let resolved = coords.iter().find(|c| c.coordinate.is_time())?;
    let units = &resolved.coordinate.units;
    let start = instant_from_units(resolved.template.min?, units)?;
    let end = instant_from_units(resolved.template.max?, units)?;
    match TimePeriod::new(start, end) {
        Ok(period) => Some(period),
        Err(err) => {
            warn!(units = %units, error = %err, "Ignoring template time extent");
            None
        }
    }
}

/// Spatial extent from template defaults, overridden by global attributes.
fn derive_bounding_box(
    dmr: &Dmr,
    coords: &[ResolvedCoordinate<'_>],
    srs: Option<&str>,
) -> WcsResult<Option<BoundingBox>> {
    let mut labels = Vec::new();
    let mut lower = Vec::new();
    let mut upper = Vec::new();

    for resolved in coords {
        let (min_key, max_key) = match resolved.coordinate.role {
            Some(CoordinateRole::Latitude) => ("SouthernmostLatitude", "NorthernmostLatitude"),
            Some(CoordinateRole::Longitude) => ("WesternmostLongitude", "EasternmostLongitude"),
            Some(CoordinateRole::Time) => continue,
            None => ("", ""),
        };

        let min = dmr.global_f64(min_key).or(resolved.template.min);
        let max = dmr.global_f64(max_key).or(resolved.template.max);
        if let (Some(min), Some(max)) = (min, max) {
            labels.push(resolved.coordinate.name.as_str());
            lower.push(min);
            upper.push(max);
        }
    }

    if labels.is_empty() {
        return Ok(None);
    }

    let mut bbox = BoundingBox::from_corners(&labels, &lower, &upper, srs)?;
    if let Some(period) = derive_time_period(dmr, coords) {
        bbox = bbox.with_time_period(period);
    }
    Ok(Some(bbox))
}

/// Build the description of `coverage_id` from its DMR and service definition.
pub fn derive_coverage(
    dmr_root: &XmlElement,
    service: &ServiceDefinition,
    coverage_id: &str,
    dataset_url: &str,
) -> WcsResult<CoverageDescription> {
    let dmr = Dmr::from_element(dmr_root)?;

    let coords: Vec<ResolvedCoordinate<'_>> = service
        .domain_coordinates
        .iter()
        .map(|t| resolve_coordinate(&dmr, t))
        .collect();

    let fields = derive_fields(&dmr, &coords);
    if fields.is_empty() {
        return Err(WcsError::NotFound(format!(
            "Dataset for coverage '{}' has no variables gridded over {}",
            coverage_id,
            coords
                .iter()
                .map(|c| c.coordinate.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }

    let bbox = derive_bounding_box(&dmr, &coords, service.srs.as_deref())?;
    let coordinates = coords.into_iter().map(|c| c.coordinate).collect();

    let mut description =
        CoverageDescription::new(coverage_id, coordinates, fields, service.native_format.clone())?
            .with_dataset_url(dataset_url);
    if let Some(bbox) = bbox {
        description = description.with_bounding_box(bbox);
    }

    debug!(
        coverage_id,
        fields = description.fields().len(),
        "Derived coverage description from DMR"
    );
    Ok(description)
}
