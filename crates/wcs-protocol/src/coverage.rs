//! Coverage descriptions: the domain and range of a served dataset.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use wcs_common::{BoundingBox, WcsError, WcsResult};

/// Well-known axis roles of a domain coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateRole {
    Latitude,
    Longitude,
    Time,
}

/// One axis of a coverage's grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainCoordinate {
    /// Axis name used in WCS requests.
    pub name: String,
    /// Name of the coordinate variable in the backend dataset.
    pub backend_variable_id: String,
    #[serde(default)]
    pub units: String,
    pub size: u64,
    #[serde(default)]
    pub role: Option<CoordinateRole>,
}

impl DomainCoordinate {
    pub fn new(
        name: impl Into<String>,
        backend_variable_id: impl Into<String>,
        units: impl Into<String>,
        size: u64,
        role: Option<CoordinateRole>,
    ) -> Self {
        Self {
            name: name.into(),
            backend_variable_id: backend_variable_id.into(),
            units: units.into(),
            size,
            role,
        }
    }

    pub fn is_time(&self) -> bool {
        self.role == Some(CoordinateRole::Time)
    }
}

/// A range component (data variable) of a coverage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub backend_variable_id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub units: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, backend_variable_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            backend_variable_id: backend_variable_id.into(),
            description: None,
            units: None,
        }
    }
}

/// Everything the compiler needs to know about a coverage.
///
/// Domain coordinates are kept in backend storage order, which is the order
/// array index clauses must be emitted in.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageDescription {
    coverage_id: String,
    domain_coordinates: Vec<DomainCoordinate>,
    fields: Vec<Field>,
    native_format: String,
    bounding_box: Option<BoundingBox>,
    dataset_url: Option<String>,
}

impl CoverageDescription {
    pub fn new(
        coverage_id: impl Into<String>,
        domain_coordinates: Vec<DomainCoordinate>,
        fields: Vec<Field>,
        native_format: impl Into<String>,
    ) -> WcsResult<Self> {
        let coverage_id = coverage_id.into();

        let mut names = BTreeSet::new();
        for coord in &domain_coordinates {
            if !names.insert(coord.name.as_str()) {
                return Err(WcsError::Internal(format!(
                    "Coverage '{}' declares domain coordinate '{}' twice",
                    coverage_id, coord.name
                )));
            }
        }

        let mut names = BTreeSet::new();
        for field in &fields {
            if !names.insert(field.name.as_str()) {
                return Err(WcsError::Internal(format!(
                    "Coverage '{}' declares field '{}' twice",
                    coverage_id, field.name
                )));
            }
        }

        Ok(Self {
            coverage_id,
            domain_coordinates,
            fields,
            native_format: native_format.into(),
            bounding_box: None,
            dataset_url: None,
        })
    }

    pub fn with_bounding_box(mut self, bbox: BoundingBox) -> Self {
        self.bounding_box = Some(bbox);
        self
    }

    pub fn with_dataset_url(mut self, url: impl Into<String>) -> Self {
        self.dataset_url = Some(url.into());
        self
    }

    pub fn coverage_id(&self) -> &str {
        &self.coverage_id
    }

    pub fn set_coverage_id(&mut self, coverage_id: impl Into<String>) {
        self.coverage_id = coverage_id.into();
    }

    pub fn domain_coordinates(&self) -> &[DomainCoordinate] {
        &self.domain_coordinates
    }

    pub fn domain_coordinate(&self, name: &str) -> Option<&DomainCoordinate> {
        self.domain_coordinates.iter().find(|c| c.name == name)
    }

    pub fn coordinate_names(&self) -> Vec<&str> {
        self.domain_coordinates.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn native_format(&self) -> &str {
        &self.native_format
    }

    pub fn bounding_box(&self) -> Option<&BoundingBox> {
        self.bounding_box.as_ref()
    }

    pub fn dataset_url(&self) -> Option<&str> {
        self.dataset_url.as_deref()
    }
}
