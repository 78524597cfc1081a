//! A fixed in-memory catalog for demonstrations and tests.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::warn;

use wcs_common::{BoundingBox, WcsError, WcsResult};
use wcs_protocol::{CoordinateRole, CoverageDescription, DomainCoordinate, Field};

use crate::catalog::{CatalogKind, WcsCatalog};

const DUMMY_BASE_URL: &str = "http://localhost:8080/opendap/dummy/";

fn global_grid(
    coverage_id: &str,
    fields: &[(&str, &str)],
    with_time: bool,
) -> WcsResult<CoverageDescription> {
    let mut coordinates = Vec::new();
    if with_time {
        coordinates.push(DomainCoordinate::new(
            "time",
            "time",
            "days since 1970-01-01",
            365,
            Some(CoordinateRole::Time),
        ));
    }
    coordinates.push(DomainCoordinate::new(
        "latitude",
        "lat",
        "degrees_north",
        180,
        Some(CoordinateRole::Latitude),
    ));
    coordinates.push(DomainCoordinate::new(
        "longitude",
        "lon",
        "degrees_east",
        360,
        Some(CoordinateRole::Longitude),
    ));

    let fields = fields
        .iter()
        .map(|(name, var)| Field::new(*name, *var))
        .collect();

    let bbox = BoundingBox::from_corners(
        &["latitude", "longitude"],
        &[-90.0, -180.0],
        &[90.0, 180.0],
        Some("urn:ogc:def:crs:EPSG::4326"),
    )?;

    Ok(CoverageDescription::new(coverage_id, coordinates, fields, "netcdf")?
        .with_bounding_box(bbox)
        .with_dataset_url(format!("{}{}", DUMMY_BASE_URL, coverage_id)))
}

/// Serves a small fixed set of global grids.
#[derive(Debug, Clone)]
pub struct DummyCatalog {
    coverages: BTreeMap<String, CoverageDescription>,
}

impl Default for DummyCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl DummyCatalog {
    pub fn new() -> Self {
        let mut catalog = Self {
            coverages: BTreeMap::new(),
        };
        let built_in = [
            global_grid("dummy/sst.nc", &[("sst", "analysed_sst"), ("mask", "mask")], true),
            global_grid("dummy/bathymetry.nc", &[("elevation", "z")], false),
        ];
        for coverage in built_in {
            match coverage {
                Ok(coverage) => catalog = catalog.with_coverage(coverage),
                Err(err) => warn!(error = %err, "Skipping malformed built-in coverage"),
            }
        }
        catalog
    }

    /// Add or replace a coverage.
    pub fn with_coverage(mut self, coverage: CoverageDescription) -> Self {
        self.coverages
            .insert(coverage.coverage_id().to_string(), coverage);
        self
    }

    pub fn coverage_ids(&self) -> impl Iterator<Item = &str> {
        self.coverages.keys().map(String::as_str)
    }
}

#[async_trait]
impl WcsCatalog for DummyCatalog {
    fn kind(&self) -> CatalogKind {
        CatalogKind::Dummy
    }

    async fn coverage_description(&self, coverage_id: &str) -> WcsResult<CoverageDescription> {
        self.coverages
            .get(coverage_id)
            .cloned()
            .ok_or_else(|| WcsError::NotFound(format!("No such coverage '{}'", coverage_id)))
    }

    async fn dataset_url(&self, coverage_id: &str) -> WcsResult<String> {
        self.coverage_description(coverage_id)
            .await?
            .dataset_url()
            .map(str::to_string)
            .ok_or_else(|| {
                WcsError::NotFound(format!("Coverage '{}' has no backend dataset", coverage_id))
            })
    }
}
