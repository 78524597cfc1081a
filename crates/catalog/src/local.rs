//! A catalog read from a local YAML file.
//!
//! The file is re-read whenever its modification time changes. A reload that
//! fails keeps the previously loaded coverages.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::sync::RwLock;
use tracing::{info, warn};

use wcs_common::{parse_time_position, BoundingBox, TimePeriod, WcsError, WcsResult};
use wcs_protocol::{CoverageDescription, DomainCoordinate, EODatasetSeries, Field};

use crate::catalog::{CatalogKind, WcsCatalog};
use crate::config::{parse_yaml, ConfigError};

/// On-disk layout of a LocalFile catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalCatalogFile {
    #[serde(default)]
    pub coverages: Vec<CoverageEntry>,
    #[serde(default)]
    pub dataset_series: Vec<SeriesEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageEntry {
    pub coverage_id: String,
    pub dataset_url: String,
    #[serde(default = "default_native_format")]
    pub native_format: String,
    pub domain_coordinates: Vec<DomainCoordinate>,
    pub fields: Vec<Field>,
    #[serde(default)]
    pub bounding_box: Option<BoundingBoxEntry>,
}

fn default_native_format() -> String {
    "netcdf".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBoxEntry {
    #[serde(default)]
    pub srs_name: Option<String>,
    pub axis_labels: Vec<String>,
    pub lower_corner: Vec<f64>,
    pub upper_corner: Vec<f64>,
    #[serde(default)]
    pub begin_position: Option<String>,
    #[serde(default)]
    pub end_position: Option<String>,
}

impl BoundingBoxEntry {
    fn to_bounding_box(&self) -> WcsResult<BoundingBox> {
        let labels: Vec<&str> = self.axis_labels.iter().map(String::as_str).collect();
        let bbox = BoundingBox::from_corners(
            &labels,
            &self.lower_corner,
            &self.upper_corner,
            self.srs_name.as_deref(),
        )?;

        match (&self.begin_position, &self.end_position) {
            (Some(begin), Some(end)) => Ok(bbox.with_time_period(TimePeriod::new(
                parse_time_position(begin)?,
                parse_time_position(end)?,
            )?)),
            _ => Ok(bbox),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesEntry {
    pub id: String,
    pub members: Vec<String>,
}

#[derive(Debug, Default)]
struct LoadedCatalog {
    modified: Option<SystemTime>,
    coverages: HashMap<String, CoverageDescription>,
    series: HashMap<String, Vec<String>>,
}

impl LoadedCatalog {
    fn from_file(file: LocalCatalogFile, path: &Path) -> Result<Self, ConfigError> {
        let invalid = |err: WcsError| {
            ConfigError::Invalid(format!("{}: {}", path.display(), err))
        };

        let mut coverages = HashMap::new();
        for entry in file.coverages {
            let mut description = CoverageDescription::new(
                entry.coverage_id.clone(),
                entry.domain_coordinates,
                entry.fields,
                entry.native_format,
            )
            .map_err(invalid)?
            .with_dataset_url(entry.dataset_url);

            if let Some(bbox) = &entry.bounding_box {
                description = description.with_bounding_box(bbox.to_bounding_box().map_err(invalid)?);
            }
            if coverages.insert(entry.coverage_id.clone(), description).is_some() {
                return Err(ConfigError::Invalid(format!(
                    "{}: coverage '{}' is listed twice",
                    path.display(),
                    entry.coverage_id
                )));
            }
        }

        let mut series = HashMap::new();
        for entry in file.dataset_series {
            if let Some(missing) = entry.members.iter().find(|m| !coverages.contains_key(*m)) {
                return Err(ConfigError::Invalid(format!(
                    "{}: dataset series '{}' references unknown coverage '{}'",
                    path.display(),
                    entry.id,
                    missing
                )));
            }
            series.insert(entry.id, entry.members);
        }

        Ok(Self {
            modified: None,
            coverages,
            series,
        })
    }
}

async fn modified_time(path: &Path) -> Result<Option<SystemTime>, ConfigError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(metadata.modified().ok())
}

async fn load(path: &Path) -> Result<LoadedCatalog, ConfigError> {
    let modified = modified_time(path).await?;
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let file: LocalCatalogFile = parse_yaml(&text, path)?;

    let mut loaded = LoadedCatalog::from_file(file, path)?;
    loaded.modified = modified;
    info!(
        path = %path.display(),
        coverages = loaded.coverages.len(),
        series = loaded.series.len(),
        "Loaded local catalog"
    );
    Ok(loaded)
}

/// Coverages listed in a YAML file.
pub struct LocalFileCatalog {
    path: PathBuf,
    state: RwLock<LoadedCatalog>,
}

impl LocalFileCatalog {
    /// Load the catalog. Fails if the file is missing or invalid.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let state = load(&path).await?;
        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reload the file if its modification time changed.
    pub async fn revalidate(&self) {
        let current = match modified_time(&self.path).await {
            Ok(modified) => modified,
            Err(err) => {
                warn!(error = %err, "Unable to check local catalog, keeping loaded coverages");
                return;
            }
        };
        if current.is_some() && current == self.state.read().await.modified {
            return;
        }

        let mut state = self.state.write().await;
        // Another task may have reloaded while we waited for the write lock.
        if current.is_some() && current == state.modified {
            return;
        }
        match load(&self.path).await {
            Ok(loaded) => *state = loaded,
            Err(err) => {
                warn!(error = %err, "Reloading local catalog failed, keeping loaded coverages")
            }
        }
    }

    pub async fn coverage_ids(&self) -> Vec<String> {
        self.revalidate().await;
        let mut ids: Vec<String> = self.state.read().await.coverages.keys().cloned().collect();
        ids.sort();
        ids
    }
}

fn no_such_coverage(coverage_id: &str) -> WcsError {
    WcsError::NotFound(format!("No such coverage '{}'", coverage_id))
}

#[async_trait]
impl WcsCatalog for LocalFileCatalog {
    fn kind(&self) -> CatalogKind {
        CatalogKind::LocalFile
    }

    async fn coverage_description(&self, coverage_id: &str) -> WcsResult<CoverageDescription> {
        self.revalidate().await;
        self.state
            .read()
            .await
            .coverages
            .get(coverage_id)
            .cloned()
            .ok_or_else(|| no_such_coverage(coverage_id))
    }

    async fn dataset_url(&self, coverage_id: &str) -> WcsResult<String> {
        let description = self.coverage_description(coverage_id).await?;
        description
            .dataset_url()
            .map(str::to_string)
            .ok_or_else(|| no_such_coverage(coverage_id))
    }

    async fn dataset_series(&self, series_id: &str) -> WcsResult<EODatasetSeries> {
        self.revalidate().await;
        let state = self.state.read().await;
        let members = state.series.get(series_id).ok_or_else(|| {
            WcsError::NotFound(format!("No such dataset series '{}'", series_id))
        })?;

        let members = members
            .iter()
            .map(|id| {
                state
                    .coverages
                    .get(id)
                    .cloned()
                    .ok_or_else(|| no_such_coverage(id))
            })
            .collect::<WcsResult<Vec<_>>>()?;
        Ok(EODatasetSeries::new(series_id, members))
    }
}
