//! Catalog configuration types.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use wcs_protocol::DomainCoordinate;

/// Errors raised while reading catalog configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid catalog configuration: {0}")]
    Invalid(String),
}

/// Top-level catalog settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Directory holding cached DMR documents.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Upper bound on a single DMR fetch. No timeout when unset.
    #[serde(default)]
    pub fetch_timeout_secs: Option<u64>,

    pub catalog: CatalogSource,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("/tmp/wcs-gateway/dmr-cache")
}

impl CatalogConfig {
    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_secs.map(Duration::from_secs)
    }
}

/// Where coverage metadata comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogSource {
    /// A YAML file listing every coverage.
    LocalFile { path: PathBuf },

    /// Coverages discovered by prefix from DAP services.
    DynamicService { services: Vec<ServiceDefinition> },

    /// A fixed in-memory coverage set.
    Dummy,
}

/// A DAP service that serves every coverage id beginning with `prefix`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub prefix: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Base URL the prefix is replaced with.
    pub href: String,
    #[serde(default)]
    pub srs: Option<String>,
    #[serde(default = "default_native_format")]
    pub native_format: String,
    /// Coordinate templates in storage order.
    pub domain_coordinates: Vec<CoordinateTemplate>,
}

fn default_native_format() -> String {
    "netcdf".to_string()
}

/// A domain coordinate with the default extent used when the DMR carries none.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinateTemplate {
    #[serde(flatten)]
    pub coordinate: DomainCoordinate,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

/// Parse a YAML document into `T`, attributing errors to `path`.
pub(crate) fn parse_yaml<T: serde::de::DeserializeOwned>(
    text: &str,
    path: &Path,
) -> Result<T, ConfigError> {
    serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
