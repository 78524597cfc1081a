//! The catalog abstraction and the registry of catalog kinds.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::info;

use wcs_common::{WcsError, WcsResult};
use wcs_protocol::{CoverageDescription, EODatasetSeries};

use crate::config::{CatalogConfig, CatalogSource, ConfigError};
use crate::dmr_cache::{DmrCache, HttpDmrFetcher};
use crate::dummy::DummyCatalog;
use crate::dynamic::DynamicServiceCatalog;
use crate::local::LocalFileCatalog;

/// The available catalog implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogKind {
    LocalFile,
    DynamicService,
    Dummy,
}

impl CatalogKind {
    pub const ALL: [CatalogKind; 3] = [
        CatalogKind::LocalFile,
        CatalogKind::DynamicService,
        CatalogKind::Dummy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CatalogKind::LocalFile => "local_file",
            CatalogKind::DynamicService => "dynamic_service",
            CatalogKind::Dummy => "dummy",
        }
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&CatalogSource> for CatalogKind {
    fn from(source: &CatalogSource) -> Self {
        match source {
            CatalogSource::LocalFile { .. } => CatalogKind::LocalFile,
            CatalogSource::DynamicService { .. } => CatalogKind::DynamicService,
            CatalogSource::Dummy => CatalogKind::Dummy,
        }
    }
}

/// Source of coverage metadata and backend locations.
#[async_trait]
pub trait WcsCatalog: Send + Sync {
    fn kind(&self) -> CatalogKind;

    async fn coverage_description(&self, coverage_id: &str) -> WcsResult<CoverageDescription>;

    /// The backend dataset URL for a coverage.
    async fn dataset_url(&self, coverage_id: &str) -> WcsResult<String>;

    async fn has_coverage(&self, coverage_id: &str) -> bool {
        self.coverage_description(coverage_id).await.is_ok()
    }

    async fn dataset_series(&self, series_id: &str) -> WcsResult<EODatasetSeries> {
        Err(WcsError::NotFound(format!(
            "No dataset series '{}' in the {} catalog",
            series_id,
            self.kind()
        )))
    }
}

/// Build the catalog described by `config`.
pub async fn build_catalog(config: &CatalogConfig) -> Result<Arc<dyn WcsCatalog>, ConfigError> {
    let kind = CatalogKind::from(&config.catalog);
    info!(kind = %kind, "Building catalog");

    let catalog: Arc<dyn WcsCatalog> = match &config.catalog {
        CatalogSource::LocalFile { path } => Arc::new(LocalFileCatalog::open(path).await?),
        CatalogSource::DynamicService { services } => {
            let fetcher = HttpDmrFetcher::new(config.fetch_timeout())
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
            let cache = DmrCache::new(&config.cache_dir, Arc::new(fetcher));
            Arc::new(DynamicServiceCatalog::new(services.clone(), cache)?)
        }
        CatalogSource::Dummy => Arc::new(DummyCatalog::new()),
    };
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_kind_names_match_config_tags() {
        for kind in CatalogKind::ALL {
            let yaml = format!("catalog:\n  kind: {}\n  path: x.yaml\n  services: []\n", kind);
            let config: CatalogConfig = serde_yaml::from_str(&yaml).unwrap();
            assert_eq!(CatalogKind::from(&config.catalog), kind);
        }
    }

    #[tokio::test]
    async fn test_build_dummy() {
        let config = CatalogConfig {
            cache_dir: PathBuf::from("/tmp"),
            fetch_timeout_secs: None,
            catalog: CatalogSource::Dummy,
        };
        let catalog = build_catalog(&config).await.unwrap();
        assert_eq!(catalog.kind(), CatalogKind::Dummy);
    }

    #[tokio::test]
    async fn test_build_missing_local_file() {
        let config = CatalogConfig {
            cache_dir: PathBuf::from("/tmp"),
            fetch_timeout_secs: None,
            catalog: CatalogSource::LocalFile {
                path: PathBuf::from("/nonexistent/coverages.yaml"),
            },
        };
        assert!(matches!(
            build_catalog(&config).await,
            Err(ConfigError::Io { .. })
        ));
    }
}
