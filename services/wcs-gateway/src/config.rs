//! Gateway configuration loading.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use catalog::{CatalogConfig, CatalogSource};

/// Gateway configuration loaded from a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(flatten)]
    pub catalog: CatalogConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig {
                cache_dir: PathBuf::from("/tmp/wcs-gateway/dmr-cache"),
                fetch_timeout_secs: None,
                catalog: CatalogSource::Dummy,
            },
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a YAML file.
    ///
    /// A missing file yields the default configuration (the dummy catalog).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                "Gateway config {} does not exist, using the dummy catalog",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read: {:?}", path))?;
        let mut config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse: {:?}", path))?;

        // Relative LocalFile paths are relative to the config file.
        if let CatalogSource::LocalFile { path: catalog_path } = &mut config.catalog.catalog {
            if catalog_path.is_relative() {
                if let Some(dir) = path.parent() {
                    *catalog_path = dir.join(&*catalog_path);
                }
            }
        }

        tracing::info!(
            "Loaded gateway config from {:?} ({} catalog)",
            path,
            catalog::CatalogKind::from(&config.catalog.catalog)
        );
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}
