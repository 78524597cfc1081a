//! A catalog that discovers coverages from DAP services by id prefix.

use async_trait::async_trait;
use std::collections::HashMap;

use wcs_common::{WcsError, WcsResult};
use wcs_protocol::CoverageDescription;

use crate::catalog::{CatalogKind, WcsCatalog};
use crate::config::{ConfigError, ServiceDefinition};
use crate::dmr::derive_coverage;
use crate::dmr_cache::DmrCache;
use crate::resolver::PrefixResolver;

/// Coverages served by configured DAP services.
///
/// Coverage ids are resolved to dataset URLs by longest prefix, and described
/// from the dataset's (cached) DMR.
pub struct DynamicServiceCatalog {
    resolver: PrefixResolver,
    services: HashMap<String, ServiceDefinition>,
    cache: DmrCache,
}

impl DynamicServiceCatalog {
    pub fn new(services: Vec<ServiceDefinition>, cache: DmrCache) -> Result<Self, ConfigError> {
        let mut by_prefix = HashMap::new();
        for service in services {
            if service.domain_coordinates.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "service '{}' declares no domain coordinates",
                    service.prefix
                )));
            }
            let prefix = service.prefix.clone();
            if by_prefix.insert(prefix.clone(), service).is_some() {
                return Err(ConfigError::Invalid(format!(
                    "service prefix '{}' is configured twice",
                    prefix
                )));
            }
        }

        let resolver = PrefixResolver::new(
            by_prefix
                .iter()
                .map(|(prefix, service)| (prefix.clone(), service.href.clone())),
        );

        Ok(Self {
            resolver,
            services: by_prefix,
            cache,
        })
    }

    pub fn resolver(&self) -> &PrefixResolver {
        &self.resolver
    }

    pub fn cache(&self) -> &DmrCache {
        &self.cache
    }
}

#[async_trait]
impl WcsCatalog for DynamicServiceCatalog {
    fn kind(&self) -> CatalogKind {
        CatalogKind::DynamicService
    }

    async fn coverage_description(&self, coverage_id: &str) -> WcsResult<CoverageDescription> {
        let resolved = self.resolver.resolve(coverage_id)?;
        let service = self.services.get(&resolved.prefix).ok_or_else(|| {
            WcsError::Internal(format!("Resolver returned unknown prefix '{}'", resolved.prefix))
        })?;

        let dmr = self.cache.get(coverage_id, &resolved.dataset_url).await?;
        derive_coverage(&dmr, service, coverage_id, &resolved.dataset_url)
    }

    async fn dataset_url(&self, coverage_id: &str) -> WcsResult<String> {
        Ok(self.resolver.resolve(coverage_id)?.dataset_url)
    }
}
