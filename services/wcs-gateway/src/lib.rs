//! WCS gateway library.
//!
//! Wires a coverage catalog and a decoded GetCoverage request into the DAP
//! data-access URL that an executor fetches to answer the request.

pub mod config;

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

use catalog::{build_catalog, ConfigError, WcsCatalog};
use wcs_common::WcsResult;
use wcs_protocol::{
    data_access_url, encode_constraint, ConstraintCompiler, CoverageDescription,
    GetCoverageRequest, ResponseFormat,
};

use crate::config::GatewayConfig;

/// Everything needed to fetch a coverage subset from the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataAccess {
    pub coverage_id: String,
    pub format: ResponseFormat,
    pub mime_type: String,
    pub content_disposition: String,
    /// The raw constraint expression.
    pub constraint: String,
    /// `<dataset>.<suffix>?<encoded constraint>`
    pub url: String,
}

/// Translates WCS requests against one catalog.
#[derive(Clone)]
pub struct Gateway {
    catalog: Arc<dyn WcsCatalog>,
}

impl Gateway {
    pub fn new(catalog: Arc<dyn WcsCatalog>) -> Self {
        Self { catalog }
    }

    pub async fn from_config(config: &GatewayConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(build_catalog(&config.catalog).await?))
    }

    pub fn catalog(&self) -> &dyn WcsCatalog {
        self.catalog.as_ref()
    }

    pub async fn describe(&self, coverage_id: &str) -> WcsResult<CoverageDescription> {
        self.catalog.coverage_description(coverage_id).await
    }

    /// Resolve a GetCoverage request to its data-access URL.
    #[instrument(skip(self, request), fields(coverage_id = %request.coverage_id))]
    pub async fn get_coverage(&self, request: &GetCoverageRequest) -> WcsResult<DataAccess> {
        let description = self.describe(&request.coverage_id).await?;
        let dataset_url = self.catalog.dataset_url(&request.coverage_id).await?;
        let format = request.response_format(description.native_format())?;

        let constraint = ConstraintCompiler::new(&description).compile_unencoded(
            &request.requested_fields,
            &request.dimension_subsets,
            Some(&request.scale),
        )?;
        let url = data_access_url(&dataset_url, format, &encode_constraint(&constraint));

        info!(format = %format, url = %url, "Resolved GetCoverage request");
        Ok(DataAccess {
            coverage_id: request.coverage_id.clone(),
            format,
            mime_type: format.mime_type().to_string(),
            content_disposition: format.content_disposition(&request.coverage_id),
            constraint,
            url,
        })
    }

    /// Decode and resolve a KVP query string.
    pub async fn get_coverage_kvp(&self, query: &str) -> WcsResult<DataAccess> {
        self.get_coverage(&GetCoverageRequest::from_query(query)?)
            .await
    }

    /// Decode and resolve a GetCoverage XML document.
    pub async fn get_coverage_xml(&self, xml: &str) -> WcsResult<DataAccess> {
        self.get_coverage(&GetCoverageRequest::from_xml_str(xml)?)
            .await
    }

    /// The `gml:Envelope` of a dataset series, or `None` if no member has a box.
    pub async fn series_envelope(&self, series_id: &str) -> WcsResult<Option<String>> {
        let series = self.catalog.dataset_series(series_id).await?;
        Ok(series.bounding_box()?.map(|bbox| bbox.to_gml_envelope()))
    }
}
