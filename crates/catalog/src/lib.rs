//! Coverage catalogs for the WCS gateway.
//!
//! A catalog answers two questions about a coverage id: what the coverage
//! looks like ([`wcs_protocol::CoverageDescription`]) and which backend
//! dataset serves it. Three kinds are available:
//!
//! - `local_file`: coverages listed in a YAML file, reloaded when it changes
//! - `dynamic_service`: coverages resolved by prefix to DAP services and
//!   described from their DMR documents, cached on disk
//! - `dummy`: a fixed in-memory set

pub mod catalog;
pub mod config;
pub mod dmr;
pub mod dmr_cache;
pub mod dummy;
pub mod dynamic;
pub mod local;
pub mod resolver;

pub use catalog::{build_catalog, CatalogKind, WcsCatalog};
pub use config::{CatalogConfig, CatalogSource, ConfigError, CoordinateTemplate, ServiceDefinition};
pub use dmr::{derive_coverage, Dmr, DmrVariable};
pub use dmr_cache::{CacheStats, DmrCache, DmrFetcher, FetchError, HttpDmrFetcher};
pub use dummy::DummyCatalog;
pub use dynamic::DynamicServiceCatalog;
pub use local::{LocalCatalogFile, LocalFileCatalog};
pub use resolver::{PrefixResolver, ResolvedDataset};
