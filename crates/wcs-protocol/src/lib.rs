//! OGC WCS 2.0 GetCoverage protocol and DAP constraint compilation.
//!
//! Supports:
//! - GetCoverage requests in KVP and XML encodings
//! - Dimension trims and slices, value based or array-index based
//! - Range subsetting, scaling and interpolation extensions
//! - Compilation to DAP2 constraint expressions (`grid()`, `scale_grid()`)

pub mod constraint;
pub mod coverage;
pub mod eo;
pub mod format;
pub mod kvp;
pub mod request;
pub mod scale;
pub mod subset;

pub use constraint::{encode_constraint, ConstraintCompiler, SubsetMap};
pub use coverage::{CoordinateRole, CoverageDescription, DomainCoordinate, Field};
pub use eo::EODatasetSeries;
pub use format::{data_access_url, ResponseFormat};
pub use kvp::KvpParams;
pub use request::{GetCoverageRequest, MULTIPART_MEDIA_TYPE};
pub use scale::{ScaleMode, ScaleRequest};
pub use subset::{DimensionSubset, SubsetKind, TemporalSubset, WILDCARD};
