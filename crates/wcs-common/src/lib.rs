//! Common types and utilities shared across the WCS gateway crates.

pub mod bbox;
pub mod error;
pub mod time;
pub mod xml;

pub use bbox::{BoundingBox, CoordinateDimension, TimePeriod};
pub use error::{WcsError, WcsResult};
pub use time::{epoch_from_units, format_as_units, instant_from_units, parse_time_position};
pub use xml::XmlElement;
