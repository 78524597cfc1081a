//! Earth Observation dataset series: named groups of coverages.

use wcs_common::{BoundingBox, WcsResult};

use crate::coverage::CoverageDescription;

#[derive(Debug, Clone, PartialEq)]
pub struct EODatasetSeries {
    id: String,
    members: Vec<CoverageDescription>,
}

impl EODatasetSeries {
    pub fn new(id: impl Into<String>, members: Vec<CoverageDescription>) -> Self {
        Self {
            id: id.into(),
            members,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn members(&self) -> &[CoverageDescription] {
        &self.members
    }

    pub fn member_ids(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.coverage_id()).collect()
    }

    /// Union of the members' bounding boxes.
    ///
    /// The first member with a box seeds the envelope; later members can only
    /// extend it. Members without a box are skipped.
    pub fn bounding_box(&self) -> WcsResult<Option<BoundingBox>> {
        let mut envelope: Option<BoundingBox> = None;

        for bbox in self.members.iter().filter_map(|m| m.bounding_box()) {
            envelope = Some(match envelope {
                Some(acc) => acc.union(bbox)?,
                None => bbox.clone(),
            });
        }

        Ok(envelope)
    }
}
