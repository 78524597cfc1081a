//! Coverage id to backend endpoint resolution.

use std::collections::BTreeMap;

use wcs_common::{WcsError, WcsResult};

/// A coverage id matched to the service that serves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDataset {
    /// The matching service prefix.
    pub prefix: String,
    /// The backend dataset URL for the coverage.
    pub dataset_url: String,
}

/// Maps coverage id prefixes to backend base URLs.
///
/// The table is fixed at construction. The longest matching prefix wins.
#[derive(Debug, Clone, Default)]
pub struct PrefixResolver {
    services: BTreeMap<String, String>,
}

impl PrefixResolver {
    pub fn new<I, P, U>(services: I) -> Self
    where
        I: IntoIterator<Item = (P, U)>,
        P: Into<String>,
        U: Into<String>,
    {
        Self {
            services: services
                .into_iter()
                .map(|(p, u)| (p.into(), u.into()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// The longest prefix of `coverage_id`, if any service matches.
    pub fn matching_prefix(&self, coverage_id: &str) -> Option<&str> {
        let mut best: Option<&str> = None;
        // Ascending key order, so on equal length the first (smallest) name is kept.
        for prefix in self.services.keys() {
            if coverage_id.starts_with(prefix.as_str())
                && best.map_or(true, |b| prefix.len() > b.len())
            {
                best = Some(prefix);
            }
        }
        best
    }

    /// Resolve `coverage_id` to its dataset URL.
    pub fn resolve(&self, coverage_id: &str) -> WcsResult<ResolvedDataset> {
        let prefix = self.matching_prefix(coverage_id).ok_or_else(|| {
            WcsError::NotFound(format!(
                "No service is configured for coverage '{}'",
                coverage_id
            ))
        })?;

        let base = &self.services[prefix];
        Ok(ResolvedDataset {
            prefix: prefix.to_string(),
            dataset_url: format!("{}{}", base, &coverage_id[prefix.len()..]),
        })
    }
}
