//! Constraint-expression compiler.
//!
//! Turns a field selection, a set of dimension subsets and an optional scale
//! request into the DAP constraint expression that selects the same data
//! from the backend, e.g. `grid(T,"-10<=lat<=10")` or `T[5][*][*]`.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::collections::BTreeMap;
use tracing::debug;

use wcs_common::{WcsError, WcsResult};

use crate::coverage::{CoverageDescription, Field};
use crate::scale::ScaleRequest;
use crate::subset::{DimensionSubset, TemporalSubset};

/// Everything except ASCII alphanumerics and `-_.*` is escaped.
const CE_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'*');

/// Subsets keyed by dimension name. Dimensions without an entry are unconstrained.
pub type SubsetMap = BTreeMap<String, DimensionSubset>;

/// Percent-encode a raw constraint expression for use in a query string.
pub fn encode_constraint(raw: &str) -> String {
    utf8_percent_encode(raw, CE_ENCODE_SET).to_string()
}

/// Compiles requests against one coverage.
#[derive(Debug, Clone, Copy)]
pub struct ConstraintCompiler<'a> {
    coverage: &'a CoverageDescription,
}

impl<'a> ConstraintCompiler<'a> {
    pub fn new(coverage: &'a CoverageDescription) -> Self {
        Self { coverage }
    }

    /// Compile and percent-encode.
    pub fn compile(
        &self,
        fields: &[String],
        subsets: &SubsetMap,
        scale: Option<&ScaleRequest>,
    ) -> WcsResult<String> {
        Ok(encode_constraint(&self.compile_unencoded(fields, subsets, scale)?))
    }

    /// Compile to the raw expression. An empty field list selects every field.
    pub fn compile_unencoded(
        &self,
        fields: &[String],
        subsets: &SubsetMap,
        scale: Option<&ScaleRequest>,
    ) -> WcsResult<String> {
        self.check_subsets(subsets)?;
        let fields = self.resolve_fields(fields)?;
        let scale = scale.filter(|s| s.is_active());

        let clauses = fields
            .iter()
            .map(|field| self.field_clause(field, subsets, scale))
            .collect::<WcsResult<Vec<_>>>()?;

        let expression = clauses.join(",");
        debug!(
            coverage = self.coverage.coverage_id(),
            expression = %expression,
            "Compiled constraint expression"
        );
        Ok(expression)
    }

    fn check_subsets(&self, subsets: &SubsetMap) -> WcsResult<()> {
        for (dimension, subset) in subsets {
            if dimension != subset.dimension_id() {
                return Err(WcsError::Internal(format!(
                    "Subset for '{}' filed under '{}'",
                    subset.dimension_id(),
                    dimension
                )));
            }
            if self.coverage.domain_coordinate(dimension).is_none() {
                return Err(WcsError::invalid(
                    "subset",
                    format!(
                        "Bad subsetting request. A subset was requested for dimension '{}', which is not a domain coordinate of coverage '{}'. Valid coordinate dimension names for '{}' are: {}",
                        dimension,
                        self.coverage.coverage_id(),
                        self.coverage.coverage_id(),
                        self.coverage.coordinate_names().join(", ")
                    ),
                ));
            }
        }
        Ok(())
    }

    fn resolve_fields(&self, requested: &[String]) -> WcsResult<Vec<&'a Field>> {
        if requested.is_empty() {
            return Ok(self.coverage.fields().iter().collect());
        }

        requested
            .iter()
            .map(|name| {
                self.coverage.field(name).ok_or_else(|| {
                    WcsError::invalid(
                        "RangeSubset",
                        format!(
                            "Coverage '{}' has no field named '{}'. Valid field names are: {}",
                            self.coverage.coverage_id(),
                            name,
                            self.coverage
                                .fields()
                                .iter()
                                .map(|f| f.name.as_str())
                                .collect::<Vec<_>>()
                                .join(", ")
                        ),
                    )
                })
            })
            .collect()
    }

    fn field_clause(
        &self,
        field: &Field,
        subsets: &SubsetMap,
        scale: Option<&ScaleRequest>,
    ) -> WcsResult<String> {
        let coordinates = self.coverage.domain_coordinates();

        let mut value_constraints = Vec::new();
        let mut array_clauses: Vec<Option<String>> = Vec::with_capacity(coordinates.len());

        // Storage order, not request order.
        for coord in coordinates {
            match subsets.get(&coord.name) {
                Some(subset) if subset.is_array_index() => {
                    array_clauses.push(subset.array_index_constraint());
                }
                Some(subset) => {
                    let constraint = if coord.is_time() {
                        TemporalSubset::new(subset, &coord.units)
                            .value_constraint(&coord.backend_variable_id)?
                    } else {
                        subset.value_constraint(&coord.backend_variable_id)
                    };
                    value_constraints.push(constraint);
                    array_clauses.push(None);
                }
                None => array_clauses.push(None),
            }
        }

        let mut clause = field.backend_variable_id.clone();
        if array_clauses.iter().any(Option::is_some) {
            for array in &array_clauses {
                clause.push_str(array.as_deref().unwrap_or("[*]"));
            }
        }

        if !value_constraints.is_empty() {
            clause = format!("grid({},{})", clause, value_constraints.join(","));
        }

        match scale {
            Some(scale) => scale.scale_expression(&clause, coordinates),
            None => Ok(clause),
        }
    }
}
