//! Static cost analysis of operations, and admission control based on it.
//!
//! Costs follow the `@cost` and `@listSize` directives of the schema. They
//! are estimated from the operation alone, before any resolver runs.

mod analyzer;
mod cache;

use std::ops::{Add, AddAssign};

use derive_more::with_trait::{Display, Error};
use serde::{Deserialize, Serialize};

use crate::ast::OperationType;

pub use self::{analyzer::CostAnalyzer, cache::CostCache};

/// Estimated cost of an operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostMetrics {
    /// Weighted number of field resolutions.
    pub field_cost: f64,
    /// Weighted number of materialized values of composite types.
    pub type_cost: f64,
}

impl CostMetrics {
    /// Metrics with both components set.
    pub fn new(field_cost: f64, type_cost: f64) -> Self {
        Self {
            field_cost,
            type_cost,
        }
    }

    /// Component-wise maximum.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        Self::new(
            self.field_cost.max(other.field_cost),
            self.type_cost.max(other.type_cost),
        )
    }

    /// Negative components replaced by zero.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self::new(self.field_cost.max(0.0), self.type_cost.max(0.0))
    }
}

impl Add for CostMetrics {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(
            self.field_cost + rhs.field_cost,
            self.type_cost + rhs.type_cost,
        )
    }
}

impl AddAssign for CostMetrics {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// What is done with the cost of an operation.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerMode {
    /// Costs are computed and logged only.
    Analysis,
    /// Operations over a limit are rejected.
    #[default]
    Enforce,
    /// Operations over a limit are rejected, and costs are reported in the
    /// `cost` extension of every response.
    EnforceAndReport,
    /// Costs are reported without executing the operation.
    ValidateAndReport,
}

impl AnalyzerMode {
    /// Whether operations over a limit are rejected.
    pub fn enforces(self) -> bool {
        matches!(self, Self::Enforce | Self::EnforceAndReport)
    }

    /// Whether costs are reported in the response.
    pub fn reports(self) -> bool {
        matches!(self, Self::EnforceAndReport | Self::ValidateAndReport)
    }

    /// Whether admitted operations are executed.
    pub fn executes(self) -> bool {
        !matches!(self, Self::ValidateAndReport)
    }
}

/// Cost analysis settings.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CostOptions {
    /// What is done with the computed cost.
    pub mode: AnalyzerMode,
    /// Highest admitted [`CostMetrics::field_cost`].
    pub max_field_cost: f64,
    /// Highest admitted [`CostMetrics::type_cost`].
    pub max_type_cost: f64,
    /// Size assumed for lists without a `@listSize` estimate.
    pub default_list_size: u32,
    /// Whether fields and types without `@cost` get the default weights.
    /// Otherwise they weigh nothing.
    pub apply_cost_defaults: bool,
    /// Number of operations whose costs are cached. `0` disables caching.
    pub cache_capacity: u64,
}

impl Default for CostOptions {
    fn default() -> Self {
        Self {
            mode: AnalyzerMode::default(),
            max_field_cost: 1000.0,
            max_type_cost: 1000.0,
            default_list_size: 1,
            apply_cost_defaults: true,
            cache_capacity: 1024,
        }
    }
}

impl CostOptions {
    /// Checks metrics against the limits, if the mode enforces them.
    pub fn admit(&self, metrics: CostMetrics) -> Result<(), CostError> {
        if !self.mode.enforces() {
            return Ok(());
        }
        if metrics.field_cost > self.max_field_cost {
            return Err(CostError::MaxFieldCostReached {
                cost: metrics.field_cost,
                limit: self.max_field_cost,
            });
        }
        if metrics.type_cost > self.max_type_cost {
            return Err(CostError::MaxTypeCostReached {
                cost: metrics.type_cost,
                limit: self.max_type_cost,
            });
        }
        Ok(())
    }
}

/// Error of cost analysis, or rejection of an operation by admission control.
#[derive(Clone, Debug, Display, Error, PartialEq)]
pub enum CostError {
    /// A field requiring exactly one slicing argument got another number.
    #[display(
        "Field \"{field}\" requires exactly one slicing argument, but {supplied} were supplied"
    )]
    RequireOneSlicingArgument {
        /// Schema coordinate of the field.
        field: String,
        /// Number of slicing arguments in the query.
        supplied: usize,
    },

    /// A slicing argument is not an integer argument of its field.
    #[display("Slicing argument \"{argument}\" of field \"{field}\" is not supported")]
    UnsupportedSlicingArgument {
        /// Schema coordinate of the field.
        field: String,
        /// Name of the slicing argument.
        argument: String,
    },

    /// A fragment spreads itself, directly or not.
    #[display("Fragment \"{_0}\" spreads itself")]
    FragmentCycle(#[error(not(source))] String),

    /// A spread fragment is not defined by the document.
    #[display("Unknown fragment \"{_0}\"")]
    UnknownFragment(#[error(not(source))] String),

    /// The schema has no root type for the operation.
    #[display("Schema has no root type for {_0} operations")]
    MissingRootType(#[error(not(source))] OperationType),

    /// The field cost is over its limit.
    #[display("Maximum field cost reached: {cost} exceeds the limit of {limit}")]
    MaxFieldCostReached {
        /// Computed field cost.
        cost: f64,
        /// Configured limit.
        limit: f64,
    },

    /// The type cost is over its limit.
    #[display("Maximum type cost reached: {cost} exceeds the limit of {limit}")]
    MaxTypeCostReached {
        /// Computed type cost.
        cost: f64,
        /// Configured limit.
        limit: f64,
    },
}

impl CostError {
    /// Code reported in the `extensions` of the error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MaxFieldCostReached { .. } => "MAX_FIELD_COST_REACHED",
            Self::MaxTypeCostReached { .. } => "MAX_TYPE_COST_REACHED",
            Self::RequireOneSlicingArgument { .. }
            | Self::UnsupportedSlicingArgument { .. }
            | Self::FragmentCycle(_)
            | Self::UnknownFragment(_)
            | Self::MissingRootType(_) => "COST_ANALYSIS_FAILED",
        }
    }
}
