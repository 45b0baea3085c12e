//! Usage and cost accounting.
//!
//! Every completed call (cache hits excluded) is appended to a ledger and
//! folded into running per-model and per-call-type aggregates. Budget state is
//! advisory: the tracker reports when the ceiling or alert threshold is
//! crossed, and callers decide how to react.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod budget;
mod metrics;
mod pricing;
mod report;
mod tracker;

pub use budget::{BudgetConfig, BudgetConfigBuilder};
pub use metrics::LlmMetrics;
pub use pricing::ModelPricing;
pub use report::{UsageAggregate, UsageReport};
pub use tracker::{UsageEntry, UsageTracker};

/// Result type for usage operations.
pub type UsageResult<T> = Result<T, chronicler_error::UsageError>;
