//! The usage ledger.

use crate::{BudgetConfig, LlmMetrics, ModelPricing, UsageAggregate, UsageReport, UsageResult};
use chrono::{DateTime, Utc};
use chronicler_core::{CallType, TokenUsage};
use chronicler_error::{UsageError, UsageErrorKind};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, instrument, warn};

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct UsageEntry {
    timestamp: DateTime<Utc>,
    model_name: String,
    call_type: CallType,
    input_tokens: u64,
    completion_tokens: u64,
    cost_usd: f64,
    was_successful: bool,
}

/// Append-only usage ledger with incrementally maintained aggregates.
///
/// Aggregates are updated on every [`record_usage`](Self::record_usage) and
/// are never recomputed from the ledger; [`reset`](Self::reset) is the only
/// way to start over.
///
/// # Examples
///
/// ```
/// use chronicler_core::CallType;
/// use chronicler_usage::{BudgetConfig, ModelPricing, UsageTracker};
///
/// let mut tracker = UsageTracker::new(BudgetConfig::default());
/// tracker.register_pricing("village-7b", ModelPricing::new(0.5, 1.5));
///
/// let cost = tracker
///     .record_usage("village-7b", CallType::NpcDialogue, 1000, 1000, true)
///     .unwrap();
/// assert!((cost - 2.0).abs() < 1e-9);
/// assert!(!tracker.is_budget_exceeded());
/// ```
#[derive(Debug, Clone)]
pub struct UsageTracker {
    budget: BudgetConfig,
    pricing: HashMap<String, ModelPricing>,
    ledger: Vec<UsageEntry>,
    totals: UsageAggregate,
    by_model: BTreeMap<String, UsageAggregate>,
    by_call_type: BTreeMap<CallType, UsageAggregate>,
    alert_fired: bool,
    metrics: Option<LlmMetrics>,
}

impl UsageTracker {
    /// Create an empty tracker.
    pub fn new(budget: BudgetConfig) -> Self {
        debug!(
            limit_usd = budget.limit_usd(),
            alert_threshold = budget.alert_threshold(),
            "Creating usage tracker"
        );
        Self {
            budget,
            pricing: HashMap::new(),
            ledger: Vec::new(),
            totals: UsageAggregate::default(),
            by_model: BTreeMap::new(),
            by_call_type: BTreeMap::new(),
            alert_fired: false,
            metrics: None,
        }
    }

    /// Export every recorded call through the global OpenTelemetry meter.
    pub fn with_metrics(mut self, metrics: LlmMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Register or replace the pricing for a model.
    pub fn register_pricing(&mut self, model: impl Into<String>, pricing: ModelPricing) {
        let model = model.into();
        debug!(model = %model, ?pricing, "Registered model pricing");
        self.pricing.insert(model, pricing);
    }

    /// Whether pricing is registered for a model.
    pub fn has_pricing(&self, model: &str) -> bool {
        self.pricing.contains_key(model)
    }

    /// Record one call and return its cost.
    ///
    /// # Errors
    ///
    /// Returns `UnknownModel` if no pricing is registered for `model`; nothing
    /// is recorded in that case.
    #[instrument(skip(self), fields(total_cost = self.totals.cost_usd))]
    pub fn record_usage(
        &mut self,
        model: &str,
        call_type: CallType,
        input_tokens: u64,
        completion_tokens: u64,
        was_successful: bool,
    ) -> UsageResult<f64> {
        let pricing = self
            .pricing
            .get(model)
            .ok_or_else(|| UsageError::new(UsageErrorKind::UnknownModel(model.to_string())))?;

        let usage = TokenUsage::new(input_tokens, completion_tokens);
        let cost_usd = pricing.cost(usage);
        let was_over_threshold = self.is_over_alert_threshold();

        self.ledger.push(UsageEntry {
            timestamp: Utc::now(),
            model_name: model.to_string(),
            call_type,
            input_tokens,
            completion_tokens,
            cost_usd,
            was_successful,
        });
        self.totals.add(usage, cost_usd, was_successful);
        self.by_model
            .entry(model.to_string())
            .or_default()
            .add(usage, cost_usd, was_successful);
        self.by_call_type
            .entry(call_type)
            .or_default()
            .add(usage, cost_usd, was_successful);

        if let Some(metrics) = &self.metrics {
            metrics.record_usage(
                model,
                call_type.as_ref(),
                input_tokens,
                completion_tokens,
                cost_usd,
            );
        }

        debug!(cost_usd, "Recorded usage");
        // Logged once on crossing; the latch is left for the caller
        if !was_over_threshold && self.is_over_alert_threshold() {
            warn!(
                total_cost = self.totals.cost_usd,
                alert_at = self.budget.alert_at_usd(),
                limit = self.budget.limit_usd(),
                "Budget alert threshold crossed"
            );
        }
        Ok(cost_usd)
    }

    /// Whether cumulative cost exceeds the ceiling.
    pub fn is_budget_exceeded(&self) -> bool {
        self.totals.cost_usd > *self.budget.limit_usd()
    }

    /// Whether cumulative cost is at or above the alert threshold.
    pub fn is_over_alert_threshold(&self) -> bool {
        self.totals.cost_usd >= self.budget.alert_at_usd()
    }

    /// True exactly once after cost first reaches the alert threshold.
    ///
    /// Re-armed by [`reset`](Self::reset).
    pub fn should_alert_budget(&mut self) -> bool {
        if self.alert_fired || !self.is_over_alert_threshold() {
            return false;
        }
        self.alert_fired = true;
        true
    }

    /// Clear the ledger, the aggregates and the alert latch. Pricing is kept.
    pub fn reset(&mut self) {
        info!(entries = self.ledger.len(), "Resetting usage tracker");
        self.ledger.clear();
        self.totals = UsageAggregate::default();
        self.by_model.clear();
        self.by_call_type.clear();
        self.alert_fired = false;
    }

    /// Recorded calls, oldest first.
    pub fn ledger(&self) -> &[UsageEntry] {
        &self.ledger
    }

    /// Whole-session totals.
    pub fn totals(&self) -> &UsageAggregate {
        &self.totals
    }

    /// Cumulative cost in USD.
    pub fn total_cost(&self) -> f64 {
        self.totals.cost_usd
    }

    /// Totals for one model.
    pub fn model_usage(&self, model: &str) -> Option<&UsageAggregate> {
        self.by_model.get(model)
    }

    /// Totals for one call-type.
    pub fn call_type_usage(&self, call_type: CallType) -> Option<&UsageAggregate> {
        self.by_call_type.get(&call_type)
    }

    /// Budget in force.
    pub fn budget(&self) -> &BudgetConfig {
        &self.budget
    }

    /// Snapshot the aggregates for export.
    pub fn report(&self) -> UsageReport {
        UsageReport {
            generated_at: Utc::now(),
            budget: self.budget.clone(),
            totals: self.totals,
            by_model: self.by_model.clone(),
            by_call_type: self.by_call_type.clone(),
            budget_exceeded: self.is_budget_exceeded(),
        }
    }
}
