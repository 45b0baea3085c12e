//! Metrics for LLM calls.
//!
//! Provides OpenTelemetry-based counters for requests, failures, latency,
//! token usage and cost across every provider in the failover chain.

use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram, Meter},
};
use std::sync::OnceLock;

static METRICS: OnceLock<LlmMetrics> = OnceLock::new();

/// Metrics for LLM interactions.
///
/// Labeled with provider name, model and call-type. The offline fallback is
/// reported like any other provider under the name `offline`.
#[derive(Clone)]
pub struct LlmMetrics {
    /// Meter handle kept alive for metric instruments
    _meter: Meter,
    /// Total LLM requests that produced a response
    pub requests: Counter<u64>,
    /// Failed LLM attempts
    pub errors: Counter<u64>,
    /// LLM call duration in seconds
    pub duration: Histogram<f64>,
    /// Prompt tokens used
    pub prompt_tokens: Counter<u64>,
    /// Completion tokens used
    pub completion_tokens: Counter<u64>,
    /// Accumulated cost in USD
    pub cost: Counter<f64>,
}

impl std::fmt::Debug for LlmMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmMetrics").finish_non_exhaustive()
    }
}

impl LlmMetrics {
    fn init() -> Self {
        let meter = global::meter("chronicler_llm");

        Self {
            _meter: meter.clone(),
            requests: meter
                .u64_counter("llm.requests")
                .with_description("Total LLM requests")
                .build(),
            errors: meter
                .u64_counter("llm.errors")
                .with_description("Failed LLM attempts")
                .build(),
            duration: meter
                .f64_histogram("llm.duration")
                .with_unit("seconds")
                .with_description("LLM call duration")
                .build(),
            prompt_tokens: meter
                .u64_counter("llm.tokens.prompt")
                .with_description("Prompt tokens used")
                .build(),
            completion_tokens: meter
                .u64_counter("llm.tokens.completion")
                .with_description("Completion tokens used")
                .build(),
            cost: meter
                .f64_counter("llm.cost")
                .with_unit("USD")
                .with_description("Accumulated LLM cost")
                .build(),
        }
    }

    /// Get the global LLM metrics instance.
    pub fn get() -> &'static Self {
        METRICS.get_or_init(Self::init)
    }

    /// Record a request that produced a response.
    pub fn record_request(&self, provider: &str, call_type: &str, duration_secs: f64) {
        let labels = &[
            KeyValue::new("provider", provider.to_string()),
            KeyValue::new("call_type", call_type.to_string()),
        ];
        self.requests.add(1, labels);
        self.duration.record(duration_secs, labels);
    }

    /// Record a failed attempt, labeled with its error category.
    pub fn record_error(&self, provider: &str, call_type: &str, category: &str) {
        let labels = &[
            KeyValue::new("provider", provider.to_string()),
            KeyValue::new("call_type", call_type.to_string()),
            KeyValue::new("error_type", category.to_string()),
        ];
        self.errors.add(1, labels);
    }

    /// Record token usage and cost for one ledger entry.
    pub fn record_usage(
        &self,
        model: &str,
        call_type: &str,
        prompt_tokens: u64,
        completion_tokens: u64,
        cost_usd: f64,
    ) {
        let labels = &[
            KeyValue::new("model", model.to_string()),
            KeyValue::new("call_type", call_type.to_string()),
        ];
        self.prompt_tokens.add(prompt_tokens, labels);
        self.completion_tokens.add(completion_tokens, labels);
        self.cost.add(cost_usd, labels);
    }
}

impl Default for LlmMetrics {
    fn default() -> Self {
        Self::get().clone()
    }
}
