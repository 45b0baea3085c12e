//! Aggregated usage and its JSON export.

use crate::{BudgetConfig, UsageResult};
use chrono::{DateTime, Utc};
use chronicler_core::{CallType, TokenUsage};
use chronicler_error::{UsageError, UsageErrorKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Running totals for one slice of the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageAggregate {
    /// Calls recorded
    pub calls: u64,
    /// Calls that produced a response
    pub successes: u64,
    /// Calls that failed
    pub failures: u64,
    /// Prompt tokens
    pub input_tokens: u64,
    /// Completion tokens
    pub completion_tokens: u64,
    /// Cost in USD
    pub cost_usd: f64,
}

impl UsageAggregate {
    /// Fold one call into the totals.
    pub fn add(&mut self, usage: TokenUsage, cost_usd: f64, was_successful: bool) {
        self.calls += 1;
        if was_successful {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
        self.input_tokens += usage.input_tokens;
        self.completion_tokens += usage.completion_tokens;
        self.cost_usd += cost_usd;
    }

    /// Prompt plus completion tokens.
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.completion_tokens
    }
}

/// Snapshot of a session's usage, suitable for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageReport {
    /// When the snapshot was taken
    pub generated_at: DateTime<Utc>,
    /// Budget in force
    pub budget: BudgetConfig,
    /// Whole-session totals
    pub totals: UsageAggregate,
    /// Totals per model
    pub by_model: BTreeMap<String, UsageAggregate>,
    /// Totals per call-type
    pub by_call_type: BTreeMap<CallType, UsageAggregate>,
    /// Whether cumulative cost exceeds the ceiling
    pub budget_exceeded: bool,
}

impl UsageReport {
    /// Write the report as pretty JSON, replacing any existing file atomically.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save_json(&self, path: impl AsRef<Path>) -> UsageResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| UsageError::new(UsageErrorKind::Serialization(e.to_string())))?;

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, json).map_err(|e| {
            UsageError::new(UsageErrorKind::Io(format!(
                "write {}: {}",
                temp_path.display(),
                e
            )))
        })?;
        std::fs::rename(&temp_path, path).map_err(|e| {
            UsageError::new(UsageErrorKind::Io(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            )))
        })?;

        tracing::info!(total_cost = self.totals.cost_usd, "Saved usage report");
        Ok(())
    }

    /// Read a report written by [`Self::save_json`].
    pub fn load_json(path: impl AsRef<Path>) -> UsageResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            UsageError::new(UsageErrorKind::Io(format!("read {}: {}", path.display(), e)))
        })?;
        serde_json::from_str(&json)
            .map_err(|e| UsageError::new(UsageErrorKind::Serialization(e.to_string())))
    }
}
