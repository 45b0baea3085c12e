//! Replay log records and persistence.

use crate::ReplayResult;
use chrono::{DateTime, Utc};
use chronicler_core::{CallType, ProviderResponse, TokenUsage};
use chronicler_error::{ProviderError, ProviderErrorKind, ReplayError, ReplayErrorKind};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Outcome of one provider attempt.
///
/// Records are appended in call order and keyed by `(tick, call_type)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    /// Simulation tick of the attempt
    pub tick: u64,
    /// Purpose of the request
    pub call_type: CallType,
    /// Prompt exactly as presented
    pub prompt: String,
    /// Generated text; empty on failure
    pub output: String,
    /// Token counts reported by the provider
    pub usage: TokenUsage,
    /// Call latency in milliseconds
    pub latency_ms: u64,
    /// Provider that answered or failed
    pub provider: String,
    /// Whether the attempt produced text
    pub success: bool,
    /// Zero-based attempt number of the request
    pub attempt_number: u32,
    /// Failure detail when `success` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ProviderErrorKind>,
    /// Random draw used to produce the output, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<u64>,
}

impl CallRecord {
    /// Record a successful attempt.
    pub fn success(
        tick: u64,
        call_type: CallType,
        prompt: impl Into<String>,
        attempt_number: u32,
        provider: impl Into<String>,
        response: &ProviderResponse,
        latency_ms: u64,
    ) -> Self {
        Self {
            tick,
            call_type,
            prompt: prompt.into(),
            output: response.text.clone(),
            usage: response.usage,
            latency_ms,
            provider: provider.into(),
            success: true,
            attempt_number,
            error: None,
            random_seed: None,
        }
    }

    /// Record a failed attempt.
    pub fn failure(
        tick: u64,
        call_type: CallType,
        prompt: impl Into<String>,
        attempt_number: u32,
        provider: impl Into<String>,
        error: &ProviderError,
        latency_ms: u64,
    ) -> Self {
        Self {
            tick,
            call_type,
            prompt: prompt.into(),
            output: String::new(),
            usage: TokenUsage::default(),
            latency_ms,
            provider: provider.into(),
            success: false,
            attempt_number,
            error: Some(error.kind.clone()),
            random_seed: None,
        }
    }

    /// Attach the random draw that selected this output.
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// The recorded outcome, as the provider originally reported it.
    #[track_caller]
    pub fn outcome(&self) -> Result<ProviderResponse, ProviderError> {
        if self.success {
            return Ok(ProviderResponse::new(self.output.clone(), self.usage));
        }
        let kind = self.error.clone().unwrap_or_else(|| {
            ProviderErrorKind::ProviderUnavailable(format!("{} failed", self.provider))
        });
        Err(ProviderError::new(kind))
    }
}

/// One random value consumed during a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomDecisionRecord {
    /// Simulation tick of the draw
    pub tick: u64,
    /// What the value was used for, such as `backoff_jitter`
    pub purpose: String,
    /// Raw drawn value
    pub value: u64,
}

/// A complete recorded session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayLog {
    /// Seed the session was recorded with
    pub seed: u64,
    /// When recording started
    pub created_at: DateTime<Utc>,
    /// Provider attempts in call order
    pub calls: Vec<CallRecord>,
    /// Random draws in consumption order
    pub decisions: Vec<RandomDecisionRecord>,
}

impl ReplayLog {
    /// Start an empty log.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            created_at: Utc::now(),
            calls: Vec::new(),
            decisions: Vec::new(),
        }
    }

    /// Records for one `(tick, call_type)`, in call order.
    pub fn calls_for(&self, tick: u64, call_type: CallType) -> impl Iterator<Item = &CallRecord> {
        self.calls
            .iter()
            .filter(move |record| record.tick == tick && record.call_type == call_type)
    }

    /// Last tick with any recorded activity.
    pub fn last_tick(&self) -> Option<u64> {
        let calls = self.calls.iter().map(|record| record.tick);
        let decisions = self.decisions.iter().map(|record| record.tick);
        calls.chain(decisions).max()
    }

    /// Write the log as JSON, replacing any existing file atomically.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display(), calls = self.calls.len()))]
    pub fn save(&self, path: impl AsRef<Path>) -> ReplayResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ReplayError::new(ReplayErrorKind::Serialization(e.to_string())))?;

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, json).map_err(|e| {
            ReplayError::new(ReplayErrorKind::Io(format!(
                "write {}: {}",
                temp_path.display(),
                e
            )))
        })?;
        std::fs::rename(&temp_path, path).map_err(|e| {
            ReplayError::new(ReplayErrorKind::Io(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            )))
        })?;

        tracing::info!(decisions = self.decisions.len(), "Saved replay log");
        Ok(())
    }

    /// Read a log written by [`Self::save`].
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> ReplayResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ReplayError::new(ReplayErrorKind::Io(format!("read {}: {}", path.display(), e)))
        })?;
        let log: Self = serde_json::from_str(&json)
            .map_err(|e| ReplayError::new(ReplayErrorKind::Serialization(e.to_string())))?;
        tracing::info!(
            seed = log.seed,
            calls = log.calls.len(),
            decisions = log.decisions.len(),
            "Loaded replay log"
        );
        Ok(log)
    }
}
