//! Failure classification, retry decisions and degraded mode.

use crate::{BackoffCalculator, BackoffConfig};
use chronicler_core::{Clock, RandomSource};
use chronicler_error::{ErrorCategory, ProviderError, RetryableError};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Error-handling policy.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(default)]
pub struct RecoveryConfig {
    /// Retries allowed after the initial attempt
    #[serde(default = "default_max_retries")]
    max_retries: u32,

    /// Resolve exhausted requests with the offline provider instead of failing
    #[serde(default = "default_fallback_to_offline")]
    fallback_to_offline: bool,

    /// Number of recent outcomes the error rate is computed over
    #[serde(default = "default_error_window")]
    error_window: usize,

    /// Error rate above which degraded mode is entered
    #[serde(default = "default_error_rate_threshold")]
    error_rate_threshold: f64,

    /// Outcomes required in the window before the rate is trusted
    #[serde(default = "default_min_window_samples")]
    min_window_samples: usize,

    /// Consecutive errors that enter degraded mode regardless of rate
    #[serde(default = "default_consecutive_error_limit")]
    consecutive_error_limit: u32,

    /// How long degraded mode lasts before the primary is probed again
    #[serde(default = "default_degraded_cooldown_secs")]
    degraded_cooldown_secs: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_fallback_to_offline() -> bool {
    true
}

fn default_error_window() -> usize {
    20
}

fn default_error_rate_threshold() -> f64 {
    0.5
}

fn default_min_window_samples() -> usize {
    5
}

fn default_consecutive_error_limit() -> u32 {
    5
}

fn default_degraded_cooldown_secs() -> u64 {
    60
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            fallback_to_offline: default_fallback_to_offline(),
            error_window: default_error_window(),
            error_rate_threshold: default_error_rate_threshold(),
            min_window_samples: default_min_window_samples(),
            consecutive_error_limit: default_consecutive_error_limit(),
            degraded_cooldown_secs: default_degraded_cooldown_secs(),
        }
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Retry once the delay has passed
    RetryLater(Duration),
    /// Retry without waiting
    RetryImmediately,
    /// Stop trying providers and resolve with the offline fallback
    UseFallback,
    /// Stop trying; the failure is terminal
    Fail,
}

/// One entry in the recent-errors window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Failure category
    pub category: ErrorCategory,
    /// Zero-based attempt that failed
    pub attempt_number: u32,
    /// Whether the failure was considered transient
    pub is_retryable: bool,
    /// Clock reading when the failure was recorded
    pub at: Duration,
}

/// Decides retry versus fallback versus failure, and tracks degraded mode.
///
/// Degraded mode is entered when the error rate over the recent window
/// exceeds the threshold or too many errors arrive back to back. While
/// degraded, callers route straight to the offline fallback. Once the
/// cooldown elapses the next call probes the network again: a success
/// clears the condition, a failure re-enters degraded mode at once.
#[derive(Debug, Clone)]
pub struct ErrorRecoveryManager {
    config: RecoveryConfig,
    backoff: BackoffCalculator,
    clock: Arc<dyn Clock>,
    outcomes: VecDeque<bool>,
    recent_errors: VecDeque<ErrorRecord>,
    consecutive_errors: u32,
    degraded_until: Option<Duration>,
    probing: bool,
    total_errors: u64,
    degraded_entries: u64,
}

impl ErrorRecoveryManager {
    /// Create a manager.
    #[instrument(skip_all, fields(max_retries = config.max_retries))]
    pub fn new(config: RecoveryConfig, backoff: BackoffConfig, clock: Arc<dyn Clock>) -> Self {
        debug!("Creating error recovery manager");
        Self {
            outcomes: VecDeque::with_capacity(config.error_window),
            recent_errors: VecDeque::with_capacity(config.error_window),
            config,
            backoff: BackoffCalculator::new(backoff),
            clock,
            consecutive_errors: 0,
            degraded_until: None,
            probing: false,
            total_errors: 0,
            degraded_entries: 0,
        }
    }

    /// Active policy.
    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    /// Backoff calculator used for `RetryLater` delays.
    pub fn backoff(&self) -> &BackoffCalculator {
        &self.backoff
    }

    /// Record a failed attempt and decide what happens next.
    ///
    /// `attempt_number` is zero-based. A jittered delay draws from `random`
    /// only when the decision is `RetryLater`.
    #[instrument(skip(self, error, random), fields(category = %error.category()))]
    pub fn handle_error(
        &mut self,
        error: &ProviderError,
        attempt_number: u32,
        random: &mut dyn RandomSource,
    ) -> RecoveryAction {
        let retryable = error.is_retryable();
        self.record_error(ErrorRecord {
            category: error.category(),
            attempt_number,
            is_retryable: retryable,
            at: self.clock.now(),
        });

        if !retryable {
            warn!(error = %error.kind, "Non-retryable failure");
            return RecoveryAction::Fail;
        }

        if self.is_degraded() || attempt_number >= self.config.max_retries {
            return self.exhausted_action();
        }

        if attempt_number == 0
            && matches!(
                error.category(),
                ErrorCategory::InvalidResponse | ErrorCategory::Parse
            )
        {
            debug!("Malformed payload on first attempt, retrying immediately");
            return RecoveryAction::RetryImmediately;
        }

        let delay = self.backoff.calculate_delay(attempt_number, random);
        debug!(delay_ms = delay.as_millis() as u64, "Scheduling retry");
        RecoveryAction::RetryLater(delay)
    }

    /// Action once retries are spent (or skipped because of degraded mode).
    pub fn exhausted_action(&self) -> RecoveryAction {
        if self.config.fallback_to_offline {
            RecoveryAction::UseFallback
        } else {
            RecoveryAction::Fail
        }
    }

    /// Record a successful network call.
    pub fn record_success(&mut self) {
        self.push_outcome(true);
        self.consecutive_errors = 0;
        if self.probing {
            info!("Probe succeeded, leaving degraded mode");
            self.probing = false;
        }
    }

    fn record_error(&mut self, record: ErrorRecord) {
        self.total_errors += 1;
        self.consecutive_errors += 1;
        self.push_outcome(false);
        if self.recent_errors.len() >= self.config.error_window.max(1) {
            self.recent_errors.pop_front();
        }
        self.recent_errors.push_back(record);

        if self.degraded_until.is_some() {
            return;
        }
        if self.probing {
            warn!("Probe failed, re-entering degraded mode");
            self.enter_degraded();
            return;
        }

        let rate = self.error_rate();
        let rate_tripped = self.outcomes.len() >= self.config.min_window_samples
            && rate > self.config.error_rate_threshold;
        let streak_tripped = self.consecutive_errors >= self.config.consecutive_error_limit;
        if rate_tripped || streak_tripped {
            warn!(
                error_rate = rate,
                consecutive = self.consecutive_errors,
                "Error threshold crossed, entering degraded mode"
            );
            self.enter_degraded();
        }
    }

    fn push_outcome(&mut self, success: bool) {
        if self.outcomes.len() >= self.config.error_window.max(1) {
            self.outcomes.pop_front();
        }
        self.outcomes.push_back(success);
    }

    fn enter_degraded(&mut self) {
        let cooldown = Duration::from_secs(self.config.degraded_cooldown_secs);
        self.degraded_until = Some(self.clock.now() + cooldown);
        self.probing = false;
        self.degraded_entries += 1;
        info!(
            cooldown_secs = self.config.degraded_cooldown_secs,
            "Degraded mode active, routing calls to offline fallback"
        );
    }

    /// Whether calls should bypass the network right now.
    ///
    /// Expires the cooldown as a side effect, arming a probe.
    pub fn is_degraded(&mut self) -> bool {
        match self.degraded_until {
            Some(until) if self.clock.now() >= until => {
                info!("Degraded cooldown elapsed, probing primary provider");
                self.degraded_until = None;
                self.probing = true;
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Time left in degraded mode, if active.
    pub fn degraded_remaining(&self) -> Option<Duration> {
        self.degraded_until
            .map(|until| until.saturating_sub(self.clock.now()))
    }

    /// Share of failures among the recent outcomes.
    pub fn error_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        let errors = self.outcomes.iter().filter(|ok| !**ok).count();
        errors as f64 / self.outcomes.len() as f64
    }

    /// Most recent failures, oldest first.
    pub fn recent_errors(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.recent_errors.iter()
    }

    /// Current run of back-to-back failures.
    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    /// Failures recorded since construction.
    pub fn total_errors(&self) -> u64 {
        self.total_errors
    }

    /// Times degraded mode has been entered.
    pub fn degraded_entries(&self) -> u64 {
        self.degraded_entries
    }
}
