//! Retry delay calculation.

use chronicler_core::RandomSource;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::trace;

/// How the delay grows with the attempt number.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BackoffStrategy {
    /// `base * 2^attempt`
    #[default]
    Exponential,
    /// `base * (attempt + 1)`
    Linear,
    /// `base`
    Fixed,
}

/// Backoff tuning.
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
pub struct BackoffConfig {
    /// Growth strategy
    #[serde(default)]
    strategy: BackoffStrategy,

    /// Delay for attempt 0, in milliseconds
    #[serde(default = "default_base_delay_ms")]
    base_delay_ms: u64,

    /// Ceiling for any computed delay, in milliseconds
    #[serde(default = "default_max_delay_ms")]
    max_delay_ms: u64,

    /// Whether to spread delays randomly
    #[serde(default = "default_jitter")]
    jitter: bool,

    /// Spread as a fraction of the delay; the delay moves by up to ± this share
    #[serde(default = "default_jitter_factor")]
    jitter_factor: f64,
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_jitter() -> bool {
    true
}

fn default_jitter_factor() -> f64 {
    0.1
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            strategy: BackoffStrategy::default(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
            jitter_factor: default_jitter_factor(),
        }
    }
}

/// Computes retry delays.
///
/// Attempt numbers are zero-based: the first retry after the initial failure
/// waits `calculate_delay(0)`, which is always the base delay before jitter.
///
/// # Example
///
/// ```
/// use chronicler_core::ScriptedRandom;
/// use chronicler_rate_limit::{BackoffCalculator, BackoffConfig, BackoffStrategy};
/// use std::time::Duration;
///
/// let config = BackoffConfig::default()
///     .with_strategy(BackoffStrategy::Linear)
///     .with_jitter(false);
/// let calculator = BackoffCalculator::new(config);
/// let mut random = ScriptedRandom::new(vec![]);
/// assert_eq!(calculator.calculate_delay(2, &mut random), Duration::from_millis(3000));
/// ```
#[derive(Debug, Clone, Default)]
pub struct BackoffCalculator {
    config: BackoffConfig,
}

impl BackoffCalculator {
    /// Create a calculator.
    pub fn new(config: BackoffConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }

    /// Delay in milliseconds before jitter, capped at `max_delay_ms`.
    pub fn nominal_delay_ms(&self, attempt: u32) -> u64 {
        let base = self.config.base_delay_ms;
        let raw = match self.config.strategy {
            BackoffStrategy::Exponential => {
                let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
                base.saturating_mul(factor)
            }
            BackoffStrategy::Linear => base.saturating_mul(u64::from(attempt) + 1),
            BackoffStrategy::Fixed => base,
        };
        raw.min(self.config.max_delay_ms)
    }

    /// Delay before retrying after attempt `attempt` failed.
    ///
    /// When jitter is enabled exactly one value is drawn from `random`;
    /// otherwise `random` is left untouched.
    pub fn calculate_delay(&self, attempt: u32, random: &mut dyn RandomSource) -> Duration {
        let nominal = self.nominal_delay_ms(attempt);
        if !self.config.jitter || self.config.jitter_factor <= 0.0 {
            return Duration::from_millis(nominal);
        }

        let spread = nominal as f64 * self.config.jitter_factor;
        let offset = spread * (2.0 * random.next_unit() - 1.0);
        let jittered = (nominal as f64 + offset)
            .round()
            .clamp(0.0, self.config.max_delay_ms as f64) as u64;
        trace!(attempt, nominal, jittered, "Computed backoff delay");
        Duration::from_millis(jittered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn huge_attempt_numbers_saturate_at_cap() {
        let calculator = BackoffCalculator::new(BackoffConfig::default().with_jitter(false));
        assert_eq!(calculator.nominal_delay_ms(64), 30_000);
        assert_eq!(calculator.nominal_delay_ms(u32::MAX), 30_000);
    }
}
