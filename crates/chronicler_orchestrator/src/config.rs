//! Aggregated session configuration.
//!
//! Configuration is layered with the `config` crate:
//! - Bundled defaults (include_str! from chronicler.toml)
//! - User overrides (~/.config/chronicler/chronicler.toml, then ./chronicler.toml)
//! - Later sources override earlier ones key by key

use crate::{FailoverConfig, QueueConfig};
use chronicler_cache::CacheConfig;
use chronicler_error::{ChroniclerError, ChroniclerResult, ConfigError};
use chronicler_models::ProviderConfig;
use chronicler_rate_limit::{BackoffConfig, RateLimitConfig, RecoveryConfig};
use chronicler_replay::{ReplayConfig, ReplayMode};
use chronicler_usage::{BudgetConfig, ModelPricing};
use config::{Config, File, FileFormat};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, instrument};

/// Mapping between simulation ticks and clock time.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(default)]
pub struct TimingConfig {
    /// Clock time covered by one tick
    #[serde(default = "default_tick_duration_ms")]
    tick_duration_ms: u64,
}

fn default_tick_duration_ms() -> u64 {
    1000
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_duration_ms: default_tick_duration_ms(),
        }
    }
}

impl TimingConfig {
    /// Clock reading at the start of `tick`.
    pub fn clock_at(&self, tick: u64) -> Duration {
        Duration::from_millis(tick.saturating_mul(self.tick_duration_ms))
    }

    /// Whole ticks needed to cover `delay`, rounded up.
    pub fn ticks_for(&self, delay: Duration) -> u64 {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        millis.div_ceil(self.tick_duration_ms.max(1))
    }
}

/// Per-model token pricing, one `[[pricing]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingEntry {
    /// Model identifier as reported by the provider
    pub model: String,
    /// USD per 1000 prompt tokens
    pub input_per_1k: f64,
    /// USD per 1000 completion tokens
    pub completion_per_1k: f64,
}

impl PricingEntry {
    /// The rates as a [`ModelPricing`].
    pub fn pricing(&self) -> ModelPricing {
        ModelPricing::new(self.input_per_1k, self.completion_per_1k)
    }
}

/// Everything a simulation session is configured with.
///
/// # Example
///
/// ```
/// use chronicler_orchestrator::ChroniclerConfig;
///
/// let config: ChroniclerConfig = toml::from_str(
///     r#"
///     [rate_limit]
///     requests_per_minute = 30
///
///     [[providers]]
///     name = "local"
///     model = "village-7b"
///     endpoint = "http://localhost:8080/v1/chat/completions"
///     "#,
/// )
/// .unwrap();
/// assert_eq!(*config.rate_limit().requests_per_minute(), 30);
/// assert_eq!(*config.recovery().max_retries(), 3);
/// assert!(config.validate().is_ok());
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Default,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct ChroniclerConfig {
    /// Tick to clock mapping
    #[serde(default)]
    timing: TimingConfig,

    /// Provider-wide token bucket
    #[serde(default)]
    rate_limit: RateLimitConfig,

    /// Retry delays
    #[serde(default)]
    backoff: BackoffConfig,

    /// Retry, fallback and degraded-mode policy
    #[serde(default)]
    recovery: RecoveryConfig,

    /// Provider health policy
    #[serde(default)]
    failover: FailoverConfig,

    /// Lane capacities and timeouts
    #[serde(default)]
    queue: QueueConfig,

    /// Response cache
    #[serde(default)]
    cache: CacheConfig,

    /// Spending ceiling
    #[serde(default)]
    budget: BudgetConfig,

    /// Token prices per model
    #[serde(default)]
    pricing: Vec<PricingEntry>,

    /// Recording and playback
    #[serde(default)]
    replay: ReplayConfig,

    /// Network providers in failover order
    #[serde(default)]
    providers: Vec<ProviderConfig>,
}

impl ChroniclerConfig {
    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> ChroniclerResult<Self> {
        debug!("Loading configuration from file");

        Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                ChroniclerError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                ChroniclerError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }

    /// Load configuration with precedence: current dir > home dir > bundled defaults.
    ///
    /// User config files are optional and silently skipped if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if a present file cannot be parsed.
    #[instrument]
    pub fn load() -> ChroniclerResult<Self> {
        debug!("Loading configuration with precedence: current dir > home dir > bundled defaults");

        const DEFAULT_CONFIG: &str = include_str!("../../../chronicler.toml");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/chronicler/chronicler.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("chronicler").required(false));

        builder
            .build()
            .map_err(|e| {
                ChroniclerError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                ChroniclerError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }

    /// Reject configurations no session can run with.
    ///
    /// # Errors
    ///
    /// Returns the first problem found: no providers, duplicate provider
    /// names, a zero capacity or tick length, out-of-range thresholds, or
    /// replay mode without a log path.
    #[track_caller]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.providers.is_empty() {
            return Err(ConfigError::new("No providers configured"));
        }
        let mut names = HashSet::new();
        for provider in &self.providers {
            provider.validate()?;
            if !names.insert(provider.name().as_str()) {
                return Err(ConfigError::new(format!(
                    "Provider '{}' is configured twice",
                    provider.name()
                )));
            }
        }

        if self.timing.tick_duration_ms == 0 {
            return Err(ConfigError::new("tick_duration_ms must be greater than 0"));
        }
        if *self.rate_limit.requests_per_minute() == 0 {
            return Err(ConfigError::new(
                "requests_per_minute must be greater than 0",
            ));
        }

        let backoff = &self.backoff;
        if backoff.base_delay_ms() > backoff.max_delay_ms() {
            return Err(ConfigError::new(format!(
                "base_delay_ms ({}) exceeds max_delay_ms ({})",
                backoff.base_delay_ms(),
                backoff.max_delay_ms()
            )));
        }
        if !(0.0..=1.0).contains(backoff.jitter_factor()) {
            return Err(ConfigError::new(format!(
                "jitter_factor must be in [0.0, 1.0], got {}",
                backoff.jitter_factor()
            )));
        }

        let recovery = &self.recovery;
        if !(0.0..=1.0).contains(recovery.error_rate_threshold()) {
            return Err(ConfigError::new(format!(
                "error_rate_threshold must be in [0.0, 1.0], got {}",
                recovery.error_rate_threshold()
            )));
        }
        if *recovery.error_window() == 0 || *recovery.consecutive_error_limit() == 0 {
            return Err(ConfigError::new(
                "error_window and consecutive_error_limit must be greater than 0",
            ));
        }
        if *self.failover.failure_threshold() == 0 {
            return Err(ConfigError::new("failure_threshold must be greater than 0"));
        }

        let queue = &self.queue;
        if *queue.global_capacity() == 0 || *queue.dispatch_per_tick() == 0 {
            return Err(ConfigError::new(
                "global_capacity and dispatch_per_tick must be greater than 0",
            ));
        }
        if *self.cache.enabled() && *self.cache.capacity() == 0 {
            return Err(ConfigError::new("cache capacity must be greater than 0"));
        }

        self.budget.validate()?;
        for entry in &self.pricing {
            if entry.input_per_1k < 0.0 || entry.completion_per_1k < 0.0 {
                return Err(ConfigError::new(format!(
                    "Pricing for '{}' must not be negative",
                    entry.model
                )));
            }
        }

        if *self.replay.mode() == ReplayMode::Replay && self.replay.log_path().is_none() {
            return Err(ConfigError::new("Replay mode requires replay.log_path"));
        }
        Ok(())
    }

    /// Pricing for a model, if configured.
    pub fn pricing_for(&self, model: &str) -> Option<ModelPricing> {
        self.pricing
            .iter()
            .find(|entry| entry.model == model)
            .map(PricingEntry::pricing)
    }

    /// Tier limit of a named provider, if configured.
    pub fn provider_rpm(&self, name: &str) -> Option<u32> {
        self.providers
            .iter()
            .find(|provider| provider.name() == name)
            .and_then(|provider| *provider.rpm())
    }
}
