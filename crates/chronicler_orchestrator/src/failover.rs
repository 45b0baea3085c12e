//! Ordered provider failover with an offline terminal step.

use chronicler_core::{CallType, Clock, OFFLINE_PROVIDER_NAME, ProviderResponse};
use chronicler_error::{ProviderError, ProviderErrorKind};
use chronicler_interface::LlmProvider;
use chronicler_models::{OFFLINE_MODEL_NAME, OfflineProvider};
use chronicler_rate_limit::ProviderQuota;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Provider health policy.
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
pub struct FailoverConfig {
    /// Consecutive failures that mark a provider unhealthy
    #[serde(default = "default_failure_threshold")]
    failure_threshold: u32,

    /// How long an unhealthy provider is skipped
    #[serde(default = "default_unhealthy_cooldown_secs")]
    unhealthy_cooldown_secs: u64,
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_unhealthy_cooldown_secs() -> u64 {
    120
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            unhealthy_cooldown_secs: default_unhealthy_cooldown_secs(),
        }
    }
}

/// Health of one provider in the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderHealth {
    /// Provider name
    pub name: String,
    /// Position in the failover order, 0 first
    pub priority_rank: usize,
    /// Current run of back-to-back failures
    pub consecutive_failures: u32,
    /// Whether the provider is being tried
    pub is_healthy: bool,
    /// Clock reading when an unhealthy provider is retried
    #[serde(skip)]
    pub unhealthy_until: Option<Duration>,
    /// Calls attempted
    pub total_calls: u64,
    /// Calls that failed
    pub total_failures: u64,
}

/// A response and who produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSuccess {
    /// Provider name
    pub provider: String,
    /// Model name, for pricing
    pub model: String,
    /// Generated text and usage
    pub response: ProviderResponse,
    /// Wall-clock latency of the call
    pub latency_ms: u64,
}

/// The failure a chain attempt ended with.
#[derive(Debug, Clone)]
pub struct ChainFailure {
    /// Last provider that failed, or the chain itself when none was tried
    pub provider: String,
    /// Failure of the last provider tried
    pub error: ProviderError,
    /// Time spent across the attempt
    pub latency_ms: u64,
}

struct ProviderEntry {
    provider: Arc<dyn LlmProvider>,
    quota: ProviderQuota,
    health: ProviderHealth,
}

impl std::fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("model", &self.provider.model_name())
            .field("quota", &self.quota)
            .field("health", &self.health)
            .finish()
    }
}

/// Providers in priority order plus the offline fallback.
///
/// The chain owns the provider health table. A provider is marked unhealthy
/// after `failure_threshold` consecutive failures and skipped until the
/// cooldown has elapsed, after which it is tried again with a clean record.
/// Calls hold `&mut self`, so at most one call per provider is in flight.
#[derive(Debug)]
pub struct FailoverChain {
    config: FailoverConfig,
    entries: Vec<ProviderEntry>,
    offline: OfflineProvider,
    clock: Arc<dyn Clock>,
}

impl FailoverChain {
    /// Create a chain with only the offline fallback.
    pub fn new(config: FailoverConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            entries: Vec::new(),
            offline: OfflineProvider::new(),
            clock,
        }
    }

    /// Append a provider at the lowest priority so far.
    pub fn add_provider(&mut self, provider: Arc<dyn LlmProvider>, quota: ProviderQuota) {
        let rank = self.entries.len();
        let name = provider.provider_name().to_string();
        info!(provider = %name, rank, rpm = ?quota.requests_per_minute(), "Added provider to failover chain");
        self.entries.push(ProviderEntry {
            provider,
            quota,
            health: ProviderHealth {
                name,
                priority_rank: rank,
                consecutive_failures: 0,
                is_healthy: true,
                unhealthy_until: None,
                total_calls: 0,
                total_failures: 0,
            },
        });
    }

    /// Builder-style [`add_provider`](Self::add_provider).
    pub fn with_provider(mut self, provider: Arc<dyn LlmProvider>, quota: ProviderQuota) -> Self {
        self.add_provider(provider, quota);
        self
    }

    /// Number of network providers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when only the offline fallback is available.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Health of every provider, in priority order.
    pub fn health(&self) -> Vec<ProviderHealth> {
        self.entries.iter().map(|entry| entry.health.clone()).collect()
    }

    /// Health of one provider.
    pub fn health_of(&self, name: &str) -> Option<&ProviderHealth> {
        self.entries
            .iter()
            .map(|entry| &entry.health)
            .find(|health| health.name == name)
    }

    /// Model names of the network providers.
    pub fn models(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| entry.provider.model_name().to_string())
            .collect()
    }

    /// Model served by a named provider, including the offline fallback.
    pub fn model_of(&self, provider: &str) -> Option<&str> {
        if provider == OFFLINE_PROVIDER_NAME {
            return Some(OFFLINE_MODEL_NAME);
        }
        self.entries
            .iter()
            .find(|entry| entry.health.name == provider)
            .map(|entry| entry.provider.model_name())
    }

    /// The offline fallback.
    pub fn offline(&self) -> &OfflineProvider {
        &self.offline
    }

    /// Try each healthy provider from `start_index` on until one answers.
    ///
    /// A provider whose own quota is spent is skipped with a `RateLimited`
    /// failure and no network call. Credential and status failures belong to
    /// one provider, so the chain moves on; only a malformed request ends the
    /// attempt early because every provider would refuse it.
    #[instrument(skip(self, prompt), fields(providers = self.entries.len()))]
    pub async fn try_providers(
        &mut self,
        prompt: &str,
        start_index: usize,
    ) -> Result<ProviderSuccess, ChainFailure> {
        let started = Instant::now();
        let now = self.clock.now();
        let mut last_failure: Option<(String, ProviderError)> = None;

        for entry in self.entries.iter_mut().skip(start_index) {
            if !entry.health.is_healthy {
                match entry.health.unhealthy_until {
                    Some(until) if now >= until => {
                        info!(provider = %entry.health.name, "Cooldown elapsed, provider back in rotation");
                        entry.health.is_healthy = true;
                        entry.health.consecutive_failures = 0;
                        entry.health.unhealthy_until = None;
                    }
                    _ => {
                        debug!(provider = %entry.health.name, "Skipping unhealthy provider");
                        continue;
                    }
                }
            }
            if !entry.provider.is_available() {
                debug!(provider = %entry.health.name, "Skipping unavailable provider");
                continue;
            }

            if !entry.quota.try_acquire() {
                debug!(provider = %entry.health.name, "Provider quota exhausted");
                let error = ProviderError::new(ProviderErrorKind::RateLimited(format!(
                    "{} tier quota exhausted",
                    entry.health.name
                )));
                last_failure = Some((entry.health.name.clone(), error));
                continue;
            }

            entry.health.total_calls += 1;
            match entry.provider.call_llm(prompt).await {
                Ok(response) => {
                    entry.health.consecutive_failures = 0;
                    return Ok(ProviderSuccess {
                        provider: entry.health.name.clone(),
                        model: entry.provider.model_name().to_string(),
                        response,
                        latency_ms: started.elapsed().as_millis() as u64,
                    });
                }
                Err(error) => {
                    warn!(provider = %entry.health.name, error = %error.kind, "Provider call failed");
                    Self::record_failure(&self.config, &mut entry.health, now);
                    let malformed = matches!(error.kind, ProviderErrorKind::InvalidRequest(_));
                    last_failure = Some((entry.health.name.clone(), error));
                    if malformed {
                        break;
                    }
                }
            }
        }

        let (provider, error) = last_failure.unwrap_or_else(|| {
            (
                "failover_chain".to_string(),
                ProviderError::new(ProviderErrorKind::ProviderUnavailable(
                    "No healthy provider available".to_string(),
                )),
            )
        });
        Err(ChainFailure {
            provider,
            error,
            latency_ms: started.elapsed().as_millis() as u64,
        })
    }

    fn record_failure(config: &FailoverConfig, health: &mut ProviderHealth, now: Duration) {
        health.total_failures += 1;
        health.consecutive_failures += 1;
        if health.is_healthy && health.consecutive_failures >= config.failure_threshold {
            health.is_healthy = false;
            health.unhealthy_until =
                Some(now + Duration::from_secs(config.unhealthy_cooldown_secs));
            info!(
                provider = %health.name,
                failures = health.consecutive_failures,
                cooldown_secs = config.unhealthy_cooldown_secs,
                "Provider marked unhealthy"
            );
        }
    }

    /// Produce the offline response selected by `draw`.
    pub fn offline_response(&self, prompt: &str, call_type: CallType, draw: u64) -> ProviderSuccess {
        ProviderSuccess {
            provider: OFFLINE_PROVIDER_NAME.to_string(),
            model: OFFLINE_MODEL_NAME.to_string(),
            response: self.offline.generate(prompt, call_type, draw),
            latency_ms: 0,
        }
    }

    /// Try the providers from `start_index` on, then fall back to the
    /// offline templates.
    ///
    /// Never fails: provider errors are absorbed into the health table and
    /// the offline response ends the chain. `draw` is only invoked when the
    /// offline step is reached.
    pub async fn call_with_fallback(
        &mut self,
        prompt: &str,
        start_index: usize,
        call_type: CallType,
        draw: impl FnOnce() -> u64,
    ) -> ProviderSuccess {
        match self.try_providers(prompt, start_index).await {
            Ok(success) => success,
            Err(failure) => {
                debug!(error = %failure.error.kind, "All providers failed, using offline fallback");
                self.offline_response(prompt, call_type, draw())
            }
        }
    }
}
