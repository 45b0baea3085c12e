//! Test utilities for orchestrator tests.
//!
//! Provides a scripted provider and config helpers.

#![allow(dead_code)]

use async_trait::async_trait;
use chronicler_core::{ProviderResponse, TokenUsage};
use chronicler_error::{ProviderError, ProviderErrorKind};
use chronicler_interface::{LlmProvider, ProviderResult};
use chronicler_orchestrator::{ChroniclerConfig, FailoverConfig, QueueConfig};
use chronicler_rate_limit::{BackoffConfig, RateLimitConfig, RecoveryConfig};
use chronicler_replay::{ReplayConfig, ReplayMode};
use chronicler_usage::BudgetConfig;
use std::sync::{Arc, Mutex};

/// Behavior configuration for scripted responses.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Always return success with the given text
    Success(String),
    /// Always return the specified error
    Error(ProviderErrorKind),
    /// Return a sequence of responses, then keep failing with `Network`
    Sequence(Vec<MockResponse>),
}

/// A single scripted response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Success(String),
    Error(ProviderErrorKind),
}

/// Provider that answers from a script and counts its calls.
#[derive(Debug, Clone)]
pub struct MockProvider {
    name: String,
    model: String,
    behavior: MockBehavior,
    available: bool,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockProvider {
    fn with_behavior(name: &str, behavior: MockBehavior) -> Self {
        Self {
            name: name.to_string(),
            model: format!("{}-model", name),
            behavior,
            available: true,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Always succeeds with `text`.
    pub fn success(name: &str, text: &str) -> Self {
        Self::with_behavior(name, MockBehavior::Success(text.to_string()))
    }

    /// Always fails with `error`.
    pub fn failing(name: &str, error: ProviderErrorKind) -> Self {
        Self::with_behavior(name, MockBehavior::Error(error))
    }

    /// Serves `responses` in order.
    pub fn sequence(name: &str, responses: Vec<MockResponse>) -> Self {
        Self::with_behavior(name, MockBehavior::Sequence(responses))
    }

    /// Report the provider as not configured.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls received.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// As a trait object sharing this provider's call log.
    pub fn shared(&self) -> Arc<dyn LlmProvider> {
        Arc::new(self.clone())
    }

    fn reply(text: &str, prompt: &str) -> ProviderResponse {
        let input = prompt.split_whitespace().count() as u64;
        let completion = text.split_whitespace().count() as u64;
        ProviderResponse::new(text, TokenUsage::new(input, completion))
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn call_llm(&self, prompt: &str) -> ProviderResult<ProviderResponse> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(prompt.to_string());
            calls.len() - 1
        };

        match &self.behavior {
            MockBehavior::Success(text) => Ok(Self::reply(text, prompt)),
            MockBehavior::Error(kind) => Err(ProviderError::new(kind.clone())),
            MockBehavior::Sequence(responses) => match responses.get(index) {
                Some(MockResponse::Success(text)) => Ok(Self::reply(text, prompt)),
                Some(MockResponse::Error(kind)) => Err(ProviderError::new(kind.clone())),
                None => Err(ProviderError::new(ProviderErrorKind::Network(
                    "script exhausted".to_string(),
                ))),
            },
        }
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn provider_name(&self) -> &str {
        &self.name
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

pub fn network_error() -> ProviderErrorKind {
    ProviderErrorKind::Network("connection reset".to_string())
}

/// Deterministic settings: no jitter, lenient degraded-mode thresholds,
/// recording without a file.
pub fn test_config() -> ChroniclerConfig {
    ChroniclerConfig::default()
        .with_rate_limit(RateLimitConfig::default().with_requests_per_minute(600))
        .with_backoff(BackoffConfig::default().with_jitter(false))
        .with_recovery(
            RecoveryConfig::default()
                .with_consecutive_error_limit(100)
                .with_error_rate_threshold(1.0),
        )
        .with_failover(FailoverConfig::default().with_failure_threshold(100))
        .with_queue(QueueConfig::default())
        .with_budget(BudgetConfig::default())
        .with_replay(ReplayConfig::default().with_mode(ReplayMode::Record).with_seed(7))
}
