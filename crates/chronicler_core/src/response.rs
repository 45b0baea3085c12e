//! Response and token accounting types.

use serde::{Deserialize, Serialize};

/// Token counts reported for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens
    pub input_tokens: u64,
    /// Generated tokens
    pub completion_tokens: u64,
}

impl TokenUsage {
    /// Create a usage reading.
    pub fn new(input_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            input_tokens,
            completion_tokens,
        }
    }

    /// Prompt plus completion tokens.
    pub fn total(&self) -> u64 {
        self.input_tokens + self.completion_tokens
    }
}

/// What a provider hands back for a successful call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Generated text
    pub text: String,
    /// Token usage readout
    pub usage: TokenUsage,
}

impl ProviderResponse {
    /// Create a provider response.
    pub fn new(text: impl Into<String>, usage: TokenUsage) -> Self {
        Self {
            text: text.into(),
            usage,
        }
    }
}

/// Where a delivered response came from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResponseSource {
    /// A network provider answered
    Provider,
    /// Served from a fresh cache entry
    Cache,
    /// Served from an expired cache entry after providers failed
    StaleCache,
    /// Produced by the offline template provider
    Offline,
    /// Read back from a replay log
    Replay,
}

/// The response delivered to the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Generated text
    pub text: String,
    /// Token usage of the originating call
    pub usage: TokenUsage,
    /// Cost in USD of the originating call
    pub cost_usd: f64,
    /// Provider that produced the text
    pub provider: String,
    /// Call latency in milliseconds
    pub latency_ms: u64,
    /// Where this delivery came from
    pub source: ResponseSource,
}

/// Provider name reported by the offline template provider.
pub const OFFLINE_PROVIDER_NAME: &str = "offline";
