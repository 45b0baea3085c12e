//! Trait definitions for text-generation providers.

use async_trait::async_trait;
use chronicler_core::ProviderResponse;
use chronicler_error::ProviderError;

/// Result of a single provider call.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Capability set every provider in the failover chain implements.
///
/// Implementations are expected to enforce their own network-level timeout;
/// the orchestrator never cancels a call once it is in flight.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate text for a prompt. The response carries the token usage readout.
    async fn call_llm(&self, prompt: &str) -> ProviderResult<ProviderResponse>;

    /// Whether the provider is configured and willing to take calls.
    ///
    /// This is a cheap local check (credentials present, not switched off),
    /// not a network probe.
    fn is_available(&self) -> bool;

    /// Provider name (e.g., "openai", "offline").
    fn provider_name(&self) -> &str;

    /// Model identifier used for pricing and usage accounting.
    fn model_name(&self) -> &str;
}
