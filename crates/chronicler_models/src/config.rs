//! Provider configuration and construction.

use crate::OpenAiCompatibleProvider;
use chronicler_error::{BuilderError, ConfigError};
use chronicler_interface::LlmProvider;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Wire protocol a configured provider speaks.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProviderKind {
    /// Chat-completions endpoint in the OpenAI format
    #[default]
    OpenaiCompatible,
}

/// One entry of the `[[providers]]` list, in failover order.
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
#[builder(
    setter(into),
    build_fn(validate = "Self::validate_limits", error = "BuilderError")
)]
pub struct ProviderConfig {
    /// Name used in logs, health reports and replay records
    name: String,

    /// Wire protocol
    #[serde(default)]
    #[builder(default)]
    kind: ProviderKind,

    /// Model identifier sent to the endpoint
    model: String,

    /// Full chat-completions URL
    endpoint: String,

    /// Environment variable holding the API key; no key is sent when unset
    #[serde(default)]
    #[builder(default)]
    api_key_env: Option<String>,

    /// The provider's own requests-per-minute tier limit
    #[serde(default)]
    #[builder(default)]
    rpm: Option<u32>,

    /// Network-level timeout per call
    #[serde(default = "default_timeout_ms")]
    #[builder(default = "default_timeout_ms()")]
    timeout_ms: u64,

    /// Cap on generated tokens per call
    #[serde(default)]
    #[builder(default)]
    max_tokens: Option<u32>,
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl ProviderConfig {
    /// Creates a new builder for `ProviderConfig`.
    pub fn builder() -> ProviderConfigBuilder {
        ProviderConfigBuilder::default()
    }

    /// Validates the entry.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty name, model or endpoint, or a zero rpm.
    #[track_caller]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::new("Provider name must not be empty"));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::new(format!(
                "Provider '{}' has no model",
                self.name
            )));
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(ConfigError::new(format!(
                "Provider '{}' endpoint must be an http(s) URL, got '{}'",
                self.name, self.endpoint
            )));
        }
        if self.rpm == Some(0) {
            return Err(ConfigError::new(format!(
                "Provider '{}' rpm must be greater than 0",
                self.name
            )));
        }
        Ok(())
    }
}

impl ProviderConfigBuilder {
    fn validate_limits(&self) -> Result<(), String> {
        if let Some(Some(0)) = self.rpm {
            return Err("rpm must be greater than 0".to_string());
        }
        if let Some(0) = self.timeout_ms {
            return Err("timeout_ms must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Construct the provider a config entry describes.
///
/// # Errors
///
/// Returns an error if the entry is invalid or the HTTP client cannot be
/// initialized.
#[tracing::instrument(skip(config), fields(name = %config.name, kind = %config.kind))]
pub fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>, ConfigError> {
    config.validate()?;
    let timeout = Duration::from_millis(config.timeout_ms);

    let provider = match config.kind {
        ProviderKind::OpenaiCompatible => {
            let provider = match &config.api_key_env {
                Some(env_var) => OpenAiCompatibleProvider::from_env(
                    config.name.clone(),
                    config.model.clone(),
                    config.endpoint.clone(),
                    env_var,
                    timeout,
                ),
                None => OpenAiCompatibleProvider::new(
                    config.name.clone(),
                    config.model.clone(),
                    config.endpoint.clone(),
                    None,
                    timeout,
                ),
            }
            .map_err(|e| ConfigError::new(e.to_string()))?;
            match config.max_tokens {
                Some(max_tokens) => provider.with_max_tokens(max_tokens),
                None => provider,
            }
        }
    };

    tracing::debug!("Built provider");
    Ok(Arc::new(provider))
}
