//! OpenAI-compatible chat-completions client.

use crate::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
use async_trait::async_trait;
use chronicler_core::{ProviderResponse, TokenUsage};
use chronicler_error::{ProviderError, ProviderErrorKind};
use chronicler_interface::{LlmProvider, ProviderResult};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Map a non-success HTTP status onto a provider error.
///
/// 429 is throttling, 401 rejected credentials, 503 an unavailable backend.
/// Everything else keeps its status so retryability can be decided from it.
pub fn classify_status(status: u16, message: String) -> ProviderErrorKind {
    match status {
        429 => ProviderErrorKind::RateLimited(message),
        401 => ProviderErrorKind::Unauthorized(message),
        503 => ProviderErrorKind::ProviderUnavailable(message),
        _ => ProviderErrorKind::Api { status, message },
    }
}

/// Client for any endpoint speaking the OpenAI chat-completions format.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    name: String,
    model: String,
    endpoint: String,
    api_key: Option<String>,
    missing_key_env: Option<String>,
    timeout: Duration,
    max_tokens: Option<u32>,
}

impl OpenAiCompatibleProvider {
    /// Creates a new provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    #[instrument(skip_all, fields(name = %name, model = %model))]
    pub fn new(
        name: String,
        model: String,
        endpoint: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            ProviderError::new(ProviderErrorKind::ProviderUnavailable(format!(
                "HTTP client init failed: {}",
                e
            )))
        })?;

        Ok(Self {
            client,
            name,
            model,
            endpoint,
            api_key,
            missing_key_env: None,
            timeout,
            max_tokens: None,
        })
    }

    /// Creates a provider whose key is read from `env_var`.
    ///
    /// A missing variable does not fail construction; the provider reports
    /// itself unavailable so the failover chain skips it.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn from_env(
        name: String,
        model: String,
        endpoint: String,
        env_var: &str,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        match std::env::var(env_var) {
            Ok(key) => Self::new(name, model, endpoint, Some(key), timeout),
            Err(e) => {
                warn!(provider = %name, env_var, error = %e, "API key not set, provider disabled");
                let mut provider = Self::new(name, model, endpoint, None, timeout)?;
                provider.missing_key_env = Some(env_var.to_string());
                Ok(provider)
            }
        }
    }

    /// Cap generated tokens per call.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Decode a chat-completions body into generated text and token counts.
    ///
    /// # Errors
    ///
    /// `Parse` when the body is not a chat-completions payload,
    /// `InvalidResponse` when it carries no choices or only empty text.
    pub fn parse_completion(body: &str) -> ProviderResult<ProviderResponse> {
        let parsed: ChatCompletionResponse = serde_json::from_str(body).map_err(|e| {
            ProviderError::new(ProviderErrorKind::Parse(format!(
                "Failed to parse response: {}",
                e
            )))
        })?;

        let text = parsed
            .choices()
            .first()
            .map(|choice| choice.message().content().trim().to_string())
            .ok_or_else(|| {
                ProviderError::new(ProviderErrorKind::InvalidResponse(
                    "Response contained no choices".to_string(),
                ))
            })?;
        if text.is_empty() {
            return Err(ProviderError::new(ProviderErrorKind::InvalidResponse(
                "Response text was empty".to_string(),
            )));
        }

        let usage = parsed
            .usage()
            .map(|usage| TokenUsage::new(*usage.prompt_tokens(), *usage.completion_tokens()))
            .unwrap_or_default();
        Ok(ProviderResponse::new(text, usage))
    }

    fn map_send_error(&self, error: reqwest::Error) -> ProviderError {
        if error.is_timeout() {
            ProviderError::new(ProviderErrorKind::Timeout(self.timeout.as_millis() as u64))
        } else {
            ProviderError::new(ProviderErrorKind::Network(format!(
                "Request failed: {}",
                error
            )))
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    #[instrument(skip(self, prompt), fields(provider = %self.name, model = %self.model, prompt_len = prompt.len()))]
    async fn call_llm(&self, prompt: &str) -> ProviderResult<ProviderResponse> {
        if let Some(env_var) = &self.missing_key_env {
            return Err(ProviderError::new(ProviderErrorKind::ProviderUnavailable(
                format!("{} not set", env_var),
            )));
        }

        let body = ChatCompletionRequest::builder()
            .model(self.model.clone())
            .messages(vec![ChatMessage::user(prompt)])
            .max_tokens(self.max_tokens)
            .build()
            .map_err(|e| ProviderError::new(ProviderErrorKind::InvalidRequest(e.to_string())))?;

        debug!(endpoint = %self.endpoint, "Sending chat completion request");
        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        // Check status
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::new(classify_status(status.as_u16(), message)));
        }

        let text = response.text().await.map_err(|e| self.map_send_error(e))?;
        let parsed = Self::parse_completion(&text)?;
        debug!(
            input_tokens = parsed.usage.input_tokens,
            completion_tokens = parsed.usage.completion_tokens,
            "Chat completion received"
        );
        Ok(parsed)
    }

    fn is_available(&self) -> bool {
        self.missing_key_env.is_none()
    }

    fn provider_name(&self) -> &str {
        &self.name
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
