//! Chat-completions data transfer objects.

use chronicler_error::BuilderError;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Chat message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System instructions
    System,
    /// User message
    User,
    /// Assistant message
    Assistant,
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Getters)]
pub struct ChatMessage {
    /// Message role
    role: ChatRole,
    /// Message content
    #[serde(default)]
    content: String,
}

impl ChatMessage {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Chat-completions request body.
#[derive(Debug, Clone, Serialize, Deserialize, derive_builder::Builder, Getters)]
#[builder(setter(into), build_fn(error = "BuilderError"))]
pub struct ChatCompletionRequest {
    /// Model identifier
    model: String,
    /// Conversation so far
    messages: Vec<ChatMessage>,
    /// Maximum tokens to generate
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    /// Temperature for sampling
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl ChatCompletionRequest {
    /// Creates a new builder for `ChatCompletionRequest`.
    pub fn builder() -> ChatCompletionRequestBuilder {
        ChatCompletionRequestBuilder::default()
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Getters)]
pub struct ChatUsage {
    /// Prompt tokens consumed
    #[serde(default)]
    prompt_tokens: u64,
    /// Completion tokens generated
    #[serde(default)]
    completion_tokens: u64,
}

/// One generated alternative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct ChatChoice {
    /// Generated message
    message: ChatMessage,
}

/// Chat-completions response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct ChatCompletionResponse {
    /// Generated alternatives
    #[serde(default)]
    choices: Vec<ChatChoice>,
    /// Token usage
    #[serde(default)]
    usage: Option<ChatUsage>,
}
