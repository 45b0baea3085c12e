//! Text generation providers.
//!
//! Two provider variants implement [`chronicler_interface::LlmProvider`]:
//!
//! - [`OpenAiCompatibleProvider`] talks to any chat-completions endpoint that
//!   follows the OpenAI wire format.
//! - [`OfflineProvider`] fills canned templates locally. It never fails and
//!   performs no I/O, which makes it the terminal step of every failover chain.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod dto;
mod offline;
mod openai_compat;

pub use config::{ProviderConfig, ProviderConfigBuilder, ProviderKind, build_provider};
pub use dto::{
    ChatChoice, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ChatRole, ChatUsage,
};
pub use offline::{OFFLINE_MODEL_NAME, OfflineProvider};
pub use openai_compat::{OpenAiCompatibleProvider, classify_status};
