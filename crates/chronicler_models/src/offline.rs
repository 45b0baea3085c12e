//! Template-based offline provider.

use async_trait::async_trait;
use chronicler_core::{
    CallType, ContentKey, OFFLINE_PROVIDER_NAME, ProviderResponse, TokenUsage, normalize_prompt,
};
use chronicler_interface::{LlmProvider, ProviderResult};
use tracing::{debug, instrument};

/// Model name the offline provider reports for usage accounting.
pub const OFFLINE_MODEL_NAME: &str = "offline-templates";

/// Words of the prompt carried into a template.
const SUBJECT_WORDS: usize = 8;

const DECISION_TEMPLATES: &[&str] = &[
    "The council accepts the decision: {subject}.",
    "The settlers grumble, but they follow the order: {subject}.",
    "After a long evening of debate, the decision stands: {subject}.",
    "Word of the decision spreads quickly, and most agree: {subject}.",
];

const DIALOGUE_TEMPLATES: &[&str] = &[
    "\"Times are hard, but we endure,\" the villager says.",
    "\"I have heard talk of {subject},\" comes the reply, with a slow nod.",
    "\"Ask me again tomorrow. Today there is work to do.\"",
    "\"The harvest will decide what we can afford,\" they answer.",
];

const EVENT_TEMPLATES: &[&str] = &[
    "A quiet day passes in the settlement.",
    "News travels from house to house: {subject}.",
    "The weather turns, and the settlers change their plans.",
    "Travelers arrive at the gate with stories of {subject}.",
];

const CONTEXT_TEMPLATES: &[&str] = &[
    "The settlement endures, shaped by {subject}.",
    "Seasons turn slowly, and the village grows with them.",
    "Old stories about {subject} are still told around the fires.",
];

/// Deterministic provider that never fails and performs no I/O.
///
/// Output is selected by a caller-supplied draw so a recorded session can
/// reproduce it exactly. The failover chain calls [`generate`] with the
/// request's call-type and a logged draw. The [`LlmProvider`] impl is for
/// standalone use: it answers with the templates of the call-type it was
/// created for and derives the draw from the prompt.
///
/// [`generate`]: OfflineProvider::generate
///
/// # Examples
///
/// ```
/// use chronicler_core::CallType;
/// use chronicler_models::OfflineProvider;
///
/// let offline = OfflineProvider::new();
/// let a = offline.generate("The mill burned down", CallType::NarrativeEvent, 7);
/// let b = offline.generate("The mill burned down", CallType::NarrativeEvent, 7);
/// assert_eq!(a, b);
/// assert!(!a.text.is_empty());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfflineProvider {
    call_type: CallType,
}

impl OfflineProvider {
    /// Create the offline provider, answering narrative events when called
    /// through [`LlmProvider`].
    pub fn new() -> Self {
        Self::for_call_type(CallType::NarrativeEvent)
    }

    /// Offline provider whose [`LlmProvider`] calls use `call_type` templates.
    pub fn for_call_type(call_type: CallType) -> Self {
        Self { call_type }
    }

    /// Call-type used by [`LlmProvider::call_llm`].
    pub fn call_type(&self) -> CallType {
        self.call_type
    }

    /// Templates available for a call-type.
    pub fn templates(call_type: CallType) -> &'static [&'static str] {
        match call_type {
            CallType::DecisionInterpretation => DECISION_TEMPLATES,
            CallType::NpcDialogue => DIALOGUE_TEMPLATES,
            CallType::NarrativeEvent => EVENT_TEMPLATES,
            CallType::NarrativeContext => CONTEXT_TEMPLATES,
        }
    }

    /// Fill the template selected by `draw`.
    #[instrument(skip(self, prompt), fields(call_type = %call_type))]
    pub fn generate(&self, prompt: &str, call_type: CallType, draw: u64) -> ProviderResponse {
        let templates = Self::templates(call_type);
        let index = (draw % templates.len() as u64) as usize;
        let text = templates[index].replace("{subject}", &subject(prompt));

        let usage = TokenUsage::new(
            prompt.split_whitespace().count() as u64,
            text.split_whitespace().count() as u64,
        );
        debug!(template = index, "Generated offline response");
        ProviderResponse::new(text, usage)
    }
}

impl Default for OfflineProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Leading words of the prompt, lower-cased, without trailing punctuation.
fn subject(prompt: &str) -> String {
    let normalized = normalize_prompt(prompt);
    let words: Vec<&str> = normalized.split(' ').take(SUBJECT_WORDS).collect();
    let joined = words.join(" ");
    let trimmed = joined.trim_end_matches(|c: char| c.is_ascii_punctuation());
    if trimmed.is_empty() {
        "recent events".to_string()
    } else {
        trimmed.to_lowercase()
    }
}

#[async_trait]
impl LlmProvider for OfflineProvider {
    async fn call_llm(&self, prompt: &str) -> ProviderResult<ProviderResponse> {
        // Without a logged draw, derive one from the prompt content
        let key = ContentKey::new(prompt, self.call_type);
        let draw = u64::from_str_radix(&key.as_str()[..16], 16).unwrap_or_default();
        Ok(self.generate(prompt, self.call_type, draw))
    }

    fn is_available(&self) -> bool {
        true
    }

    fn provider_name(&self) -> &str {
        OFFLINE_PROVIDER_NAME
    }

    fn model_name(&self) -> &str {
        OFFLINE_MODEL_NAME
    }
}
