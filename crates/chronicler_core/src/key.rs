//! Content-addressed keys for deduplication and caching.

use crate::CallType;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Collapse runs of whitespace and trim, so cosmetic prompt differences
/// address the same content.
pub fn normalize_prompt(prompt: &str) -> String {
    prompt.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Stable SHA-256 key over `(call_type, normalized prompt)`.
///
/// # Examples
///
/// ```
/// use chronicler_core::{CallType, ContentKey};
///
/// let a = ContentKey::new("Greet  the  traveler", CallType::NpcDialogue);
/// let b = ContentKey::new("Greet the traveler ", CallType::NpcDialogue);
/// let c = ContentKey::new("Greet the traveler", CallType::NarrativeEvent);
/// assert_eq!(a, b);
/// assert_ne!(a, c);
/// ```
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display,
)]
pub struct ContentKey(String);

impl ContentKey {
    /// Derive the key for a prompt and call-type.
    pub fn new(prompt: &str, call_type: CallType) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(call_type.as_ref().as_bytes());
        hasher.update([0u8]);
        hasher.update(normalize_prompt(prompt).as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
