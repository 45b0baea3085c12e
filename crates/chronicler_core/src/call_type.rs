//! Classification of what a generation request is for.

use serde::{Deserialize, Serialize};

/// Purpose of a request; determines cache TTL and default timeout.
///
/// # Examples
///
/// ```
/// use chronicler_core::CallType;
/// use std::str::FromStr;
///
/// assert_eq!(CallType::NpcDialogue.to_string(), "npc_dialogue");
/// assert_eq!(CallType::from_str("narrative_event").unwrap(), CallType::NarrativeEvent);
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CallType {
    /// Interpreting a leader's decision; stale almost every tick
    DecisionInterpretation,
    /// A line of NPC dialogue
    NpcDialogue,
    /// A narrative event description
    NarrativeEvent,
    /// Background narrative context; stable for long stretches
    NarrativeContext,
}
