//! Tests for the offline template provider.

use chronicler_core::{CallType, OFFLINE_PROVIDER_NAME};
use chronicler_interface::LlmProvider;
use chronicler_models::{OFFLINE_MODEL_NAME, OfflineProvider};
use strum::IntoEnumIterator;

#[test]
fn same_draw_same_output() {
    let offline = OfflineProvider::new();
    for call_type in CallType::iter() {
        let a = offline.generate("Bandits sighted near the ford", call_type, 12345);
        let b = offline.generate("Bandits sighted near the ford", call_type, 12345);
        assert_eq!(a, b);
        assert!(!a.text.is_empty());
        assert_eq!(a.usage.input_tokens, 5);
        assert!(a.usage.completion_tokens > 0);
    }
}

#[test]
fn draw_selects_template() {
    let offline = OfflineProvider::new();
    let templates = OfflineProvider::templates(CallType::NarrativeEvent);
    let first = offline.generate("harvest", CallType::NarrativeEvent, 0);
    let wrapped = offline.generate("harvest", CallType::NarrativeEvent, templates.len() as u64);
    let second = offline.generate("harvest", CallType::NarrativeEvent, 1);
    assert_eq!(first, wrapped);
    assert_ne!(first.text, second.text);
}

#[test]
fn subject_is_filled_in() {
    let offline = OfflineProvider::new();
    // Template 1 for dialogue mentions the subject
    let response = offline.generate("The new well", CallType::NpcDialogue, 1);
    assert!(response.text.contains("the new well"), "{}", response.text);
    assert!(!response.text.contains("{subject}"));
}

#[tokio::test]
async fn provider_interface_never_fails() {
    let offline = OfflineProvider::new();
    assert!(offline.is_available());
    assert_eq!(offline.provider_name(), OFFLINE_PROVIDER_NAME);
    assert_eq!(offline.model_name(), OFFLINE_MODEL_NAME);

    let a = offline.call_llm("A wedding at the chapel").await.unwrap();
    let b = offline.call_llm("A wedding at the chapel").await.unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn provider_interface_uses_its_call_type() {
    let dialogue = OfflineProvider::for_call_type(CallType::NpcDialogue);
    assert_eq!(dialogue.call_type(), CallType::NpcDialogue);
    assert_eq!(OfflineProvider::default().call_type(), CallType::NarrativeEvent);

    let response = dialogue.call_llm("The new well").await.unwrap();
    let templates: Vec<String> = OfflineProvider::templates(CallType::NpcDialogue)
        .iter()
        .map(|template| template.replace("{subject}", "the new well"))
        .collect();
    assert!(templates.contains(&response.text), "{}", response.text);
}
