//! Tests for the chat-completions provider that need no live endpoint.

use chronicler_error::{
    BuilderErrorKind, ChroniclerErrorKind, ChroniclerResult, ErrorCategory, ProviderErrorKind,
    RetryableError,
};
use chronicler_interface::LlmProvider;
use chronicler_models::{
    OpenAiCompatibleProvider, ProviderConfig, ProviderKind, build_provider, classify_status,
};
use std::time::Duration;

#[test]
fn parses_completion_text_and_usage() {
    let body = r#"{
        "id": "chatcmpl-1",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": " The river floods. "}}],
        "usage": {"prompt_tokens": 21, "completion_tokens": 4, "total_tokens": 25}
    }"#;
    let response = OpenAiCompatibleProvider::parse_completion(body).unwrap();
    assert_eq!(response.text, "The river floods.");
    assert_eq!(response.usage.input_tokens, 21);
    assert_eq!(response.usage.completion_tokens, 4);
}

#[test]
fn malformed_bodies_are_classified() {
    let err = OpenAiCompatibleProvider::parse_completion("<html>bad gateway</html>").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Parse);
    assert!(err.is_retryable());

    let err = OpenAiCompatibleProvider::parse_completion(r#"{"choices": []}"#).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InvalidResponse);

    let empty = r#"{"choices": [{"message": {"role": "assistant", "content": "   "}}]}"#;
    let err = OpenAiCompatibleProvider::parse_completion(empty).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InvalidResponse);
}

#[test]
fn status_codes_map_to_categories() {
    assert_eq!(
        classify_status(429, "slow down".into()).category(),
        ErrorCategory::RateLimited
    );
    assert_eq!(
        classify_status(503, "busy".into()).category(),
        ErrorCategory::ProviderUnavailable
    );
    assert!(!classify_status(401, "bad key".into()).is_retryable());
    assert!(!classify_status(400, "bad prompt".into()).is_retryable());
    assert!(classify_status(500, "oops".into()).is_retryable());
    assert_eq!(
        classify_status(502, "gateway".into()),
        ProviderErrorKind::Api {
            status: 502,
            message: "gateway".into()
        }
    );
}

#[tokio::test]
async fn missing_key_makes_provider_unavailable() {
    let provider = OpenAiCompatibleProvider::from_env(
        "primary".into(),
        "village-7b".into(),
        "https://example.invalid/v1/chat/completions".into(),
        "CHRONICLER_TEST_KEY_THAT_IS_NEVER_SET",
        Duration::from_secs(1),
    )
    .unwrap();
    assert!(!provider.is_available());

    let err = provider.call_llm("hello").await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::ProviderUnavailable);
}

#[test]
fn provider_config_validation() {
    let config: ProviderConfig = toml::from_str(
        r#"
        name = "primary"
        model = "village-7b"
        endpoint = "http://localhost:8080/v1/chat/completions"
        rpm = 30
        "#,
    )
    .unwrap();
    assert_eq!(*config.kind(), ProviderKind::OpenaiCompatible);
    assert_eq!(*config.timeout_ms(), 30_000);
    assert!(config.validate().is_ok());

    let provider = build_provider(&config).unwrap();
    assert_eq!(provider.provider_name(), "primary");
    assert!(provider.is_available());

    assert!(config.clone().with_endpoint("ftp://nope".into()).validate().is_err());
    assert!(config.clone().with_rpm(Some(0)).validate().is_err());
    assert!(config.with_model(String::new()).validate().is_err());
}

#[test]
fn provider_builder_reports_missing_and_invalid_fields() {
    let err = ProviderConfig::builder()
        .name("primary")
        .endpoint("http://localhost:8080/v1/chat/completions")
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), &BuilderErrorKind::MissingField("model"));

    let err = ProviderConfig::builder()
        .name("primary")
        .model("village-7b")
        .endpoint("http://localhost:8080/v1/chat/completions")
        .rpm(Some(0))
        .build()
        .unwrap_err();
    assert!(matches!(err.kind(), BuilderErrorKind::InvalidValue(_)));

    let config = ProviderConfig::builder()
        .name("primary")
        .model("village-7b")
        .endpoint("http://localhost:8080/v1/chat/completions")
        .rpm(Some(30))
        .build()
        .unwrap();
    assert_eq!(*config.timeout_ms(), 30_000);
}

#[test]
fn builder_errors_convert_into_the_workspace_error() {
    fn unnamed() -> ChroniclerResult<ProviderConfig> {
        Ok(ProviderConfig::builder().model("village-7b").build()?)
    }

    let err = unnamed().unwrap_err();
    match err.kind() {
        ChroniclerErrorKind::Builder(builder) => {
            assert_eq!(builder.kind(), &BuilderErrorKind::MissingField("name"));
        }
        other => panic!("expected a builder error, got {}", other),
    }
}
