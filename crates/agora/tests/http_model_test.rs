//! HTTP client and fallback behaviour against mock chat-completions servers.

use std::time::Duration;

use agora::config::{ApiSource, ModelConfig};
use agora::llm::{FallbackModel, OpenAiCompatibleClient};
use dialogue::{ChatMessage, LanguageModel, LlmError};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn reply(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

fn source(name: &str, server: &MockServer) -> ApiSource {
    let mut source = ApiSource::new(name, format!("{}/v1", server.uri()), "test-model");
    source.timeout_secs = 5;
    source
}

// ── OpenAiCompatibleClient ──────────────────────────────────────────

#[tokio::test]
async fn test_client_sends_model_messages_and_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "messages": [
                { "role": "system", "content": "You are Soyo." },
                { "role": "user", "content": "Hello" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("It's all right.")))
        .expect(1)
        .mount(&server)
        .await;

    let mut src = source("primary", &server);
    src.api_key = "sk-test".into();
    let client = OpenAiCompatibleClient::new(src).unwrap();

    let completion = client
        .invoke(
            &[
                ChatMessage::system("You are Soyo."),
                ChatMessage::user("Hello"),
            ],
            None,
        )
        .await
        .unwrap();
    assert_eq!(completion.content, "It's all right.");
    assert!(completion.tool_calls.is_empty());
}

#[tokio::test]
async fn test_client_maps_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = OpenAiCompatibleClient::new(source("a", &server)).unwrap();
    let err = client.invoke(&[ChatMessage::user("hi")], None).await.unwrap_err();
    match err {
        LlmError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_client_empty_choices() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let client = OpenAiCompatibleClient::new(source("a", &server)).unwrap();
    let err = client.invoke(&[], None).await.unwrap_err();
    assert!(matches!(err, LlmError::EmptyResponse));
}

#[tokio::test]
async fn test_client_invalid_json_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = OpenAiCompatibleClient::new(source("a", &server)).unwrap();
    let err = client.invoke(&[], None).await.unwrap_err();
    assert!(matches!(err, LlmError::Parse(_)));
}

#[tokio::test]
async fn test_client_returns_tool_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "tools": [{ "type": "function" }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": { "name": "pick_speaker", "arguments": "{\"id\":\"anon\"}" }
                    }]
                }
            }]
        })))
        .mount(&server)
        .await;

    let client = OpenAiCompatibleClient::new(source("a", &server)).unwrap();
    let tools = [json!({ "type": "function", "function": { "name": "pick_speaker" } })];
    let completion = client.invoke(&[], Some(&tools)).await.unwrap();

    assert_eq!(completion.content, "");
    assert_eq!(completion.tool_calls.len(), 1);
    assert_eq!(completion.tool_calls[0].name, "pick_speaker");
    assert_eq!(completion.tool_calls[0].arguments, "{\"id\":\"anon\"}");
}

#[tokio::test]
async fn test_client_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(reply("late"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut src = source("slow", &server);
    src.timeout_secs = 1;
    let client = OpenAiCompatibleClient::new(src).unwrap();
    let err = client.invoke(&[], None).await.unwrap_err();
    assert!(matches!(err, LlmError::Timeout), "got {err:?}");
}

// ── FallbackModel over HTTP ─────────────────────────────────────────

#[tokio::test]
async fn test_fallback_to_second_source() {
    let failing = MockServer::start().await;
    let healthy = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&failing)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("backup here")))
        .expect(1)
        .mount(&healthy)
        .await;

    let mut primary = source("primary", &failing);
    primary.priority = 1;
    primary.max_retries = 1;
    let mut backup = source("backup", &healthy);
    backup.priority = 2;

    // Listed backwards; priority decides the order.
    let config = ModelConfig {
        sources: vec![backup, primary],
        fallback_message: None,
    };
    let model = FallbackModel::from_config(&config)
        .unwrap()
        .with_retry_wait(Duration::from_millis(1));

    let completion = model.invoke(&[ChatMessage::user("hi")], None).await.unwrap();
    assert_eq!(completion.content, "backup here");

    let stats = model.stats();
    assert_eq!(stats[0].name, "primary");
    assert_eq!(stats[0].failures, 1);
    assert_eq!(stats[1].successes, 1);
}

#[tokio::test]
async fn test_all_sources_down_without_fallback_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let mut only = source("only", &server);
    only.max_retries = 2;
    let config = ModelConfig {
        sources: vec![only],
        fallback_message: None,
    };
    let model = FallbackModel::from_config(&config)
        .unwrap()
        .with_retry_wait(Duration::from_millis(1));

    let err = model.invoke(&[], None).await.unwrap_err();
    match err {
        LlmError::Exhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert!(last.contains("502"));
        }
        other => panic!("expected exhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn test_all_sources_down_with_fallback_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut only = source("only", &server);
    only.max_retries = 0;
    let config = ModelConfig {
        sources: vec![only],
        fallback_message: Some("Sorry, the band is tuning.".into()),
    };
    let model = FallbackModel::from_config(&config).unwrap();

    let completion = model.invoke(&[], None).await.unwrap();
    assert_eq!(completion.content, "Sorry, the band is tuning.");
}
