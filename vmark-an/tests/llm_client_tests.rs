//! LLM client against a mock OpenAI-compatible endpoint

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use vmark_an::services::{LlmClient, LlmError};
use vmark_common::config::ApiConfig;

#[derive(Clone, Default)]
struct Captured {
    body: Arc<Mutex<Option<Value>>>,
    auth: Arc<Mutex<Option<String>>>,
}

/// Serve `router` on an ephemeral port and return its base URL
async fn spawn_mock(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/v1", addr)
}

fn mock_with_reply(reply: Value, captured: Captured) -> Router {
    Router::new()
        .route(
            "/v1/chat/completions",
            post(
                move |State(captured): State<Captured>, headers: HeaderMap, Json(body): Json<Value>| {
                    let reply = reply.clone();
                    async move {
                        *captured.auth.lock().unwrap() = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        *captured.body.lock().unwrap() = Some(body);
                        Json(reply)
                    }
                },
            ),
        )
        .with_state(captured)
}

fn config(api_base: String) -> ApiConfig {
    ApiConfig {
        api_keys: vec!["sk-test".to_string()],
        api_base,
        model: "test-model".to_string(),
        system_prompt: "system text".to_string(),
        user_prompt_template: "D: {description} | F: {final_diagnosis}".to_string(),
        ..ApiConfig::default()
    }
}

#[tokio::test]
async fn test_request_shape_and_reasoning_content() {
    let captured = Captured::default();
    let reply = json!({
        "choices": [{
            "message": {
                "role": "assistant",
                "reasoning_content": "native reasoning",
                "content": "final answer"
            }
        }]
    });
    let base = spawn_mock(mock_with_reply(reply, captured.clone())).await;
    let client = LlmClient::new(config(base)).unwrap();

    let answer = client.complete("walks slowly", "Label 1").await.unwrap();
    assert_eq!(answer.reasoning, "native reasoning");
    assert_eq!(answer.answer, "final answer");
    assert!(!answer.failed);

    assert_eq!(captured.auth.lock().unwrap().as_deref(), Some("Bearer sk-test"));
    let body = captured.body.lock().unwrap().clone().unwrap();
    assert_eq!(body["model"], "test-model");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][0]["content"], "system text");
    assert_eq!(body["messages"][1]["role"], "user");
    assert_eq!(body["messages"][1]["content"], "D: walks slowly | F: Label 1");
}

#[tokio::test]
async fn test_thinking_fence_in_content() {
    let reply = json!({
        "choices": [{
            "message": { "content": "```thinking\nlook at gait\n```\nLabel 2" }
        }]
    });
    let base = spawn_mock(mock_with_reply(reply, Captured::default())).await;
    let client = LlmClient::new(config(base)).unwrap();

    let answer = client.generate("desc", "diag").await;
    assert_eq!(answer.reasoning, "look at gait");
    assert_eq!(answer.answer, "Label 2");
}

#[tokio::test]
async fn test_http_error_becomes_placeholder() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async { (StatusCode::UNAUTHORIZED, "bad key") }),
    );
    let base = spawn_mock(router).await;
    let client = LlmClient::new(config(base)).unwrap();

    match client.complete("desc", "diag").await {
        Err(LlmError::ApiError(status, body)) => {
            assert_eq!(status, 401);
            assert_eq!(body, "bad key");
        }
        other => panic!("Expected ApiError, got {:?}", other),
    }

    let answer = client.generate("desc", "diag").await;
    assert!(answer.failed);
    assert!(answer.reasoning.contains("401"));
}

#[tokio::test]
async fn test_empty_choices_and_malformed_body() {
    let base = spawn_mock(mock_with_reply(json!({ "choices": [] }), Captured::default())).await;
    let client = LlmClient::new(config(base)).unwrap();
    assert!(matches!(
        client.complete("d", "f").await,
        Err(LlmError::EmptyResponse)
    ));

    let router = Router::new().route("/v1/chat/completions", post(|| async { "not json" }));
    let base = spawn_mock(router).await;
    let client = LlmClient::new(config(base)).unwrap();
    assert!(matches!(
        client.complete("d", "f").await,
        Err(LlmError::ParseError(_))
    ));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_network_error() {
    // Bind then drop to get a port nobody listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = LlmClient::new(config(format!("http://{}", addr))).unwrap();
    assert!(matches!(
        client.complete("d", "f").await,
        Err(LlmError::NetworkError(_))
    ));
    assert!(client.generate("d", "f").await.failed);
}
