//! OpenAI-compatible client against a local stand-in server

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vocab_seed::services::{
    GenerationError, GenerationPrompt, GenerationService, GenerationSettings, OpenAiCompatibleClient, PromptKind,
};

#[derive(Clone, Default)]
struct Captured {
    requests: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

async fn completions(State(captured): State<Captured>, headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    captured.requests.lock().unwrap().push((auth, body));

    Json(json!({
        "choices": [{
            "message": {
                "role": "assistant",
                "content": r#"{"items":[{"word":"kot","example":"Kot śpi.","type":"noun","level":"A1","comment":null}]}"#,
            }
        }]
    }))
}

async fn refusing() -> impl IntoResponse {
    Json(json!({
        "choices": [{"message": {"role": "assistant", "content": null, "refusal": "cannot help"}}]
    }))
}

async fn overloaded() -> impl IntoResponse {
    (StatusCode::TOO_MANY_REQUESTS, "slow down")
}

async fn stalled() -> impl IntoResponse {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({"choices": []}))
}

async fn spawn_server(captured: Captured) -> String {
    let app = Router::new()
        .route("/ok/chat/completions", post(completions))
        .route("/refuse/chat/completions", post(refusing))
        .route("/busy/chat/completions", post(overloaded))
        .route("/slow/chat/completions", post(stalled))
        .with_state(captured);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(base: &str, path: &str, timeout: Duration) -> OpenAiCompatibleClient {
    OpenAiCompatibleClient::new(GenerationSettings {
        api_base: format!("{}/{}/", base, path),
        model: "test-model".to_string(),
        api_key: "sk-test".to_string(),
        timeout,
    })
    .unwrap()
}

fn prompt() -> GenerationPrompt {
    GenerationPrompt {
        kind: PromptKind::Words,
        system: "system text".to_string(),
        instruction: "Generate 1 distinct Polish vocabulary words.".to_string(),
        schema_name: "vocabulary_words",
        item_schema: json!({"type": "object"}),
    }
}

#[tokio::test]
async fn test_generate_sends_schema_and_parses_items() {
    let captured = Captured::default();
    let base = spawn_server(captured.clone()).await;

    let items = client(&base, "ok", Duration::from_secs(5)).generate(&prompt()).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["word"], "kot");

    let requests = captured.requests.lock().unwrap();
    let (auth, body) = &requests[0];
    assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
    assert_eq!(body["model"], "test-model");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "Generate 1 distinct Polish vocabulary words.");
    assert_eq!(body["response_format"]["type"], "json_schema");
    assert_eq!(body["response_format"]["json_schema"]["strict"], true);
    assert_eq!(body["response_format"]["json_schema"]["name"], "vocabulary_words");
    assert_eq!(
        body["response_format"]["json_schema"]["schema"]["properties"]["items"]["type"],
        "array"
    );
}

#[tokio::test]
async fn test_http_error_status_is_reported() {
    let base = spawn_server(Captured::default()).await;

    let err = client(&base, "busy", Duration::from_secs(5)).generate(&prompt()).await.unwrap_err();
    assert!(matches!(err, GenerationError::Http(429, ref body) if body == "slow down"));
}

#[tokio::test]
async fn test_refusal_is_schema_error() {
    let base = spawn_server(Captured::default()).await;

    let err = client(&base, "refuse", Duration::from_secs(5)).generate(&prompt()).await.unwrap_err();
    assert!(matches!(err, GenerationError::Schema(_)));
}

#[tokio::test]
async fn test_slow_service_times_out() {
    let base = spawn_server(Captured::default()).await;

    let err = client(&base, "slow", Duration::from_millis(200)).generate(&prompt()).await.unwrap_err();
    assert!(matches!(err, GenerationError::Timeout));
}

#[test]
fn test_empty_api_key_is_rejected() {
    let result = OpenAiCompatibleClient::new(GenerationSettings {
        api_base: "http://localhost".to_string(),
        model: "m".to_string(),
        api_key: "  ".to_string(),
        timeout: Duration::from_secs(1),
    });
    assert!(matches!(result, Err(GenerationError::MissingApiKey)));
}
