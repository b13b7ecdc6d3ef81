//! Wire-level tests against a one-shot local HTTP responder.
//!
//! The live test at the bottom needs `OPENROUTER_API_KEY` and network access:
//!
//! ```bash
//! cargo test -p llm-requester-openai -- --ignored
//! ```

use llm_requester_openai::{ChatCompletionRequest, ChatMessage, OpenAiClient, OpenAiConfig, OpenAiError};
use responder::serve_once;
use serde_json::json;
use tokio::net::TcpListener;

#[path = "../../testing/responder.rs"]
mod responder;

fn request() -> ChatCompletionRequest {
    ChatCompletionRequest::new(
        "qwen/qwen3-235b-a22b-2507",
        vec![
            ChatMessage::new("system", "You check documents."),
            ChatMessage::new("user", "Is there a deadline?"),
        ],
    )
    .with_json_schema("Verdict", json!({"type": "object"}))
}

#[tokio::test]
async fn test_chat_sends_auth_headers_and_body() {
    let body = json!({
        "id": "c1",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": "{\"ok\": true}"}}],
        "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
    })
    .to_string();
    let (base, server) = serve_once("200 OK", &body).await;

    let client = OpenAiClient::new(
        OpenAiConfig::new(format!("{base}/v1"), "sk-test")
            .with_header("HTTP-Referer", "https://example.org")
            .with_header("X-Title", "TZ-Expert"),
    )
    .unwrap();
    let completion = client.chat(&request()).await.unwrap();

    assert_eq!(completion.first_text(), Some("{\"ok\": true}"));
    let usage = completion.usage.unwrap();
    assert_eq!((usage.prompt_tokens, usage.completion_tokens), (12, 4));

    let raw = server.await.unwrap();
    let lower = raw.to_lowercase();
    assert!(raw.starts_with("POST /v1/chat/completions "));
    assert!(lower.contains("authorization: bearer sk-test"));
    assert!(lower.contains("x-title: tz-expert"));
    assert!(lower.contains("http-referer: https://example.org"));
    assert!(raw.contains("\"response_format\""));
    assert!(raw.contains("\"stream\":false"));
}

#[tokio::test]
async fn test_chat_maps_error_status() {
    let (base, server) = serve_once("429 Too Many Requests", "{\"error\":\"rate limit\"}").await;
    let client = OpenAiClient::new(OpenAiConfig::new(format!("{base}/v1"), "k")).unwrap();

    let err = client.chat(&request()).await.unwrap_err();

    assert_eq!(err.status_code(), Some(429));
    assert!(err.to_string().contains("rate limit"));
    server.await.unwrap();
}

#[tokio::test]
async fn test_chat_rejects_empty_choices() {
    let (base, server) = serve_once("200 OK", "{\"choices\": []}").await;
    let client = OpenAiClient::new(OpenAiConfig::new(format!("{base}/v1"), "k")).unwrap();

    let err = client.chat(&request()).await.unwrap_err();

    assert!(matches!(err, OpenAiError::EmptyChoices));
    server.await.unwrap();
}

#[tokio::test]
async fn test_chat_reports_undecodable_body() {
    let (base, server) = serve_once("200 OK", "<html>gateway</html>").await;
    let client = OpenAiClient::new(OpenAiConfig::new(format!("{base}/v1"), "k")).unwrap();

    let err = client.chat(&request()).await.unwrap_err();

    assert!(matches!(err, OpenAiError::Decode(_)));
    server.await.unwrap();
}

#[tokio::test]
async fn test_connection_refused_is_request_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = OpenAiClient::new(OpenAiConfig::new(format!("http://{addr}/v1"), "k")).unwrap();

    let err = client.chat(&request()).await.unwrap_err();

    assert!(matches!(err, OpenAiError::Request { is_connect: true, .. }));
}

#[tokio::test]
#[ignore = "Requires OPENROUTER_API_KEY and network access"]
async fn e2e_openrouter_chat() {
    let Ok(key) = std::env::var("OPENROUTER_API_KEY") else {
        return;
    };
    let client = OpenAiClient::new(OpenAiConfig::new("https://openrouter.ai/api/v1", key)).unwrap();
    let request = ChatCompletionRequest::new(
        "qwen/qwen3-235b-a22b-2507",
        vec![ChatMessage::new("user", "Reply with the JSON object {\"ok\": true} and nothing else.")],
    );

    let completion = client.chat(&request).await.unwrap();
    assert!(completion.first_text().is_some_and(|text| text.contains("ok")));
}
