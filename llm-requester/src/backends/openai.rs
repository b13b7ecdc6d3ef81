//! OpenAI-compatible chat completions: Yandex Cloud's compatibility layer and OpenRouter.

use async_trait::async_trait;
use llm_requester_core::{ChatPayload, Reply, Transport, TransportError, Usage};
use llm_requester_openai::{ChatCompletionRequest, ChatMessage, OpenAiClient, OpenAiError};

use super::request_failure;

/// Sends payloads to an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiTransport {
    client: OpenAiClient,
}

impl OpenAiTransport {
    /// Wraps a configured client.
    #[must_use]
    pub const fn new(client: OpenAiClient) -> Self {
        Self { client }
    }
}

/// Translates the payload into the OpenAI wire request.
#[must_use]
pub fn to_request(payload: ChatPayload<'_>) -> ChatCompletionRequest {
    let messages = payload
        .messages
        .iter()
        .map(|m| ChatMessage::new(m.role.as_str(), m.content.clone()))
        .collect();
    let mut request = ChatCompletionRequest::new(payload.model_uri, messages);
    request.temperature = payload.temperature;
    request.stream = payload.stream;
    if let Some(schema) = payload.schema {
        request = request.with_json_schema(schema.name.clone(), schema.schema.clone());
    }
    request
}

/// Classifies an adapter error for the retry loop.
#[must_use]
pub fn classify(error: &OpenAiError) -> TransportError {
    match error {
        OpenAiError::Status { status, .. } => TransportError::from_status(*status, error.to_string()),
        OpenAiError::Request {
            is_timeout,
            is_connect,
            ..
        } => request_failure(*is_timeout, *is_connect, error.to_string()),
        OpenAiError::Decode(_) => TransportError::from_message(error.to_string()),
        OpenAiError::EmptyChoices | OpenAiError::Client(_) | OpenAiError::InvalidHeader { .. } => {
            TransportError::permanent(error.to_string())
        }
    }
}

#[async_trait]
impl Transport for OpenAiTransport {
    async fn send(&self, payload: ChatPayload<'_>) -> Result<Reply, TransportError> {
        let completion = self
            .client
            .chat(&to_request(payload))
            .await
            .map_err(|e| classify(&e))?;

        let usage = completion
            .usage
            .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();
        let text = completion.first_text().unwrap_or_default().to_string();
        Ok(Reply::new(text, usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_requester_core::{Message, SchemaDescriptor};
    use serde_json::json;

    #[test]
    fn test_to_request_carries_schema_and_roles() {
        let messages = vec![Message::system("s"), Message::user("u")];
        let schema = SchemaDescriptor::new("GroupReport", json!({"type": "object"}));
        let payload = ChatPayload {
            model_uri: "gpt://f1/yandexgpt/latest",
            messages: &messages,
            schema: Some(&schema),
            temperature: 0.0,
            stream: false,
        };

        let value = serde_json::to_value(to_request(payload)).unwrap();

        assert_eq!(value["model"], "gpt://f1/yandexgpt/latest");
        assert_eq!(value["messages"][0], json!({"role": "system", "content": "s"}));
        assert_eq!(value["response_format"]["json_schema"]["name"], "GroupReport");
    }

    #[test]
    fn test_classify_status_errors() {
        assert!(classify(&OpenAiError::status(429, "rate limit")).is_transient());
        assert!(classify(&OpenAiError::status(503, "")).is_transient());
        assert!(!classify(&OpenAiError::status(401, "unauthorized")).is_transient());
        assert!(!classify(&OpenAiError::status(400, "bad request")).is_transient());
        assert!(!classify(&OpenAiError::EmptyChoices).is_transient());
    }
}
