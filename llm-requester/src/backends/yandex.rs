//! Native Yandex Foundation Models completion.

use async_trait::async_trait;
use llm_requester_core::{ChatPayload, Reply, Transport, TransportError, Usage};
use llm_requester_yandex::{CompletionRequest, YandexClient, YandexError, YandexMessage};

use super::request_failure;

/// Sends payloads to the native Yandex completion endpoint.
#[derive(Clone)]
pub struct YandexTransport {
    client: YandexClient,
}

impl YandexTransport {
    /// Wraps a configured client.
    #[must_use]
    pub const fn new(client: YandexClient) -> Self {
        Self { client }
    }
}

/// Translates the payload: `content` becomes `text`, the schema goes into `jsonSchema`.
#[must_use]
pub fn to_request(payload: ChatPayload<'_>) -> CompletionRequest {
    let messages = payload
        .messages
        .iter()
        .map(|m| YandexMessage::new(m.role.as_str(), m.content.clone()))
        .collect();
    let mut request = CompletionRequest::new(payload.model_uri, messages);
    request.completion_options.temperature = payload.temperature;
    request.completion_options.stream = payload.stream;
    if let Some(schema) = payload.schema {
        request = request.with_json_schema(schema.schema.clone());
    }
    request
}

/// Classifies an adapter error for the retry loop.
#[must_use]
pub fn classify(error: &YandexError) -> TransportError {
    match error {
        YandexError::Status { status, .. } => TransportError::from_status(*status, error.to_string()),
        YandexError::Request {
            is_timeout,
            is_connect,
            ..
        } => request_failure(*is_timeout, *is_connect, error.to_string()),
        YandexError::Decode(_) => TransportError::from_message(error.to_string()),
        YandexError::EmptyAlternatives | YandexError::Client(_) | YandexError::InvalidApiKey(_) => {
            TransportError::permanent(error.to_string())
        }
    }
}

#[async_trait]
impl Transport for YandexTransport {
    async fn send(&self, payload: ChatPayload<'_>) -> Result<Reply, TransportError> {
        let response = self
            .client
            .complete(&to_request(payload))
            .await
            .map_err(|e| classify(&e))?;

        let usage = response.usage();
        let text = response.first_text().unwrap_or_default().to_string();
        Ok(Reply::new(
            text,
            Usage::new(usage.input_text_tokens, usage.completion_tokens),
        ))
    }
}
