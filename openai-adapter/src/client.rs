use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Client;

use crate::error::OpenAiError;
use crate::types::{ChatCompletion, ChatCompletionRequest, OpenAiConfig};

/// Shared, pooled client for one OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    url: String,
}

impl OpenAiClient {
    /// Builds the pooled HTTP client with auth and extra headers baked in.
    ///
    /// # Errors
    /// Returns an error if a header is not valid HTTP or the client cannot be built.
    pub fn new(config: OpenAiConfig) -> Result<Self, OpenAiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            header_value("Authorization", &format!("Bearer {}", config.api_key))?,
        );
        for (name, value) in &config.extra_headers {
            let header = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                OpenAiError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                }
            })?;
            headers.insert(header, header_value(name, value)?);
        }

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(OpenAiError::Client)?;

        Ok(Self {
            http,
            url: config.chat_completions_url(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sends one non-streaming chat completion.
    ///
    /// # Errors
    /// Non-2xx answers become [`OpenAiError::Status`]; network failures become
    /// [`OpenAiError::Request`]; a body that does not decode, or decodes without
    /// choices, is reported as such.
    pub async fn chat(&self, request: &ChatCompletionRequest) -> Result<ChatCompletion, OpenAiError> {
        tracing::debug!(url = %self.url, model = %request.model, "POST chat completions");

        let response = self.http.post(&self.url).json(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(OpenAiError::status(status.as_u16(), &body));
        }

        let completion: ChatCompletion =
            serde_json::from_str(&body).map_err(OpenAiError::Decode)?;
        if completion.choices.is_empty() {
            return Err(OpenAiError::EmptyChoices);
        }
        Ok(completion)
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, OpenAiError> {
    HeaderValue::from_str(value).map_err(|e| OpenAiError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })
}
