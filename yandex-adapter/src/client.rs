use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;

use crate::error::YandexError;
use crate::types::{CompletionRequest, CompletionResponse, YandexConfig};

/// Shared, pooled client for the native completion endpoint.
#[derive(Clone)]
pub struct YandexClient {
    http: Client,
    url: String,
}

impl YandexClient {
    /// # Errors
    /// Returns an error if the API key is not a valid header value or the client cannot be built.
    pub fn new(config: YandexConfig) -> Result<Self, YandexError> {
        let auth = HeaderValue::from_str(&format!("Api-Key {}", config.api_key))
            .map_err(|e| YandexError::InvalidApiKey(e.to_string()))?;
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(YandexError::Client)?;

        Ok(Self {
            http,
            url: config.completion_url(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sends one synchronous completion request.
    ///
    /// # Errors
    /// Non-2xx answers become [`YandexError::Status`]; network failures become
    /// [`YandexError::Request`]; a response without alternatives is rejected.
    pub async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, YandexError> {
        tracing::debug!(url = %self.url, model_uri = %request.model_uri, "POST completion");

        let response = self.http.post(&self.url).json(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(YandexError::status(status.as_u16(), &body));
        }

        let parsed: CompletionResponse = serde_json::from_str(&body).map_err(YandexError::Decode)?;
        if parsed.result.alternatives.is_empty() {
            return Err(YandexError::EmptyAlternatives);
        }
        Ok(parsed)
    }
}
