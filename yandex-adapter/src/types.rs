use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://llm.api.cloud.yandex.net";
pub const COMPLETION_PATH: &str = "/foundationModels/v1/completion";

#[derive(Debug, Clone)]
pub struct YandexConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Option<Duration>,
}

impl YandexConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn completion_url(&self) -> String {
        format!("{}{COMPLETION_PATH}", self.base_url.trim_end_matches('/'))
    }
}

/// Native messages carry `text` where OpenAI uses `content`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YandexMessage {
    pub role: String,
    pub text: String,
}

impl YandexMessage {
    pub fn new(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOptions {
    pub stream: bool,
    pub temperature: f32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            stream: false,
            temperature: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonSchemaBody {
    pub schema: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    pub model_uri: String,
    pub completion_options: CompletionOptions,
    pub messages: Vec<YandexMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_schema: Option<JsonSchemaBody>,
}

impl CompletionRequest {
    pub fn new(model_uri: impl Into<String>, messages: Vec<YandexMessage>) -> Self {
        Self {
            model_uri: model_uri.into(),
            completion_options: CompletionOptions::default(),
            messages,
            json_schema: None,
        }
    }

    #[must_use]
    pub fn with_json_schema(mut self, schema: Value) -> Self {
        self.json_schema = Some(JsonSchemaBody { schema });
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YandexUsage {
    #[serde(default, deserialize_with = "count")]
    pub input_text_tokens: u64,
    #[serde(default, deserialize_with = "count")]
    pub completion_tokens: u64,
    #[serde(default, deserialize_with = "count")]
    pub total_tokens: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AlternativeMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Alternative {
    #[serde(default)]
    pub message: AlternativeMessage,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResult {
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
    #[serde(default)]
    pub usage: Option<YandexUsage>,
    #[serde(default)]
    pub model_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompletionResponse {
    pub result: CompletionResult,
}

impl CompletionResponse {
    pub fn first_text(&self) -> Option<&str> {
        self.result
            .alternatives
            .first()
            .map(|alt| alt.message.text.as_str())
    }

    pub fn usage(&self) -> YandexUsage {
        self.result.usage.unwrap_or_default()
    }
}

/// The API encodes int64 counters as JSON strings; accept both forms.
fn count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(u64),
        Text(String),
    }

    match Count::deserialize(deserializer)? {
        Count::Number(n) => Ok(n),
        Count::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
