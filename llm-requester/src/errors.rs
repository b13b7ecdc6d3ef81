use llm_requester_core::AskError;
use llm_requester_openai::OpenAiError;
use llm_requester_yandex::YandexError;
use thiserror::Error;

use crate::settings::ConfigError;

/// Errors relating to the requester front end.
#[derive(Debug, Error)]
pub enum RequesterError {
    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error building the OpenAI-compatible client.
    #[error("OpenAI-compatible adapter error: {0}")]
    OpenAi(#[from] OpenAiError),

    /// Error building the Yandex client.
    #[error("Yandex adapter error: {0}")]
    Yandex(#[from] YandexError),

    /// The structured call failed.
    #[error(transparent)]
    Ask(#[from] AskError),

    /// The request was rejected before any call was made.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}
