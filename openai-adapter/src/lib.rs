#![warn(clippy::pedantic)]
//! Thin client for OpenAI-compatible `/chat/completions` endpoints
//! (Yandex Cloud's compatibility layer, OpenRouter).

pub mod client;
pub mod error;
pub mod types;

pub use client::OpenAiClient;
pub use error::OpenAiError;
pub use types::*;
