#![deny(missing_docs)]
//! Front end of the structured LLM requester.
//!
//! Reads [`settings::Settings`], registers one transport per configured
//! backend and hands back a ready [`Orchestrator`]. Also hosts the prompt
//! builder and the typed group report.

/// Transports over the adapter crates.
pub mod backends;
/// Error types for the front end.
pub mod errors;
/// Conversation and schema builders.
pub mod prompt;
/// Typed group report model.
pub mod report;
/// Environment configuration.
pub mod settings;

use std::sync::Arc;

use llm_requester_core::{Backend, CallResult, FileSink, Message, Orchestrator, SchemaDescriptor};
use llm_requester_openai::{OpenAiClient, OpenAiConfig};
use llm_requester_yandex::{YandexClient, YandexConfig};

use backends::{OpenAiTransport, YandexTransport};
use errors::RequesterError;
use settings::{Settings, YandexApi};

pub use prompt::{build_group_messages, build_rule_messages, group_report_schema, Group, Rule};
pub use report::GroupReport;

/// Minimum conversation length accepted by [`ask_checked`]: a system prompt and a user turn.
pub const MIN_MESSAGES: usize = 2;

/// Builds the orchestrator for `settings`.
///
/// Yandex is always registered under the backend its API family maps to;
/// OpenRouter only when a key is configured.
pub fn build_orchestrator(settings: &Settings) -> Result<Orchestrator, RequesterError> {
    let timeout = settings.requester.request_timeout;
    let mut builder = Orchestrator::builder(settings.resolver())
        .config(settings.requester.clone())
        .sink(Arc::new(FileSink::new(&settings.request_log_dir)));

    let yandex = &settings.yandex;
    builder = match yandex.api {
        YandexApi::OpenAi => {
            let client = OpenAiClient::new(
                OpenAiConfig::new(&yandex.base_url, &yandex.api_key).with_timeout(timeout),
            )?;
            builder.transport(Backend::OpenAiCompatible, Arc::new(OpenAiTransport::new(client)))
        }
        YandexApi::Native => {
            let client = YandexClient::new(
                YandexConfig::new(&yandex.api_key)
                    .with_base_url(&yandex.completion_url)
                    .with_timeout(timeout),
            )?;
            builder.transport(Backend::YandexCompletion, Arc::new(YandexTransport::new(client)))
        }
    };

    if let Some(openrouter) = &settings.openrouter {
        let mut config = OpenAiConfig::new(&openrouter.base_url, &openrouter.api_key)
            .with_header("X-Title", &openrouter.title)
            .with_timeout(timeout);
        if let Some(referer) = &openrouter.referer {
            config = config.with_header("HTTP-Referer", referer);
        }
        let client = OpenAiClient::new(config)?;
        builder = builder.transport(Backend::OpenRouter, Arc::new(OpenAiTransport::new(client)));
    }

    let orchestrator = builder.build();
    tracing::info!(
        default_backend = %settings.default_backend(),
        backends = ?orchestrator.backends(),
        max_concurrent = settings.requester.max_concurrent,
        "orchestrator ready"
    );
    Ok(orchestrator)
}

/// Rejects conversations shorter than [`MIN_MESSAGES`], then runs [`Orchestrator::ask`].
pub async fn ask_checked(
    orchestrator: &Orchestrator,
    messages: &[Message],
    schema: Option<&SchemaDescriptor>,
    model: Option<&str>,
) -> Result<CallResult, RequesterError> {
    if messages.len() < MIN_MESSAGES {
        return Err(RequesterError::InvalidRequest(format!(
            "at least {MIN_MESSAGES} messages are required, got {}",
            messages.len()
        )));
    }
    Ok(orchestrator.ask(messages, schema, model).await?)
}
