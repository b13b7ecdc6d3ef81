//! Orchestration of structured calls: transient retries nested inside JSON-repair retries.
//!
//! Per call the state machine is
//! `Building -> Calling -> {Success, TransientRetry -> Calling, JsonInvalidRetry -> Calling, TerminalFailure}`.
//! Every pass through `Calling` is one network round-trip and counts as one attempt.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::Instrument;

use crate::config::RequesterConfig;
use crate::diagnostics::{DiagnosticSink, LastRequest, NoopSink};
use crate::error::{AskError, MalformedOutput, TransportError};
use crate::extract::{extract_json, Extracted};
use crate::feedback::{check_schema, compile_schema, corrective_message};
use crate::message::{Message, SchemaDescriptor};
use crate::resolver::{Backend, ModelReference, ModelResolver};
use crate::retry::Backoff;
use crate::transport::{ChatPayload, Reply, Transport};
use crate::usage::Usage;

/// The terminal value of a successful call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CallOutput {
    /// Parsed object or array; always the case when a schema was requested.
    Json(Value),
    /// Raw model text; always the case when no schema was requested.
    Text(String),
}

impl CallOutput {
    /// The parsed value, if structured output was requested.
    #[must_use]
    pub const fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    /// The raw text, if no structured output was requested.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Json(_) => None,
        }
    }
}

impl From<Extracted> for CallOutput {
    fn from(extracted: Extracted) -> Self {
        match extracted {
            Extracted::Json(value) => Self::Json(value),
            Extracted::Text(text) => Self::Text(text),
        }
    }
}

/// Everything a caller learns from one successful [`Orchestrator::ask`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallResult {
    /// Parsed JSON or raw text.
    pub result: CallOutput,
    /// Usage summed over every attempt, failed ones included.
    pub usage: Usage,
    /// Model identifier the calls were sent with.
    pub model_uri: String,
    /// Network round-trips made, across both retry dimensions. Always at least 1.
    pub attempts: u32,
}

/// What one attempt amounted to. Consumed by the retry loop in [`Orchestrator::ask`].
#[derive(Debug)]
pub enum Outcome {
    /// The reply satisfies the request.
    Success(Extracted),
    /// The backend failed in a way worth retrying as-is.
    TransientFailure(TransportError),
    /// The backend failed in a way retrying will not fix.
    PermanentFailure(TransportError),
    /// The backend answered, but without the structured JSON requested.
    MalformedOutput(MalformedOutput),
}

/// Drives structured calls against a fixed set of backends.
///
/// Construct once at startup and share behind an [`Arc`]; the concurrency
/// gate and the transports' connection pools are shared by every call.
pub struct Orchestrator {
    transports: HashMap<Backend, Arc<dyn Transport>>,
    resolver: ModelResolver,
    gate: Arc<Semaphore>,
    config: RequesterConfig,
    sink: Arc<dyn DiagnosticSink>,
}

impl Orchestrator {
    /// Starts building an orchestrator around the given resolver.
    #[must_use]
    pub fn builder(resolver: ModelResolver) -> OrchestratorBuilder {
        OrchestratorBuilder::new(resolver)
    }

    /// The resolver used for every call.
    #[must_use]
    pub const fn resolver(&self) -> &ModelResolver {
        &self.resolver
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &RequesterConfig {
        &self.config
    }

    /// Backends with a registered transport.
    #[must_use]
    pub fn backends(&self) -> Vec<Backend> {
        self.transports.keys().copied().collect()
    }

    /// Free slots in the concurrency gate.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.gate.available_permits()
    }

    /// Runs one logical call.
    ///
    /// Without a schema the raw text of the first successful round-trip is
    /// returned. With a schema, malformed answers trigger up to
    /// `max_retry_json` corrective rounds; each round may itself retry
    /// transient failures up to `max_retry_provider` times. `messages` is
    /// never modified; corrective messages go into a private copy.
    ///
    /// # Errors
    ///
    /// - [`AskError::Provider`] on a permanent failure or when transient retries run out.
    /// - [`AskError::InvalidStructuredOutput`] when corrective rounds run out.
    /// - [`AskError::BackendNotConfigured`] when the model resolves to a backend without a transport.
    /// - [`AskError::InvalidSchema`] when schema validation is enabled and the schema does not compile.
    pub async fn ask(
        &self,
        messages: &[Message],
        schema: Option<&SchemaDescriptor>,
        model: Option<&str>,
    ) -> Result<CallResult, AskError> {
        let reference = self.resolver.resolve(model);
        let transport = self
            .transports
            .get(&reference.backend)
            .cloned()
            .ok_or(AskError::BackendNotConfigured(reference.backend))?;

        self.sink
            .write_last_request(&LastRequest {
                model_uri: reference.model_uri.clone(),
                schema_name: schema.map(|s| s.name.clone()),
            })
            .await;

        let validator = match schema {
            Some(descriptor) if self.config.validate_schema => {
                Some(compile_schema(descriptor).map_err(AskError::InvalidSchema)?)
            }
            _ => None,
        };

        let span = tracing::info_span!(
            "ask",
            backend = %reference.backend,
            model_uri = %reference.model_uri,
            schema = schema.map_or("-", |s| s.name.as_str()),
        );
        self.run(
            transport.as_ref(),
            &reference,
            messages,
            schema,
            validator.as_ref(),
        )
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        transport: &dyn Transport,
        reference: &ModelReference,
        messages: &[Message],
        schema: Option<&SchemaDescriptor>,
        validator: Option<&jsonschema::Validator>,
    ) -> Result<CallResult, AskError> {
        let max_json_attempts = self.config.max_retry_json.saturating_add(1);
        let mut conversation = messages.to_vec();
        let mut usage = Usage::default();
        let mut attempts = 0u32;
        let mut json_retries = 0u32;
        let mut provider_retries = 0u32;
        let mut backoff = Backoff::new(self.config.backoff);

        loop {
            attempts += 1;
            let payload = ChatPayload {
                model_uri: &reference.model_uri,
                messages: &conversation,
                schema,
                temperature: 0.0,
                stream: false,
            };
            tracing::debug!(attempt = attempts, messages = conversation.len(), "calling backend");

            match self.attempt(transport, payload, validator, &mut usage).await {
                Outcome::Success(extracted) => {
                    tracing::info!(
                        attempts,
                        prompt_tokens = usage.prompt_tokens,
                        completion_tokens = usage.completion_tokens,
                        "call succeeded"
                    );
                    return Ok(CallResult {
                        result: extracted.into(),
                        usage,
                        model_uri: reference.model_uri.clone(),
                        attempts,
                    });
                }
                Outcome::TransientFailure(error)
                    if provider_retries < self.config.max_retry_provider =>
                {
                    provider_retries += 1;
                    let delay = backoff.next_delay();
                    tracing::warn!(
                        attempt = attempts,
                        retry = provider_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "transient provider failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Outcome::TransientFailure(error) | Outcome::PermanentFailure(error) => {
                    tracing::error!(attempts, error = %error, "provider call failed");
                    return Err(AskError::Provider {
                        source: error,
                        attempts,
                        usage,
                    });
                }
                Outcome::MalformedOutput(error) if json_retries < self.config.max_retry_json => {
                    json_retries += 1;
                    tracing::warn!(
                        attempt = attempts,
                        round = json_retries,
                        reason = %error.reason,
                        "malformed structured output, sending corrective message"
                    );
                    conversation.push(corrective_message(
                        &error,
                        schema.map(|s| s.name.as_str()),
                        json_retries,
                        max_json_attempts,
                    ));
                    provider_retries = 0;
                    backoff = Backoff::new(self.config.backoff);
                }
                Outcome::MalformedOutput(last) => {
                    tracing::error!(attempts, reason = %last.reason, "no valid JSON after corrective rounds");
                    return Err(AskError::InvalidStructuredOutput {
                        max_attempts: max_json_attempts,
                        attempts,
                        last,
                        usage,
                    });
                }
            }
        }
    }

    /// One round-trip plus extraction. Usage is added even when the attempt fails.
    async fn attempt(
        &self,
        transport: &dyn Transport,
        payload: ChatPayload<'_>,
        validator: Option<&jsonschema::Validator>,
        usage: &mut Usage,
    ) -> Outcome {
        let reply = match self.round_trip(transport, payload).await {
            Ok(reply) => reply,
            Err(error) => {
                if let Some(reported) = error.usage {
                    usage.accumulate(reported);
                }
                return if error.is_transient() {
                    Outcome::TransientFailure(error)
                } else {
                    Outcome::PermanentFailure(error)
                };
            }
        };
        usage.accumulate(reply.usage);

        if payload.schema.is_none() {
            return Outcome::Success(Extracted::Text(reply.text));
        }

        let value = match extract_json(&reply.text) {
            Ok(value) => value,
            Err(error) => return Outcome::MalformedOutput(error),
        };
        if let Some(validator) = validator {
            if let Err(error) = check_schema(validator, &value, &reply.text) {
                return Outcome::MalformedOutput(error);
            }
        }
        Outcome::Success(Extracted::Json(value))
    }

    /// A single gated, time-limited network call.
    ///
    /// The permit is held only for the duration of the call and is released
    /// on every exit path, including when the caller's future is dropped.
    async fn round_trip(
        &self,
        transport: &dyn Transport,
        payload: ChatPayload<'_>,
    ) -> Result<Reply, TransportError> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| TransportError::permanent("concurrency gate closed"))?;

        match tokio::time::timeout(self.config.request_timeout, transport.send(payload)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::timeout(self.config.request_timeout)),
        }
    }
}

/// Builder for [`Orchestrator`].
pub struct OrchestratorBuilder {
    transports: HashMap<Backend, Arc<dyn Transport>>,
    resolver: ModelResolver,
    config: RequesterConfig,
    sink: Arc<dyn DiagnosticSink>,
    gate: Option<Arc<Semaphore>>,
}

impl OrchestratorBuilder {
    /// Creates a builder with default configuration, no transports and a no-op sink.
    #[must_use]
    pub fn new(resolver: ModelResolver) -> Self {
        Self {
            transports: HashMap::new(),
            resolver,
            config: RequesterConfig::default(),
            sink: Arc::new(NoopSink),
            gate: None,
        }
    }

    /// Registers the transport for a backend, replacing any previous one.
    #[must_use]
    pub fn transport(mut self, backend: Backend, transport: Arc<dyn Transport>) -> Self {
        self.transports.insert(backend, transport);
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: RequesterConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the diagnostic sink.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Uses an existing gate instead of creating one from `max_concurrent`.
    ///
    /// Lets several orchestrators share one provider rate limit.
    #[must_use]
    pub fn gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Finishes the orchestrator.
    #[must_use]
    pub fn build(self) -> Orchestrator {
        let gate = self
            .gate
            .unwrap_or_else(|| Arc::new(Semaphore::new(self.config.max_concurrent.max(1))));
        Orchestrator {
            transports: self.transports,
            resolver: self.resolver,
            gate,
            config: self.config,
            sink: self.sink,
        }
    }
}
