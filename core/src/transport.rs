//! The seam between the orchestrator and a concrete backend.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::message::{Message, SchemaDescriptor};
use crate::usage::Usage;

/// One chat-completion request, already resolved and ready for the wire.
#[derive(Debug, Clone, Copy)]
pub struct ChatPayload<'a> {
    /// Fully-qualified model identifier.
    pub model_uri: &'a str,
    /// Conversation, including any corrective messages.
    pub messages: &'a [Message],
    /// Structured-output schema, attached only when requested.
    pub schema: Option<&'a SchemaDescriptor>,
    /// Sampling temperature. The orchestrator always sends 0.
    pub temperature: f32,
    /// Streaming flag. The orchestrator always sends `false`.
    pub stream: bool,
}

/// Text and usage of one successful round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// First choice's message text; empty if the backend sent none.
    pub text: String,
    /// Usage reported for this round-trip.
    pub usage: Usage,
}

impl Reply {
    /// Creates a reply.
    #[must_use]
    pub fn new(text: impl Into<String>, usage: Usage) -> Self {
        Self {
            text: text.into(),
            usage,
        }
    }
}

/// A backend that can perform one chat-completion round-trip.
///
/// Implementations must be safe to share across concurrent calls and must
/// classify their failures as transient or permanent.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one request.
    async fn send(&self, payload: ChatPayload<'_>) -> Result<Reply, TransportError>;
}
