//! Structured-output acquisition for chat-completion backends.
//!
//! The crate wraps a chat-completion [`Transport`] in two bounded retry loops:
//!
//! - [`Orchestrator`] - resolves the model, drives the attempts, returns a [`CallResult`]
//! - [`extract`] - pulls a JSON value out of free-form model output
//! - [`Backoff`] / [`classify_message`] - transient-failure detection and delays
//! - [`ModelResolver`] - maps a model identifier onto a [`Backend`] and URI
//! - [`DiagnosticSink`] - best-effort record of the last request
//!
//! Backends themselves live in separate adapter crates; this crate only sees
//! them through the [`Transport`] trait.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod extract;
pub mod feedback;
pub mod message;
pub mod orchestrator;
pub mod resolver;
pub mod retry;
pub mod transport;
pub mod usage;

pub use config::{BackoffConfig, RequesterConfig};
pub use diagnostics::{DiagnosticSink, FileSink, LastRequest, NoopSink};
pub use error::{AskError, ErrorClass, MalformedOutput, TransportError};
pub use extract::{extract, extract_json, Extracted};
pub use message::{Message, Role, SchemaDescriptor};
pub use orchestrator::{CallOutput, CallResult, Orchestrator, OrchestratorBuilder};
pub use resolver::{Backend, ModelReference, ModelResolver};
pub use retry::{classify_message, classify_status, Backoff};
pub use transport::{ChatPayload, Reply, Transport};
pub use usage::Usage;

/// Common imports for code that drives the orchestrator.
pub mod prelude {
    pub use crate::{
        AskError, Backend, CallOutput, CallResult, Message, Orchestrator, RequesterConfig, Role,
        SchemaDescriptor, Transport, Usage,
    };
}
