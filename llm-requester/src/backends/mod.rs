//! [`Transport`](llm_requester_core::Transport) implementations over the adapter crates.
//!
//! Each bridge maps its adapter's error onto the core classification: HTTP
//! status first, then the request-error flags, then the message text.

pub mod openai;
pub mod yandex;

pub use openai::OpenAiTransport;
pub use yandex::YandexTransport;

use llm_requester_core::TransportError;

/// A request that never produced an HTTP status.
fn request_failure(is_timeout: bool, is_connect: bool, message: String) -> TransportError {
    if is_timeout || is_connect {
        TransportError::transient(message)
    } else {
        TransportError::from_message(message)
    }
}
