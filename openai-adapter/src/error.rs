use thiserror::Error;

/// Response bodies are cut to this many characters in error messages.
pub const MAX_BODY_CHARS: usize = 2_000;

#[derive(Debug, Error)]
pub enum OpenAiError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Chat completions error: status={status} body={body}")]
    Status { status: u16, body: String },

    #[error("Chat completions request failed: {source}")]
    Request {
        is_timeout: bool,
        is_connect: bool,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse chat completions JSON: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Missing choices[0] in chat completions response")]
    EmptyChoices,

    #[error("Invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },
}

impl OpenAiError {
    pub fn status(status: u16, body: &str) -> Self {
        Self::Status {
            status,
            body: truncate_body(body),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for OpenAiError {
    fn from(source: reqwest::Error) -> Self {
        Self::Request {
            is_timeout: source.is_timeout(),
            is_connect: source.is_connect(),
            source,
        }
    }
}

pub fn truncate_body(body: &str) -> String {
    if body.chars().count() <= MAX_BODY_CHARS {
        body.to_string()
    } else {
        let head: String = body.chars().take(MAX_BODY_CHARS).collect();
        format!("{head}...")
    }
}
