use thiserror::Error;

/// Response bodies are cut to this many characters in error messages.
pub const MAX_BODY_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum YandexError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("YC {status}: {body}")]
    Status { status: u16, body: String },

    #[error("YC request failed: {source}")]
    Request {
        is_timeout: bool,
        is_connect: bool,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse YC completion JSON: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("YC response has no alternatives")]
    EmptyAlternatives,

    #[error("Invalid API key header: {0}")]
    InvalidApiKey(String),
}

impl YandexError {
    pub fn status(status: u16, body: &str) -> Self {
        Self::Status {
            status,
            body: body.chars().take(MAX_BODY_CHARS).collect(),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for YandexError {
    fn from(source: reqwest::Error) -> Self {
        Self::Request {
            is_timeout: source.is_timeout(),
            is_connect: source.is_connect(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_keeps_head_of_body() {
        let err = YandexError::status(500, &"e".repeat(1_000));
        assert_eq!(err.status_code(), Some(500));
        assert_eq!(err.to_string().len(), "YC 500: ".len() + MAX_BODY_CHARS);
    }
}
