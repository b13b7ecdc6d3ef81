//! Model identifier → backend and fully-qualified model URI.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix of fully-qualified Yandex Cloud model URIs.
pub const YANDEX_URI_PREFIX: &str = "gpt://";
/// Prefix of model identifiers routed to OpenRouter.
pub const OPENROUTER_PREFIX: &str = "openrouter/";
/// Model path used when no model is requested from a Yandex-family backend.
pub const DEFAULT_YANDEX_MODEL: &str = "yandexgpt/latest";
/// Model used when no model is requested from OpenRouter.
pub const DEFAULT_OPENROUTER_MODEL: &str = "qwen/qwen3-235b-a22b-2507";

/// One concrete chat-completion integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// OpenAI-compatible `chat/completions` endpoint (Yandex Cloud's compatibility layer).
    OpenAiCompatible,
    /// Yandex Cloud's native `foundationModels/v1/completion` endpoint.
    YandexCompletion,
    /// OpenRouter's OpenAI-compatible endpoint.
    OpenRouter,
}

impl Backend {
    /// Whether model URIs for this backend are folder-scoped `gpt://` URIs.
    #[must_use]
    pub const fn uses_folder_uris(self) -> bool {
        matches!(self, Self::OpenAiCompatible | Self::YandexCompletion)
    }

    /// Turns a bare model name into this backend's fully-qualified form.
    #[must_use]
    pub fn qualify(self, name: &str, folder_id: &str) -> String {
        if self.uses_folder_uris() {
            format!("{YANDEX_URI_PREFIX}{folder_id}/{name}")
        } else {
            name.to_string()
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OpenAiCompatible => "openai-compatible",
            Self::YandexCompletion => "yandex-completion",
            Self::OpenRouter => "openrouter",
        })
    }
}

/// A resolved destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelReference {
    /// Backend the call is routed to.
    pub backend: Backend,
    /// Model identifier exactly as sent to the backend.
    pub model_uri: String,
}

/// Pure, configuration-driven model resolution. Never fails.
#[derive(Debug, Clone)]
pub struct ModelResolver {
    folder_id: String,
    default_backend: Backend,
    yandex_backend: Backend,
    openrouter_default: String,
}

impl ModelResolver {
    /// Creates a resolver for the given Yandex Cloud folder.
    ///
    /// Defaults: bare names and empty input go to the OpenAI-compatible
    /// backend, and `gpt://` URIs are sent there too.
    #[must_use]
    pub fn new(folder_id: impl Into<String>) -> Self {
        Self {
            folder_id: folder_id.into(),
            default_backend: Backend::OpenAiCompatible,
            yandex_backend: Backend::OpenAiCompatible,
            openrouter_default: DEFAULT_OPENROUTER_MODEL.to_string(),
        }
    }

    /// Backend used for empty input and bare model names.
    #[must_use]
    pub const fn with_default_backend(mut self, backend: Backend) -> Self {
        self.default_backend = backend;
        self
    }

    /// Backend that receives `gpt://` URIs. Must be a folder-URI backend;
    /// anything else is ignored.
    #[must_use]
    pub const fn with_yandex_backend(mut self, backend: Backend) -> Self {
        if backend.uses_folder_uris() {
            self.yandex_backend = backend;
        }
        self
    }

    /// Model used for empty input when the default backend is OpenRouter.
    #[must_use]
    pub fn with_openrouter_default(mut self, model: impl Into<String>) -> Self {
        self.openrouter_default = model.into();
        self
    }

    /// The configured default backend.
    #[must_use]
    pub const fn default_backend(&self) -> Backend {
        self.default_backend
    }

    /// Resolves against the default backend.
    #[must_use]
    pub fn resolve(&self, model: Option<&str>) -> ModelReference {
        self.resolve_for(model, None)
    }

    /// Resolves, routing empty input and bare names to `backend` when given.
    ///
    /// Fully-qualified inputs always keep their own backend.
    #[must_use]
    pub fn resolve_for(&self, model: Option<&str>, backend: Option<Backend>) -> ModelReference {
        let target = backend.unwrap_or(self.default_backend);
        let model = model.map(str::trim).unwrap_or_default();

        if model.is_empty() {
            return ModelReference {
                backend: target,
                model_uri: self.default_uri(target),
            };
        }
        if model.starts_with(YANDEX_URI_PREFIX) {
            return ModelReference {
                backend: self.yandex_backend,
                model_uri: model.to_string(),
            };
        }
        if model.starts_with(OPENROUTER_PREFIX) {
            return ModelReference {
                backend: Backend::OpenRouter,
                model_uri: model.to_string(),
            };
        }

        ModelReference {
            backend: target,
            model_uri: target.qualify(model, &self.folder_id),
        }
    }

    fn default_uri(&self, backend: Backend) -> String {
        if backend.uses_folder_uris() {
            backend.qualify(DEFAULT_YANDEX_MODEL, &self.folder_id)
        } else {
            self.openrouter_default.clone()
        }
    }
}
