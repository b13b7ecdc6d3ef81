//! Process configuration read from the environment.
//!
//! Parsing goes through a lookup function so tests never touch the real
//! environment. Any error here is fatal at startup.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use llm_requester_core::resolver::DEFAULT_OPENROUTER_MODEL;
use llm_requester_core::{Backend, ModelResolver, RequesterConfig};
use thiserror::Error;

/// Default OpenAI-compatible Yandex endpoint.
pub const DEFAULT_YC_BASE_URL: &str = "https://llm.api.cloud.yandex.net/v1";
/// Default host of the native Yandex completion endpoint.
pub const DEFAULT_YC_COMPLETION_URL: &str = "https://llm.api.cloud.yandex.net";
/// Default OpenRouter endpoint.
pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
/// Default `X-Title` sent to OpenRouter.
pub const DEFAULT_OPENROUTER_TITLE: &str = "TZ-Expert";
/// Default directory for the last-request record.
pub const DEFAULT_REQUEST_LOG_DIR: &str = "llm_requests";

/// Invalid or missing configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable is set to something unparseable.
    #[error("Invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
        /// What was expected.
        reason: String,
    },

    /// OpenRouter was chosen as the default backend without an API key.
    #[error("LLM_DEFAULT_BACKEND=openrouter requires OPENROUTER_API_KEY")]
    OpenRouterDisabled,
}

/// Which Yandex API family serves `gpt://` models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YandexApi {
    /// The OpenAI-compatible `/v1/chat/completions` layer.
    OpenAi,
    /// The native `foundationModels/v1/completion` endpoint.
    Native,
}

impl YandexApi {
    /// Backend this API family is registered under.
    #[must_use]
    pub const fn backend(self) -> Backend {
        match self {
            Self::OpenAi => Backend::OpenAiCompatible,
            Self::Native => Backend::YandexCompletion,
        }
    }
}

impl FromStr for YandexApi {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "native" | "completion" => Ok(Self::Native),
            _ => Err("expected openai or native".to_string()),
        }
    }
}

/// Default backend family for bare model names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultBackend {
    /// Yandex Cloud, through whichever [`YandexApi`] is configured.
    Yandex,
    /// OpenRouter.
    OpenRouter,
}

impl FromStr for DefaultBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yandex" => Ok(Self::Yandex),
            "openrouter" => Ok(Self::OpenRouter),
            _ => Err("expected yandex or openrouter".to_string()),
        }
    }
}

/// Yandex Cloud credentials and endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YandexSettings {
    /// `Api-Key` / bearer secret.
    pub api_key: String,
    /// Folder used to qualify bare model names.
    pub folder_id: String,
    /// OpenAI-compatible base URL.
    pub base_url: String,
    /// Native completion host.
    pub completion_url: String,
    /// API family for `gpt://` models.
    pub api: YandexApi,
}

/// OpenRouter credentials; present only when a key is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRouterSettings {
    /// Bearer secret.
    pub api_key: String,
    /// Base URL.
    pub base_url: String,
    /// Optional `HTTP-Referer` header.
    pub referer: Option<String>,
    /// `X-Title` header.
    pub title: String,
    /// Model used when OpenRouter is the default and no model is given.
    pub default_model: String,
}

/// Everything the binary needs to build an orchestrator.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Yandex Cloud configuration.
    pub yandex: YandexSettings,
    /// OpenRouter configuration, if enabled.
    pub openrouter: Option<OpenRouterSettings>,
    /// Default backend family.
    pub default_backend: DefaultBackend,
    /// Retry, concurrency and timeout settings.
    pub requester: RequesterConfig,
    /// Directory for the last-request record.
    pub request_log_dir: PathBuf,
}

impl Settings {
    /// Reads the process environment.
    ///
    /// Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));
        let or = |name: &str, default: &str| get(name).unwrap_or_else(|| default.to_string());

        let yandex = YandexSettings {
            api_key: require("YC_API_KEY")?,
            folder_id: require("YC_FOLDER_ID")?,
            base_url: or("YC_BASE_URL", DEFAULT_YC_BASE_URL),
            completion_url: or("YC_COMPLETION_URL", DEFAULT_YC_COMPLETION_URL),
            api: parse(&get, "YC_API")?.unwrap_or(YandexApi::OpenAi),
        };

        let openrouter = get("OPENROUTER_API_KEY").map(|api_key| OpenRouterSettings {
            api_key,
            base_url: or("OPENROUTER_BASE_URL", DEFAULT_OPENROUTER_BASE_URL),
            referer: get("OPENROUTER_REFERER"),
            title: or("OPENROUTER_TITLE", DEFAULT_OPENROUTER_TITLE),
            default_model: or("OPENROUTER_DEFAULT_MODEL", DEFAULT_OPENROUTER_MODEL),
        });

        let default_backend =
            parse(&get, "LLM_DEFAULT_BACKEND")?.unwrap_or(DefaultBackend::Yandex);
        if default_backend == DefaultBackend::OpenRouter && openrouter.is_none() {
            return Err(ConfigError::OpenRouterDisabled);
        }

        let defaults = RequesterConfig::default();
        let requester = RequesterConfig::default()
            .with_max_concurrent(parse(&get, "MAX_CONCURRENT")?.unwrap_or(defaults.max_concurrent))
            .with_request_timeout(
                parse(&get, "LLM_TIMEOUT_SECS")?
                    .map_or(defaults.request_timeout, Duration::from_secs),
            )
            .with_max_retry_provider(
                parse(&get, "MAX_RETRY_PROVIDER")?.unwrap_or(defaults.max_retry_provider),
            )
            .with_max_retry_json(parse(&get, "MAX_RETRY_JSON")?.unwrap_or(defaults.max_retry_json))
            .with_schema_validation(
                parse_bool(&get, "LLM_VALIDATE_SCHEMA")?.unwrap_or(defaults.validate_schema),
            );

        Ok(Self {
            yandex,
            openrouter,
            default_backend,
            requester,
            request_log_dir: PathBuf::from(or("LLM_REQUEST_LOG_DIR", DEFAULT_REQUEST_LOG_DIR)),
        })
    }

    /// Backend receiving bare model names and empty input.
    #[must_use]
    pub const fn default_backend(&self) -> Backend {
        match self.default_backend {
            DefaultBackend::Yandex => self.yandex.api.backend(),
            DefaultBackend::OpenRouter => Backend::OpenRouter,
        }
    }

    /// Resolver matching this configuration.
    #[must_use]
    pub fn resolver(&self) -> ModelResolver {
        let mut resolver = ModelResolver::new(&self.yandex.folder_id)
            .with_yandex_backend(self.yandex.api.backend())
            .with_default_backend(self.default_backend());
        if let Some(openrouter) = &self.openrouter {
            resolver = resolver.with_openrouter_default(&openrouter.default_model);
        }
        resolver
    }
}

fn parse<T, G>(get: &G, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    get(name)
        .map(|value| {
            value.parse().map_err(|e: T::Err| ConfigError::Invalid {
                name,
                reason: e.to_string(),
                value,
            })
        })
        .transpose()
}

fn parse_bool<G>(get: &G, name: &'static str) -> Result<Option<bool>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    get(name)
        .map(|value| match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                name,
                value,
                reason: "expected a boolean".to_string(),
            }),
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Settings::from_lookup(|name| map.get(name).cloned())
    }

    const BASE: [(&str, &str); 2] = [("YC_API_KEY", "key"), ("YC_FOLDER_ID", "b1g")];

    #[test]
    fn test_defaults() {
        let s = settings(&BASE).unwrap();

        assert_eq!(s.yandex.base_url, DEFAULT_YC_BASE_URL);
        assert_eq!(s.yandex.api, YandexApi::OpenAi);
        assert!(s.openrouter.is_none());
        assert_eq!(s.default_backend(), Backend::OpenAiCompatible);
        assert_eq!(s.requester.max_concurrent, 10);
        assert_eq!(s.requester.request_timeout, Duration::from_secs(180));
        assert_eq!(s.requester.max_retry_provider, 2);
        assert_eq!(s.requester.max_retry_json, 2);
        assert!(!s.requester.validate_schema);
        assert_eq!(s.request_log_dir, PathBuf::from("llm_requests"));
    }

    #[test]
    fn test_missing_folder_is_fatal() {
        let err = settings(&[("YC_API_KEY", "key"), ("YC_FOLDER_ID", "  ")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("YC_FOLDER_ID"));
    }

    #[test]
    fn test_overrides() {
        let mut vars = BASE.to_vec();
        vars.extend([
            ("YC_API", "native"),
            ("MAX_CONCURRENT", "4"),
            ("LLM_TIMEOUT_SECS", "30"),
            ("MAX_RETRY_PROVIDER", "5"),
            ("MAX_RETRY_JSON", "0"),
            ("LLM_VALIDATE_SCHEMA", "yes"),
            ("LLM_REQUEST_LOG_DIR", "/tmp/llm"),
        ]);
        let s = settings(&vars).unwrap();

        assert_eq!(s.default_backend(), Backend::YandexCompletion);
        assert_eq!(s.requester.max_concurrent, 4);
        assert_eq!(s.requester.request_timeout, Duration::from_secs(30));
        assert_eq!(s.requester.max_retry_provider, 5);
        assert_eq!(s.requester.max_retry_json, 0);
        assert!(s.requester.validate_schema);
        assert_eq!(
            s.resolver().resolve(Some("gpt://b1g/yandexgpt/rc")).backend,
            Backend::YandexCompletion
        );
    }

    #[test]
    fn test_invalid_number_is_reported() {
        let mut vars = BASE.to_vec();
        vars.push(("MAX_CONCURRENT", "many"));
        match settings(&vars).unwrap_err() {
            ConfigError::Invalid { name, value, .. } => {
                assert_eq!(name, "MAX_CONCURRENT");
                assert_eq!(value, "many");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_openrouter_default_requires_key() {
        let mut vars = BASE.to_vec();
        vars.push(("LLM_DEFAULT_BACKEND", "openrouter"));
        assert_eq!(settings(&vars).unwrap_err(), ConfigError::OpenRouterDisabled);

        vars.push(("OPENROUTER_API_KEY", "sk-or"));
        let s = settings(&vars).unwrap();
        let openrouter = s.openrouter.as_ref().unwrap();
        assert_eq!(openrouter.title, DEFAULT_OPENROUTER_TITLE);
        assert_eq!(openrouter.referer, None);

        let reference = s.resolver().resolve(None);
        assert_eq!(reference.backend, Backend::OpenRouter);
        assert_eq!(reference.model_uri, DEFAULT_OPENROUTER_MODEL);
    }
}
