use std::env;
use std::fmt;

use crate::error::ConfigError;

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

const DEFAULT_MODEL: &str = "gpt-4-1106-preview";
const DEFAULT_MODEL_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MODEL_TEMPERATURE: f32 = 0.79;
const DEFAULT_MODEL_MAX_TOKENS: u32 = 4096;
const MAX_MODEL_TEMPERATURE: f32 = 2.0;

/// What the chat loop does after a completion call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemoteErrorPolicy {
    /// Report the error and keep reading input.
    #[default]
    Continue,
    /// Report the error and stop with a failure status.
    Abort,
}

impl RemoteErrorPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::Abort => "abort",
        }
    }
}

/// Bearer credential. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(raw: &str) -> Result<Self, ConfigError> {
        let key = raw.trim();
        if key.is_empty() {
            return Err(ConfigError::InvalidCredential {
                var: API_KEY_VAR,
                reason: "value is blank".to_string(),
            });
        }
        if key.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ConfigError::InvalidCredential {
                var: API_KEY_VAR,
                reason: "value contains whitespace or control characters".to_string(),
            });
        }
        Ok(Self(key.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey(<redacted>)")
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: ApiKey,
    pub model: String,
    pub model_base_url: String,
    pub model_timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
    pub token_limit: Option<u64>,
    pub system_prompt: Option<String>,
    pub context_window: Option<usize>,
    pub on_remote_error: RemoteErrorPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| env::var(key).ok())
    }

    pub(crate) fn from_env_with(
        mut get_var: impl FnMut(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let api_key = match get_var(API_KEY_VAR) {
            Some(raw) => ApiKey::new(&raw)?,
            None => return Err(ConfigError::MissingCredential { var: API_KEY_VAR }),
        };

        let model = get_var("MODEL")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let model_base_url = get_var("MODEL_BASE_URL")
            .map(|value| value.trim().trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL_BASE_URL.to_string());

        Ok(Self {
            api_key,
            model,
            model_base_url,
            model_timeout_secs: parse_positive_u64(
                get_var("MODEL_TIMEOUT_SECS").as_deref(),
                DEFAULT_MODEL_TIMEOUT_SECS,
            ),
            temperature: parse_temperature(get_var("MODEL_TEMPERATURE").as_deref()),
            max_tokens: parse_max_tokens(get_var("MODEL_MAX_TOKENS").as_deref()),
            token_limit: parse_optional_positive(get_var("MODEL_TOKEN_LIMIT").as_deref()),
            system_prompt: get_var("SYSTEM_PROMPT").filter(|value| !value.trim().is_empty()),
            context_window: parse_context_window(get_var("CONTEXT_WINDOW_MESSAGES").as_deref()),
            on_remote_error: parse_remote_error_policy(get_var("ON_REMOTE_ERROR").as_deref()),
        })
    }
}

fn parse_optional_positive(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
}

fn parse_positive_u64(raw: Option<&str>, default: u64) -> u64 {
    parse_optional_positive(raw).unwrap_or(default)
}

fn parse_max_tokens(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_MODEL_MAX_TOKENS)
}

fn parse_temperature(raw: Option<&str>) -> f32 {
    raw.and_then(|value| value.trim().parse::<f32>().ok())
        .filter(|value| value.is_finite() && (0.0..=MAX_MODEL_TEMPERATURE).contains(value))
        .unwrap_or(DEFAULT_MODEL_TEMPERATURE)
}

fn parse_context_window(raw: Option<&str>) -> Option<usize> {
    parse_optional_positive(raw).and_then(|value| usize::try_from(value).ok())
}

fn parse_remote_error_policy(raw: Option<&str>) -> RemoteErrorPolicy {
    match raw
        .unwrap_or("continue")
        .trim()
        .to_ascii_lowercase()
        .as_str()
    {
        "abort" => RemoteErrorPolicy::Abort,
        _ => RemoteErrorPolicy::Continue,
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        api_key: ApiKey("sk-test".to_string()),
        model: DEFAULT_MODEL.to_string(),
        model_base_url: "http://127.0.0.1:9".to_string(),
        model_timeout_secs: DEFAULT_MODEL_TIMEOUT_SECS,
        temperature: DEFAULT_MODEL_TEMPERATURE,
        max_tokens: DEFAULT_MODEL_MAX_TOKENS,
        token_limit: None,
        system_prompt: None,
        context_window: None,
        on_remote_error: RemoteErrorPolicy::Continue,
    }
}
