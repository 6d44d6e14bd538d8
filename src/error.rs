use thiserror::Error;

/// Fatal problems found while reading the runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var} is not set. Export it or add it to a local .env file.")]
    MissingCredential { var: &'static str },
    #[error("{var} is invalid: {reason}")]
    InvalidCredential { var: &'static str, reason: String },
}

/// A single completion round-trip that did not produce a reply.
#[derive(Debug, Error)]
pub enum RemoteCallError {
    #[error(
        "Model request timed out after {timeout_secs}s while calling '{api_url}'. \
         Increase MODEL_TIMEOUT_SECS or check model responsiveness."
    )]
    Timeout { api_url: String, timeout_secs: u64 },
    #[error(
        "Connection refused by model API at '{api_url}'. \
         Ensure MODEL_BASE_URL points at a running endpoint."
    )]
    ConnectionRefused { api_url: String },
    #[error(
        "Failed to connect to model API at '{api_url}'. \
         Check MODEL_BASE_URL and network connectivity."
    )]
    Connect { api_url: String },
    #[error("Failed to call model API at '{api_url}': {source}")]
    Request {
        api_url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Model request failed with status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("Failed to parse model chat response: {0}")]
    Decode(String),
    #[error("Model response contained no reply text")]
    EmptyReply,
    #[error(
        "Context window exceeded: the request used {used} tokens, above the limit of {limit}. \
         Try a shorter prompt or /reset the conversation."
    )]
    TokenLimitExceeded { used: u64, limit: u64 },
}
