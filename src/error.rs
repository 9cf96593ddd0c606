//! typed errors for configuration loading and the upstream generation call.
//!
//! `GenAiError::user_message()` is what callers of the ingestion endpoint
//! see; the full `Display` output only goes to the log.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no generation api key configured: set GENAI_API_KEY or genai.api_key")]
    MissingApiKey,

    #[error("invalid cors origin {0:?}")]
    InvalidOrigin(String),

    #[error("invalid bind address {0:?}")]
    InvalidBindAddr(String),
}

#[derive(Debug, Error)]
pub enum GenAiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("upstream rejected credentials (http {0})")]
    Auth(u16),

    #[error("upstream quota exhausted")]
    Quota,

    #[error("upstream returned http {code}: {body}")]
    Status { code: u16, body: String },

    #[error("failed to decode upstream response: {0}")]
    Parse(String),

    #[error("prompt blocked by upstream: {0}")]
    Blocked(String),

    #[error("upstream returned no text")]
    EmptyResponse,
}

impl GenAiError {
    /// generic description suitable for the `message` field of the envelope
    pub fn user_message(&self) -> &'static str {
        match self {
            GenAiError::Network(_) => "generation service unreachable",
            GenAiError::Auth(_) => "generation service rejected the credentials",
            GenAiError::Quota => "generation service quota exhausted",
            GenAiError::Status { .. } => "generation service returned an error",
            GenAiError::Parse(_) | GenAiError::EmptyResponse => {
                "generation service returned an invalid response"
            }
            GenAiError::Blocked(_) => "generation service declined to answer",
        }
    }
}
