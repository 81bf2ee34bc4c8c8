//! Unified error handling for `ai-agent-service`.
//!
//! One top-level [`AiAgentError`] for the whole library, with domain-specific
//! sub-enums ([`ConfigError`], [`AgentError`]). Small helpers for reading and
//! validating environment variables return the unified [`Result<T>`] alias.
//!
//! All messages carry the suffix `[AI Agent Service]` to simplify attribution
//! in logs.

use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Unified result alias for the entire crate.
pub type Result<T> = std::result::Result<T, AiAgentError>;

/// Top-level error for the `ai-agent-service` crate.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AiAgentError {
    /// Configuration/validation errors (startup/readiness).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Backend request/response errors.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Underlying HTTP transport error (e.g., `reqwest::Error`).
    #[error("[AI Agent Service] transport error: {0}")]
    HttpTransport(reqwest::Error),

    /// Operation exceeded the configured (or idle) timeout.
    #[error("[AI Agent Service] request timed out after {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for AiAgentError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            // The client-level timeout; idle timeouts are raised explicitly.
            return AiAgentError::Timeout(Duration::ZERO);
        }
        AiAgentError::HttpTransport(e)
    }
}

/// Error enum for environment/config-driven setup.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is missing or empty.
    #[error("[AI Agent Service] missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// A number failed to parse (like timeouts or token limits).
    #[error("[AI Agent Service] invalid number in {var}: {reason}")]
    InvalidNumber {
        var: &'static str,
        reason: &'static str,
    },

    /// Unsupported provider name.
    #[error("[AI Agent Service] unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// Value had the wrong format (e.g., invalid URL).
    #[error("[AI Agent Service] invalid format in {var}: {reason}")]
    InvalidFormat {
        var: &'static str,
        reason: &'static str,
    },

    /// Provider requires an API key and none was configured.
    #[error("[AI Agent Service] missing API key for {0}")]
    MissingApiKey(&'static str),

    /// Model name was empty or invalid.
    #[error("[AI Agent Service] model name must not be empty")]
    EmptyModel,
}

/// Error enum for backend requests.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AgentError {
    /// The config has an unexpected provider for this service.
    #[error("[AI Agent Service] invalid provider for this service")]
    InvalidProvider,

    /// The endpoint is empty or does not start with http/https.
    #[error("[AI Agent Service] invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Upstream returned a non-successful HTTP status.
    #[error("[AI Agent Service] HTTP {status} from {url}: {snippet}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        /// Short snippet of the response body (trimmed).
        snippet: String,
    },

    /// Response payload could not be decoded as expected.
    #[error("[AI Agent Service] decode error: {0}")]
    Decode(String),

    /// Every (endpoint, body shape) candidate of the compat client failed.
    #[error("[AI Agent Service] all {tried} endpoint/shape candidates failed; last error: {last}")]
    AllCandidatesFailed { tried: usize, last: String },

    /// Backend answered with an empty completion.
    #[error("[AI Agent Service] backend returned an empty completion")]
    EmptyResponse,
}

/* ------------------------------------------------------------------------- */
/* Env helpers (return unified `Result<T>`)                                  */
/* ------------------------------------------------------------------------- */

/// Fetches a required, non-empty environment variable.
pub fn must_env(name: &'static str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar(name).into()),
    }
}

/// Fetches an optional environment variable (`None` if unset/empty).
pub fn env_opt(name: &'static str) -> Option<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Parses an optional `u64` from env (`Ok(None)` if unset/empty).
pub fn env_opt_u64(name: &'static str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => v.parse::<u64>().map(Some).map_err(|_| {
            AiAgentError::from(ConfigError::InvalidNumber {
                var: name,
                reason: "expected u64",
            })
        }),
        _ => Ok(None),
    }
}

/// Validates that an HTTP endpoint starts with `http://` or `https://`.
pub fn validate_http_endpoint(var: &'static str, value: &str) -> Result<()> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidFormat {
            var,
            reason: "must start with http:// or https://",
        }
        .into())
    }
}

/// Trims a response body down to a log-friendly snippet.
pub fn make_snippet(text: &str) -> String {
    text.chars().take(240).collect()
}
