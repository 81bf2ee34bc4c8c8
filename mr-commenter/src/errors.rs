//! Crate-wide error hierarchy for mr-commenter.
//!
//! Goals:
//! - Single root `Error` for all public functions.
//! - Provider-aware mapping (401→Unauthorized, 429→RateLimited, 5xx→Server, etc.).
//! - No dynamic dispatch, no async-trait, ergonomic `?` via `From` impls.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type MrResult<T> = Result<T, Error>;

/// Root error type for the mr-commenter crate.
#[derive(Debug, Error)]
pub enum Error {
    /// GitLab API related failure.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// AI backend failure (config or request).
    #[error("agent error: {0}")]
    Agent(#[from] ai_agent_service::error_handler::AiAgentError),

    /// Configuration problems (bad/missing token, invalid MR URL, etc.).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Input validation errors (empty review body, missing SHAs, etc.).
    #[error("validation error: {0}")]
    Validation(String),
}

/// Detailed GitLab-specific error used inside the provider layer.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Unauthorized (HTTP 401).
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden (HTTP 403).
    #[error("forbidden")]
    Forbidden,

    /// Not found (HTTP 404).
    #[error("not found")]
    NotFound,

    /// Rate limited (HTTP 429).
    #[error("rate limited")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Gateway/Server error (HTTP 5xx).
    #[error("server error: status {0}")]
    Server(u16),

    /// Other HTTP status (4xx/3xx) not covered above, with a body snippet
    /// because GitLab puts position-validation details in the body.
    #[error("http status error: {status}: {snippet}")]
    HttpStatus { status: u16, snippet: String },

    /// Timeout at transport level.
    #[error("timeout")]
    Timeout,

    /// Network/transport failure without status (DNS/connect/reset).
    #[error("network error: {0}")]
    Network(String),

    /// JSON deserialization error.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Unexpected/invalid shape of a GitLab response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Configuration and setup errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing gitlab token")]
    MissingToken,

    #[error("invalid merge request url: {0}")]
    InvalidMrUrl(String),

    #[error("unknown payload mode: {0}")]
    UnknownPayloadMode(String),
}

// ===== Conversions for `?` ergonomics =====

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Provider(ProviderError::from(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Provider(ProviderError::Serde(e))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return ProviderError::Timeout;
        }
        if let Some(status) = e.status() {
            let code = status.as_u16();
            return match code {
                401 => ProviderError::Unauthorized,
                403 => ProviderError::Forbidden,
                404 => ProviderError::NotFound,
                429 => ProviderError::RateLimited {
                    retry_after_secs: None,
                },
                500..=599 => ProviderError::Server(code),
                _ => ProviderError::HttpStatus {
                    status: code,
                    snippet: String::new(),
                },
            };
        }
        ProviderError::Network(e.to_string())
    }
}

/// Maps a non-success status plus body text into a [`ProviderError`].
pub(crate) fn status_error(status: u16, body: &str) -> ProviderError {
    match status {
        401 => ProviderError::Unauthorized,
        403 => ProviderError::Forbidden,
        404 => ProviderError::NotFound,
        429 => ProviderError::RateLimited {
            retry_after_secs: None,
        },
        500..=599 => ProviderError::Server(status),
        _ => ProviderError::HttpStatus {
            status,
            snippet: body.chars().take(240).collect(),
        },
    }
}
