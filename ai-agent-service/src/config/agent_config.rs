//! Runtime configuration for one AI backend invocation.

use serde_json::Map;

use crate::config::agent_provider::AgentProvider;
use crate::error_handler::{self, ConfigError, Result, validate_http_endpoint};

/// Default endpoints/models per provider, matching common deployments.
pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com";
pub const DEFAULT_CLAUDE_ENDPOINT: &str = "https://api.anthropic.com";

/// Configuration for an AI agent invocation.
///
/// Covers all four backends; provider-specific fields are optional and
/// ignored by services that do not use them.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Which backend to call.
    pub provider: AgentProvider,

    /// Base endpoint (local server or hosted API URL, no trailing path).
    pub endpoint: String,

    /// Optional API key (required by OpenAI/Claude; optional for compat).
    pub api_key: Option<String>,

    /// Model identifier (e.g., `"qwen3:14b"`, `"gpt-4o-mini"`).
    pub model: String,

    /// Request timeout in seconds. In streaming mode this is the **idle**
    /// window between chunks, not a total-duration cap.
    pub timeout_secs: Option<u64>,

    /// Whether to request a streaming response.
    pub stream: bool,

    /// Maximum tokens to generate, when the backend supports it.
    pub max_tokens: Option<u32>,

    /// Sampling temperature, when the backend supports it.
    pub temperature: Option<f32>,

    /// Extra headers forwarded verbatim (compat backend).
    pub custom_headers: Vec<(String, String)>,

    /// Extra body parameters merged into the request (compat backend).
    pub extra_params: Map<String, serde_json::Value>,
}

impl AgentConfig {
    /// Config for a local Ollama runtime. Streaming is on by default to
    /// reduce timeout risk on long generations; the idle window is 120s.
    pub fn ollama(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: AgentProvider::Ollama,
            endpoint: endpoint.into(),
            api_key: None,
            model: model.into(),
            timeout_secs: Some(120),
            stream: true,
            max_tokens: None,
            temperature: None,
            custom_headers: Vec::new(),
            extra_params: Map::new(),
        }
    }

    /// Config for the OpenAI chat-completions API (non-streaming, 60s).
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: AgentProvider::OpenAi,
            endpoint: DEFAULT_OPENAI_ENDPOINT.to_string(),
            api_key: Some(api_key.into()),
            model: model.into(),
            timeout_secs: Some(60),
            stream: false,
            max_tokens: Some(1000),
            temperature: Some(0.3),
            custom_headers: Vec::new(),
            extra_params: Map::new(),
        }
    }

    /// Config for the Anthropic messages API (non-streaming, 60s).
    pub fn claude(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: AgentProvider::Claude,
            endpoint: DEFAULT_CLAUDE_ENDPOINT.to_string(),
            api_key: Some(api_key.into()),
            model: model.into(),
            timeout_secs: Some(60),
            stream: false,
            max_tokens: Some(1000),
            temperature: None,
            custom_headers: Vec::new(),
            extra_params: Map::new(),
        }
    }

    /// Config for an OpenAPI-compatible server (non-streaming, 60s).
    pub fn openapi_compat(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: AgentProvider::OpenApiCompat,
            endpoint: endpoint.into(),
            api_key: None,
            model: model.into(),
            timeout_secs: Some(60),
            stream: false,
            max_tokens: Some(1000),
            temperature: Some(0.3),
            custom_headers: Vec::new(),
            extra_params: Map::new(),
        }
    }

    /// Builds the active config from environment variables.
    ///
    /// `AI_AGENT` selects the provider (`ollama` by default). Per-provider
    /// variables:
    /// - Ollama:  `OLLAMA_URL`, `OLLAMA_MODEL` (required)
    /// - OpenAI:  `OPENAI_API_KEY` (required), `OPENAI_BASE_URL`, `OPENAI_MODEL`
    /// - Claude:  `CLAUDE_API_KEY` (required), `CLAUDE_BASE_URL`, `CLAUDE_MODEL`
    /// - Compat:  `OPENAPI_BASE_URL` (required), `OPENAPI_API_KEY`, `OPENAPI_MODEL`
    ///
    /// `AI_AGENT_TIMEOUT_SECS` and `AI_AGENT_STREAM` override the defaults
    /// for any provider.
    pub fn from_env() -> Result<Self> {
        let name = error_handler::env_opt("AI_AGENT").unwrap_or_else(|| "ollama".into());
        let provider = AgentProvider::parse(&name)
            .ok_or(ConfigError::UnsupportedProvider(name))?;

        let mut cfg = match provider {
            AgentProvider::Ollama => {
                let endpoint = error_handler::env_opt("OLLAMA_URL")
                    .unwrap_or_else(|| DEFAULT_OLLAMA_ENDPOINT.into());
                let model = error_handler::must_env("OLLAMA_MODEL")?;
                Self::ollama(endpoint, model)
            }
            AgentProvider::OpenAi => {
                let key = error_handler::must_env("OPENAI_API_KEY")?;
                let model = error_handler::env_opt("OPENAI_MODEL")
                    .unwrap_or_else(|| "gpt-4o-mini".into());
                let mut c = Self::openai(key, model);
                if let Some(url) = error_handler::env_opt("OPENAI_BASE_URL") {
                    c.endpoint = url;
                }
                c
            }
            AgentProvider::Claude => {
                let key = error_handler::must_env("CLAUDE_API_KEY")?;
                let model = error_handler::env_opt("CLAUDE_MODEL")
                    .unwrap_or_else(|| "claude-3-5-sonnet-latest".into());
                let mut c = Self::claude(key, model);
                if let Some(url) = error_handler::env_opt("CLAUDE_BASE_URL") {
                    c.endpoint = url;
                }
                c
            }
            AgentProvider::OpenApiCompat => {
                let endpoint = error_handler::must_env("OPENAPI_BASE_URL")?;
                let model = error_handler::env_opt("OPENAPI_MODEL").unwrap_or_default();
                let mut c = Self::openapi_compat(endpoint, model);
                c.api_key = error_handler::env_opt("OPENAPI_API_KEY");
                c
            }
        };

        if let Some(t) = error_handler::env_opt_u64("AI_AGENT_TIMEOUT_SECS")? {
            cfg.timeout_secs = Some(t);
        }
        if let Some(s) = error_handler::env_opt("AI_AGENT_STREAM") {
            cfg.stream = matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks endpoint scheme and model name.
    pub fn validate(&self) -> Result<()> {
        validate_http_endpoint("endpoint", &self.endpoint)?;
        if self.model.trim().is_empty() && self.provider != AgentProvider::OpenApiCompat {
            return Err(ConfigError::EmptyModel.into());
        }
        Ok(())
    }

    /// Endpoint with any trailing slash removed.
    pub fn base(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_providers() {
        let c = AgentConfig::ollama(DEFAULT_OLLAMA_ENDPOINT, "qwen3:14b");
        assert!(c.stream);
        assert_eq!(c.timeout_secs, Some(120));

        let c = AgentConfig::claude("sk-ant", "claude-3-5-sonnet-latest");
        assert!(!c.stream);
        assert_eq!(c.endpoint, DEFAULT_CLAUDE_ENDPOINT);
    }

    #[test]
    fn validate_rejects_bad_endpoint() {
        let mut c = AgentConfig::ollama("localhost:11434", "m");
        assert!(c.validate().is_err());
        c.endpoint = "http://localhost:11434/".into();
        assert!(c.validate().is_ok());
        assert_eq!(c.base(), "http://localhost:11434");
    }
}
