//! Lightweight Ollama client for review-text generation.
//!
//! Calls `POST {endpoint}/api/generate`. Non-streaming requests parse a
//! single JSON object; streaming requests consume NDJSON lines and re-arm
//! the timeout on every chunk (idle-timeout semantics).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::{AgentConfig, AgentProvider};
use crate::error_handler::{AgentError, AiAgentError, Result, make_snippet};
use crate::services::streaming::collect_stream;

/// Thin client for Ollama, constructed from a full [`AgentConfig`].
#[derive(Debug)]
pub struct OllamaService {
    client: reqwest::Client,
    cfg: AgentConfig,
    url_generate: String,
}

impl OllamaService {
    /// Creates a new [`OllamaService`] from the given config.
    ///
    /// # Errors
    /// - [`AgentError::InvalidProvider`] if `cfg.provider` is not Ollama
    /// - [`ConfigError::InvalidFormat`](crate::error_handler::ConfigError) if
    ///   `cfg.endpoint` has no http(s) scheme
    pub fn new(cfg: AgentConfig) -> Result<Self> {
        if cfg.provider != AgentProvider::Ollama {
            return Err(AgentError::InvalidProvider.into());
        }
        cfg.validate()?;

        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(30));

        // In streaming mode the total-duration cap is replaced by the
        // per-chunk idle window applied while reading the body.
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .gzip(true);
        if !cfg.stream {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let url_generate = format!("{}/api/generate", cfg.base());
        Ok(Self {
            client,
            cfg,
            url_generate,
        })
    }

    /// Generates review text for the given prompt.
    #[instrument(skip_all, fields(model = %self.cfg.model, stream = self.cfg.stream))]
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let body = GenerateRequest::from_cfg(&self.cfg, prompt);

        debug!("POST {}", self.url_generate);
        let resp = self
            .client
            .post(&self.url_generate)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_timeout(e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(AgentError::HttpStatus {
                status,
                url: self.url_generate.clone(),
                snippet: make_snippet(&text),
            }
            .into());
        }

        if self.cfg.stream {
            let idle = Duration::from_secs(self.cfg.timeout_secs.unwrap_or(120));
            // NDJSON: one {"response": "...", "done": bool} object per line.
            return collect_stream(resp, idle, |line| {
                serde_json::from_str::<serde_json::Value>(line)
                    .ok()
                    .and_then(|v| v.get("response").and_then(|r| r.as_str()).map(String::from))
            })
            .await;
        }

        let out: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| AgentError::Decode(format!("serde error: {e}")))?;
        Ok(out.response)
    }

    fn map_timeout(&self, e: reqwest::Error) -> AiAgentError {
        if e.is_timeout() {
            let t = Duration::from_secs(self.cfg.timeout_secs.unwrap_or(30));
            return AiAgentError::Timeout(t);
        }
        e.into()
    }
}

/// Request body for `/api/generate`.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
}

impl<'a> GenerateRequest<'a> {
    fn from_cfg(cfg: &'a AgentConfig, prompt: &'a str) -> Self {
        let options = if cfg.max_tokens.is_some() || cfg.temperature.is_some() {
            Some(GenerateOptions {
                temperature: cfg.temperature,
                num_predict: cfg.max_tokens,
            })
        } else {
            None
        };
        Self {
            model: &cfg.model,
            prompt,
            stream: cfg.stream,
            options,
        }
    }
}

/// Subset of Ollama `options` we forward.
#[derive(Debug, Serialize)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Response body for non-streaming `/api/generate`.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}
