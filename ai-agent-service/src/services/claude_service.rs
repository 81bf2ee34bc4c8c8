//! Anthropic messages client for review-text generation.
//!
//! Calls `POST {endpoint}/v1/messages` with `x-api-key` and
//! `anthropic-version` headers. Non-streaming responses carry the text in
//! `content[0].text`; streaming mode accumulates `content_block_delta`
//! events from the SSE feed.

use std::time::Duration;

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::{AgentConfig, AgentProvider};
use crate::error_handler::{AgentError, AiAgentError, ConfigError, Result, make_snippet};
use crate::services::streaming::{collect_stream, sse_data};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Thin client for the Anthropic API.
#[derive(Debug)]
pub struct ClaudeService {
    client: reqwest::Client,
    cfg: AgentConfig,
    url_messages: String,
}

impl ClaudeService {
    /// Creates a new [`ClaudeService`] from the given config.
    ///
    /// # Errors
    /// - [`AgentError::InvalidProvider`] if `cfg.provider` is not Claude
    /// - [`ConfigError::MissingApiKey`] if no API key is configured
    pub fn new(cfg: AgentConfig) -> Result<Self> {
        if cfg.provider != AgentProvider::Claude {
            return Err(AgentError::InvalidProvider.into());
        }
        cfg.validate()?;
        let api_key = cfg
            .api_key
            .clone()
            .ok_or(ConfigError::MissingApiKey("claude"))?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            "x-api-key",
            header::HeaderValue::from_str(&api_key)
                .map_err(|e| AgentError::Decode(format!("invalid API key header: {e}")))?,
        );
        headers.insert(
            "anthropic-version",
            header::HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(60));
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .default_headers(headers);
        if !cfg.stream {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let url_messages = format!("{}/v1/messages", cfg.base());
        Ok(Self {
            client,
            cfg,
            url_messages,
        })
    }

    /// Generates review text for the given prompt.
    #[instrument(skip_all, fields(model = %self.cfg.model, stream = self.cfg.stream))]
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let body = MessagesRequest {
            model: &self.cfg.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            // max_tokens is mandatory on this API.
            max_tokens: self.cfg.max_tokens.unwrap_or(4000),
            stream: self.cfg.stream,
        };

        debug!("POST {}", self.url_messages);
        let resp = self
            .client
            .post(&self.url_messages)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_timeout(e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(AgentError::HttpStatus {
                status,
                url: self.url_messages.clone(),
                snippet: make_snippet(&text),
            }
            .into());
        }

        if self.cfg.stream {
            let idle = Duration::from_secs(self.cfg.timeout_secs.unwrap_or(60));
            return collect_stream(resp, idle, |line| {
                let payload = sse_data(line)?;
                let v: serde_json::Value = serde_json::from_str(payload).ok()?;
                v.pointer("/delta/text").and_then(|c| c.as_str()).map(String::from)
            })
            .await;
        }

        let out: MessagesResponse = resp
            .json()
            .await
            .map_err(|e| AgentError::Decode(format!("serde error: {e}")))?;
        let content = out
            .content
            .into_iter()
            .next()
            .map(|b| b.text)
            .unwrap_or_default();
        if content.is_empty() {
            return Err(AgentError::EmptyResponse.into());
        }
        Ok(content)
    }

    fn map_timeout(&self, e: reqwest::Error) -> AiAgentError {
        if e.is_timeout() {
            let t = Duration::from_secs(self.cfg.timeout_secs.unwrap_or(60));
            return AiAgentError::Timeout(t);
        }
        e.into()
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_messages_response() {
        let raw = r#"{"content":[{"type":"text","text":"无修改建议"}]}"#;
        let out: MessagesResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(out.content[0].text, "无修改建议");
    }
}
