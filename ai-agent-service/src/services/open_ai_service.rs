//! OpenAI chat-completions client for review-text generation.
//!
//! Calls `POST {endpoint}/v1/chat/completions`. Streaming mode consumes SSE
//! `data:` lines and accumulates `choices[0].delta.content`, re-arming the
//! timeout on every chunk.

use std::time::Duration;

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::{AgentConfig, AgentProvider};
use crate::error_handler::{AgentError, AiAgentError, ConfigError, Result, make_snippet};
use crate::services::streaming::{collect_stream, sse_data};

/// Thin client for the OpenAI API.
#[derive(Debug)]
pub struct OpenAiService {
    client: reqwest::Client,
    cfg: AgentConfig,
    url_chat: String,
}

impl OpenAiService {
    /// Creates a new [`OpenAiService`] from the given config.
    ///
    /// # Errors
    /// - [`AgentError::InvalidProvider`] if `cfg.provider` is not OpenAI
    /// - [`ConfigError::MissingApiKey`] if no API key is configured
    pub fn new(cfg: AgentConfig) -> Result<Self> {
        if cfg.provider != AgentProvider::OpenAi {
            return Err(AgentError::InvalidProvider.into());
        }
        cfg.validate()?;
        let api_key = cfg
            .api_key
            .clone()
            .ok_or(ConfigError::MissingApiKey("openai"))?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| AgentError::Decode(format!("invalid API key header: {e}")))?,
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

        let url_chat = format!("{}/v1/chat/completions", cfg.base());
        Ok(Self {
            client,
            cfg,
            url_chat,
        })
    }

    /// Generates review text for the given prompt.
    #[instrument(skip_all, fields(model = %self.cfg.model, stream = self.cfg.stream))]
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.cfg.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: self.cfg.stream,
            temperature: self.cfg.temperature,
            max_tokens: self.cfg.max_tokens,
        };

        debug!("POST {}", self.url_chat);
        let resp = self
            .client
            .post(&self.url_chat)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_timeout(e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(AgentError::HttpStatus {
                status,
                url: self.url_chat.clone(),
                snippet: make_snippet(&text),
            }
            .into());
        }

        if self.cfg.stream {
            let idle = Duration::from_secs(self.cfg.timeout_secs.unwrap_or(60));
            return collect_stream(resp, idle, |line| {
                let payload = sse_data(line)?;
                let v: serde_json::Value = serde_json::from_str(payload).ok()?;
                v.pointer("/choices/0/delta/content")
                    .and_then(|c| c.as_str())
                    .map(String::from)
            })
            .await;
        }

        let out: ChatResponse = resp
            .json()
            .await
            .map_err(|e| AgentError::Decode(format!("serde error: {e}")))?;
        let content = out
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
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
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_api_key() {
        let mut cfg = AgentConfig::openai("k", "gpt-4o-mini");
        cfg.api_key = None;
        assert!(OpenAiService::new(cfg).is_err());
    }

    #[test]
    fn parses_chat_response() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"LGTM"}}]}"#;
        let out: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(out.choices[0].message.content, "LGTM");
    }
}
