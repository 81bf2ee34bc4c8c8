//! Compatibility client for arbitrary OpenAPI-ish inference servers.
//!
//! Many self-hosted gateways speak *almost* the OpenAI protocol but differ
//! in path or body shape. Instead of per-deployment configuration, this
//! client walks a prioritized list of (endpoint, request-shape) candidates
//! and returns the first successful completion. Response parsing is equally
//! lenient: several known payload layouts are probed before giving up.

use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use crate::config::{AgentConfig, AgentProvider};
use crate::error_handler::{AgentError, AiAgentError, Result, make_snippet};
use crate::services::streaming::{collect_stream, sse_data};

/// Endpoint paths probed in order, most common first.
const CANDIDATE_ENDPOINTS: &[&str] = &[
    "/v1/chat/completions",
    "/chat/completions",
    "/v1/completions",
    "/completions",
    "/api/chat",
    "/api/generate",
    "/generate",
];

/// Client for OpenAPI-compatible servers.
#[derive(Debug)]
pub struct CompatService {
    client: reqwest::Client,
    cfg: AgentConfig,
}

impl CompatService {
    /// Creates a new [`CompatService`] from the given config.
    pub fn new(cfg: AgentConfig) -> Result<Self> {
        if cfg.provider != AgentProvider::OpenApiCompat {
            return Err(AgentError::InvalidProvider.into());
        }
        cfg.validate()?;

        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(60));
        let mut builder = reqwest::Client::builder().connect_timeout(Duration::from_secs(10));
        if !cfg.stream {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self { client, cfg })
    }

    /// Generates review text by probing endpoint/shape candidates in order.
    #[instrument(skip_all, fields(model = %self.cfg.model))]
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let mut tried = 0usize;
        let mut last: Option<AiAgentError> = None;

        for endpoint in CANDIDATE_ENDPOINTS {
            let url = format!("{}{}", self.cfg.base(), endpoint);
            for body in request_shapes(&self.cfg, prompt) {
                tried += 1;
                match self.try_once(&url, &body.payload, body.with_auth).await {
                    Ok(text) if !text.is_empty() => return Ok(text),
                    Ok(_) => {
                        last = Some(AgentError::EmptyResponse.into());
                    }
                    Err(e) => {
                        debug!("candidate {} failed: {}", url, e);
                        last = Some(e);
                    }
                }
            }
        }

        warn!("all {} compat candidates failed", tried);
        Err(AgentError::AllCandidatesFailed {
            tried,
            last: last.map(|e| e.to_string()).unwrap_or_default(),
        }
        .into())
    }

    async fn try_once(&self, url: &str, body: &Value, with_auth: bool) -> Result<String> {
        let mut req = self.client.post(url).json(body);
        if with_auth {
            if let Some(key) = &self.cfg.api_key {
                req = req.bearer_auth(key);
            }
        }
        for (name, value) in &self.cfg.custom_headers {
            req = req.header(name, value);
        }

        let resp = req.send().await.map_err(|e| self.map_timeout(e))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(AgentError::HttpStatus {
                status,
                url: url.to_string(),
                snippet: make_snippet(&text),
            }
            .into());
        }

        if self.cfg.stream {
            let idle = Duration::from_secs(self.cfg.timeout_secs.unwrap_or(60));
            return collect_stream(resp, idle, |line| {
                let payload = sse_data(line).unwrap_or(line);
                let v: Value = serde_json::from_str(payload).ok()?;
                extract_delta(&v)
            })
            .await;
        }

        let v: Value = resp
            .json()
            .await
            .map_err(|e| AgentError::Decode(format!("serde error: {e}")))?;
        // Unknown layout: hand back the raw payload so the caller sees
        // *something* instead of a decode error.
        Ok(extract_content(&v).unwrap_or_else(|| v.to_string()))
    }

    fn map_timeout(&self, e: reqwest::Error) -> AiAgentError {
        if e.is_timeout() {
            let t = Duration::from_secs(self.cfg.timeout_secs.unwrap_or(60));
            return AiAgentError::Timeout(t);
        }
        e.into()
    }
}

/// One request-body candidate.
pub(crate) struct RequestShape {
    pub payload: Value,
    pub with_auth: bool,
}

/// Builds the ordered body-shape candidates: chat messages, plain prompt,
/// and a final unauthenticated plain-prompt attempt for servers that
/// reject unexpected Authorization headers.
pub(crate) fn request_shapes(cfg: &AgentConfig, prompt: &str) -> Vec<RequestShape> {
    let mut chat = json!({
        "model": cfg.model,
        "messages": [{ "role": "user", "content": prompt }],
        "stream": cfg.stream,
    });
    let mut plain = json!({
        "model": cfg.model,
        "prompt": prompt,
        "stream": cfg.stream,
    });

    for v in [&mut chat, &mut plain] {
        let obj = v.as_object_mut().expect("shape is an object");
        if let Some(t) = cfg.temperature {
            obj.insert("temperature".into(), json!(t));
        }
        if let Some(m) = cfg.max_tokens {
            obj.insert("max_tokens".into(), json!(m));
        }
        for (k, val) in &cfg.extra_params {
            obj.insert(k.clone(), val.clone());
        }
    }

    vec![
        RequestShape {
            payload: chat,
            with_auth: true,
        },
        RequestShape {
            payload: plain.clone(),
            with_auth: true,
        },
        RequestShape {
            payload: plain,
            with_auth: false,
        },
    ]
}

/// Probes known non-streaming payload layouts for the completion text.
/// `None` means no recognized layout; the caller decides the fallback.
pub(crate) fn extract_content(v: &Value) -> Option<String> {
    if let Some(s) = v.pointer("/choices/0/message/content").and_then(Value::as_str) {
        return Some(s.to_string());
    }
    if let Some(s) = v.get("response").and_then(Value::as_str) {
        return Some(s.to_string());
    }
    if let Some(s) = v.get("text").and_then(Value::as_str) {
        return Some(s.to_string());
    }
    if let Some(s) = v.pointer("/content/0/text").and_then(Value::as_str) {
        return Some(s.to_string());
    }
    None
}

/// Probes known streaming-delta layouts.
pub(crate) fn extract_delta(v: &Value) -> Option<String> {
    v.pointer("/choices/0/delta/content")
        .or_else(|| v.pointer("/delta/content"))
        .or_else(|| v.get("content"))
        .or_else(|| v.get("response"))
        .or_else(|| v.get("text"))
        .and_then(Value::as_str)
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shapes_cover_chat_plain_and_noauth() {
        let cfg = AgentConfig::openapi_compat("http://gw.local", "m1");
        let shapes = request_shapes(&cfg, "p");
        assert_eq!(shapes.len(), 3);
        assert!(shapes[0].payload.get("messages").is_some());
        assert!(shapes[1].payload.get("prompt").is_some());
        assert!(!shapes[2].with_auth);
        // Defaults flow into every shape.
        assert_eq!(shapes[1].payload["max_tokens"], 1000);
    }

    #[test]
    fn lenient_content_extraction() {
        let openai = json!({"choices":[{"message":{"content":"a"}}]});
        assert_eq!(extract_content(&openai).as_deref(), Some("a"));

        let ollama = json!({"response":"b"});
        assert_eq!(extract_content(&ollama).as_deref(), Some("b"));

        let anthropic = json!({"content":[{"text":"c"}]});
        assert_eq!(extract_content(&anthropic).as_deref(), Some("c"));

        // Unknown shapes are not guessed at; the caller falls back to raw JSON.
        let odd = json!({"weird": true});
        assert_eq!(extract_content(&odd), None);
        assert!(
            extract_content(&odd)
                .unwrap_or_else(|| odd.to_string())
                .contains("weird")
        );
    }

    #[test]
    fn delta_extraction_variants() {
        assert_eq!(
            extract_delta(&json!({"choices":[{"delta":{"content":"x"}}]})).as_deref(),
            Some("x")
        );
        assert_eq!(extract_delta(&json!({"response":"y"})).as_deref(), Some("y"));
        assert_eq!(extract_delta(&json!({"done":true})), None);
    }
}
