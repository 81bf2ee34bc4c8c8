//! AI review backends behind a single enum-dispatched service.
//!
//! Supported providers: local Ollama, OpenAI chat-completions, Anthropic
//! messages, and a lenient OpenAPI-compatible fallback client. No
//! `async-trait` and no `Box<dyn ...>`; dispatch is enum-based.
//!
//! The crate also keeps a process-wide **single-slot** cache of the most
//! recently built service handle. The slot is overwritten on every new
//! request (last write wins); concurrent callers racing to set it may
//! briefly observe a handle built for a different config, which is an
//! accepted limitation of the one-slot design.

pub mod config;
pub mod error_handler;
pub mod prompt;
pub mod services;

use std::sync::{Arc, Mutex};

use lazy_static::lazy_static;
use tracing::debug;

use config::{AgentConfig, AgentProvider};
use error_handler::Result;
use services::claude_service::ClaudeService;
use services::compat_service::CompatService;
use services::ollama_service::OllamaService;
use services::open_ai_service::OpenAiService;

/// Concrete backend client (enum dispatch).
#[derive(Debug)]
pub enum AgentService {
    Ollama(OllamaService),
    OpenAi(OpenAiService),
    Claude(ClaudeService),
    Compat(CompatService),
}

impl AgentService {
    /// Constructs the concrete client for the configured provider.
    pub fn from_config(cfg: AgentConfig) -> Result<Self> {
        Ok(match cfg.provider {
            AgentProvider::Ollama => Self::Ollama(OllamaService::new(cfg)?),
            AgentProvider::OpenAi => Self::OpenAi(OpenAiService::new(cfg)?),
            AgentProvider::Claude => Self::Claude(ClaudeService::new(cfg)?),
            AgentProvider::OpenApiCompat => Self::Compat(CompatService::new(cfg)?),
        })
    }

    /// Generates review text for the given prompt.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        match self {
            Self::Ollama(s) => s.generate(prompt).await,
            Self::OpenAi(s) => s.generate(prompt).await,
            Self::Claude(s) => s.generate(prompt).await,
            Self::Compat(s) => s.generate(prompt).await,
        }
    }

    /// The provider this service talks to.
    pub fn provider(&self) -> AgentProvider {
        match self {
            Self::Ollama(_) => AgentProvider::Ollama,
            Self::OpenAi(_) => AgentProvider::OpenAi,
            Self::Claude(_) => AgentProvider::Claude,
            Self::Compat(_) => AgentProvider::OpenApiCompat,
        }
    }
}

lazy_static! {
    static ref LAST_SERVICE: Mutex<Option<Arc<AgentService>>> = Mutex::new(None);
}

/// Builds a service for `cfg` and stores it in the single-slot cache.
///
/// Always overwrites the slot; last write wins.
pub fn service_for(cfg: AgentConfig) -> Result<Arc<AgentService>> {
    let svc = Arc::new(AgentService::from_config(cfg)?);
    debug!(provider = svc.provider().as_str(), "agent service (re)built");
    let mut slot = LAST_SERVICE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *slot = Some(svc.clone());
    Ok(svc)
}

/// Returns the most recently built service handle, if any.
pub fn last_service() -> Option<Arc<AgentService>> {
    LAST_SERVICE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_is_overwritten_by_latest() {
        let a = AgentConfig::openapi_compat("http://one.local", "m");
        let b = AgentConfig::openapi_compat("http://two.local", "m");
        let _ = service_for(a).unwrap();
        let latest = service_for(b).unwrap();
        let cached = last_service().unwrap();
        assert!(Arc::ptr_eq(&latest, &cached));
        assert_eq!(cached.provider(), AgentProvider::OpenApiCompat);
    }
}
