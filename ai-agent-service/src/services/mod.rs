//! Per-provider backend clients.

pub mod claude_service;
pub mod compat_service;
pub mod ollama_service;
pub mod open_ai_service;

pub(crate) mod streaming;
