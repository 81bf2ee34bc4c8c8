//! Configuration types for AI backends.

pub mod agent_config;
pub mod agent_provider;

pub use agent_config::AgentConfig;
pub use agent_provider::AgentProvider;
