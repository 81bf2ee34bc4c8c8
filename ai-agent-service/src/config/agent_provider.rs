/// Represents the AI backend used to generate review text.
///
/// Adding more providers later (e.g., Mistral API) is done by extending this
/// enum and the matching service in `services/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentProvider {
    /// Local Ollama runtime (`/api/generate`).
    Ollama,
    /// OpenAI chat-completions API.
    OpenAi,
    /// Anthropic messages API.
    Claude,
    /// Any OpenAPI-ish server; endpoint and body shapes are probed in order.
    OpenApiCompat,
}

impl AgentProvider {
    /// Parses a provider name as used in settings/env (`ollama`, `openai`,
    /// `claude`, `openapi`). Returns `None` for unknown names.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            "openai" => Some(Self::OpenAi),
            "claude" | "anthropic" => Some(Self::Claude),
            "openapi" | "compat" => Some(Self::OpenApiCompat),
            _ => None,
        }
    }

    /// Stable lowercase name (inverse of [`AgentProvider::parse`]).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
            Self::Claude => "claude",
            Self::OpenApiCompat => "openapi",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_roundtrip() {
        for p in [
            AgentProvider::Ollama,
            AgentProvider::OpenAi,
            AgentProvider::Claude,
            AgentProvider::OpenApiCompat,
        ] {
            assert_eq!(AgentProvider::parse(p.as_str()), Some(p));
        }
        assert_eq!(AgentProvider::parse("ANTHROPIC"), Some(AgentProvider::Claude));
        assert_eq!(AgentProvider::parse("bard"), None);
    }
}
