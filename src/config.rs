//! Provider configuration, sourced from the environment.

use crate::ai::ChatError;
use std::{env, fmt, str::FromStr};

pub const PROVIDER_VAR: &str = "QUILL_PROVIDER";
pub const MODEL_VAR: &str = "QUILL_MODEL";
pub const ENDPOINT_VAR: &str = "QUILL_ENDPOINT";
pub const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";
pub const ANTHROPIC_KEY_VAR: &str = "ANTHROPIC_API_KEY";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    Ollama,
    OpenAI,
    Anthropic,
}

impl ProviderKind {
    /// Environment variable holding this provider's API key, if it needs one.
    pub fn key_var(self) -> Option<&'static str> {
        match self {
            ProviderKind::Ollama => None,
            ProviderKind::OpenAI => Some(OPENAI_KEY_VAR),
            ProviderKind::Anthropic => Some(ANTHROPIC_KEY_VAR),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderKind::Ollama => "Ollama",
            ProviderKind::OpenAI => "OpenAI",
            ProviderKind::Anthropic => "Anthropic",
        };
        f.write_str(name)
    }
}

impl FromStr for ProviderKind {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(ProviderKind::Ollama),
            "openai" => Ok(ProviderKind::OpenAI),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            _ => Err(ChatError::UnknownProvider(s.to_string())),
        }
    }
}

/// Settings for one chat or request.
///
/// The provider name is kept as written so a typo surfaces as
/// [`ChatError::UnknownProvider`] when a chat is attempted.
#[derive(Clone, Default)]
pub struct ProviderConfig {
    pub provider: String,
    pub model: Option<String>,
    pub endpoint_url: Option<String>,
    pub api_key: Option<String>,
}

impl ProviderConfig {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = Some(url.into());
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Load from `QUILL_*` variables, picking the API key for the chosen provider.
    pub fn from_env() -> Self {
        let provider = non_empty_var(PROVIDER_VAR).unwrap_or_else(|| "ollama".to_string());
        Self::from_env_for(&provider)
    }

    /// Like [`ProviderConfig::from_env`] with the provider given explicitly.
    pub fn from_env_for(provider: &str) -> Self {
        let api_key = provider
            .parse::<ProviderKind>()
            .ok()
            .and_then(ProviderKind::key_var)
            .and_then(non_empty_var);
        Self {
            provider: provider.to_string(),
            model: non_empty_var(MODEL_VAR),
            endpoint_url: non_empty_var(ENDPOINT_VAR),
            api_key,
        }
    }

    pub fn kind(&self) -> Result<ProviderKind, ChatError> {
        self.provider.parse()
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("endpoint_url", &self.endpoint_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

pub(crate) fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_names() {
        assert_eq!("Ollama".parse::<ProviderKind>().ok(), Some(ProviderKind::Ollama));
        assert_eq!(" openai ".parse::<ProviderKind>().ok(), Some(ProviderKind::OpenAI));
        assert_eq!("claude".parse::<ProviderKind>().ok(), Some(ProviderKind::Anthropic));
        assert!(matches!(
            "gemini".parse::<ProviderKind>(),
            Err(ChatError::UnknownProvider(name)) if name == "gemini"
        ));
    }

    #[test]
    fn debug_redacts_key() {
        let config = ProviderConfig::new("openai").with_api_key("sk-secret");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
