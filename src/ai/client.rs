use super::discovery::{self, LocalDiscovery};
use super::{
    AnthropicBackend, ChatResult, HttpTransport, LLMBackend, OllamaBackend, OpenAIBackend,
    ReqwestTransport,
};
use crate::config::{ProviderConfig, ProviderKind};
use crate::types::ChatMessage;
use async_trait::async_trait;
use std::sync::Arc;

/// The three supported backends behind one tag.
pub enum Provider {
    Ollama(OllamaBackend),
    OpenAI(OpenAIBackend),
    Anthropic(AnthropicBackend),
}

impl Provider {
    /// Pick the backend named by `config`.
    ///
    /// Fails with `UnknownProvider` before any backend is built, so a bad
    /// name never reaches the network.
    pub fn select(
        config: &ProviderConfig,
        transport: Arc<dyn HttpTransport>,
        discovery: Arc<LocalDiscovery>,
    ) -> ChatResult<Self> {
        let provider = match config.kind()? {
            ProviderKind::Ollama => Self::Ollama(OllamaBackend::new(transport, discovery)),
            ProviderKind::OpenAI => {
                Self::OpenAI(OpenAIBackend::new(transport, config.api_key.clone()))
            }
            ProviderKind::Anthropic => {
                Self::Anthropic(AnthropicBackend::new(transport, config.api_key.clone()))
            }
        };
        Ok(provider)
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Provider::Ollama(_) => ProviderKind::Ollama,
            Provider::OpenAI(_) => ProviderKind::OpenAI,
            Provider::Anthropic(_) => ProviderKind::Anthropic,
        }
    }

    fn backend(&self) -> &dyn LLMBackend {
        match self {
            Provider::Ollama(backend) => backend,
            Provider::OpenAI(backend) => backend,
            Provider::Anthropic(backend) => backend,
        }
    }
}

#[async_trait]
impl LLMBackend for Provider {
    fn name(&self) -> &'static str {
        self.backend().name()
    }

    async fn send(
        &self,
        messages: &[ChatMessage],
        system: Option<&str>,
        model: Option<&str>,
    ) -> ChatResult<String> {
        self.backend().send(messages, system, model).await
    }
}

/// Routes chats to the configured provider and trims the reply.
pub struct ChatClient {
    config: ProviderConfig,
    transport: Arc<dyn HttpTransport>,
    discovery: Arc<LocalDiscovery>,
}

impl ChatClient {
    /// Reqwest transport and the process-wide discovery for the configured endpoint.
    pub fn new(config: ProviderConfig) -> Self {
        let discovery = discovery::shared_for(config.endpoint_url.as_deref());
        Self::with_parts(config, Arc::new(ReqwestTransport::default()), discovery)
    }

    pub fn from_env() -> Self {
        Self::new(ProviderConfig::from_env())
    }

    pub fn with_parts(
        config: ProviderConfig,
        transport: Arc<dyn HttpTransport>,
        discovery: Arc<LocalDiscovery>,
    ) -> Self {
        Self {
            config,
            transport,
            discovery,
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn discovery(&self) -> &Arc<LocalDiscovery> {
        &self.discovery
    }

    /// Send `messages` to the configured provider and return the trimmed reply.
    pub async fn chat(&self, system: Option<&str>, messages: &[ChatMessage]) -> ChatResult<String> {
        let provider = Provider::select(
            &self.config,
            self.transport.clone(),
            self.discovery.clone(),
        )?;
        tracing::debug!(
            provider = provider.name(),
            messages = messages.len(),
            "dispatching chat"
        );

        let reply = provider
            .send(messages, system, self.config.model.as_deref())
            .await?;
        Ok(reply.trim().to_string())
    }
}

/// One-shot chat using the environment configuration.
pub async fn chat_reply(system: &str, messages: &[ChatMessage]) -> ChatResult<String> {
    ChatClient::from_env().chat(Some(system), messages).await
}
