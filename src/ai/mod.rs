/// AI module for Quill
///
/// This module provides one chat entry point over three structurally different
/// HTTP APIs (Ollama, OpenAI, Anthropic). Each backend builds its own request
/// shape and normalizes its own response envelope back into plain text.
///
/// # Architecture
///
/// - `transport` - The injected HTTP POST capability and its reqwest implementation
/// - `discovery` - Best-effort probe for a reachable local Ollama service
/// - `ollama`, `openai`, `anthropic` - Provider-specific backends
/// - `client` - Provider selection and the `ChatClient` dispatcher
///
/// # Usage
///
/// ```rust,no_run
/// use quill::ai::ChatClient;
/// use quill::types::ChatMessage;
///
/// # async fn example() -> quill::ai::ChatResult<()> {
/// let client = ChatClient::from_env();
/// let reply = client.chat(Some("Be brief."), &[ChatMessage::user("Hello!")]).await?;
/// # Ok(())
/// # }
/// ```
mod anthropic;
mod client;
pub mod discovery;
mod ollama;
mod openai;
pub mod transport;

pub use anthropic::AnthropicBackend;
pub use client::{ChatClient, Provider, chat_reply};
pub use discovery::{LocalDiscovery, Probe, TcpProbe};
pub use ollama::OllamaBackend;
pub use openai::{OpenAIBackend, repair_encoding};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};

use crate::types::ChatMessage;
use async_trait::async_trait;
use serde::de::DeserializeOwned;

// ============================================
// Error Types
// ============================================

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("No reachable local LLM service")]
    EndpointUnavailable,

    #[error("{provider} API key missing: set {var}")]
    AuthMissing {
        provider: &'static str,
        var: &'static str,
    },

    #[error("{0}")]
    Transport(String),

    #[error("Malformed {provider} response: {detail}")]
    MalformedResponse {
        provider: &'static str,
        detail: String,
    },

    #[error("Unknown LLM provider: {0:?}")]
    UnknownProvider(String),
}

/// Discriminant of a [`ChatError`], for callers that branch on the kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    EndpointUnavailable,
    AuthMissing,
    Transport,
    MalformedResponse,
    UnknownProvider,
}

impl ChatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChatError::EndpointUnavailable => ErrorKind::EndpointUnavailable,
            ChatError::AuthMissing { .. } => ErrorKind::AuthMissing,
            ChatError::Transport(_) => ErrorKind::Transport,
            ChatError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            ChatError::UnknownProvider(_) => ErrorKind::UnknownProvider,
        }
    }

    fn malformed(provider: &'static str, detail: impl Into<String>) -> Self {
        ChatError::MalformedResponse {
            provider,
            detail: detail.into(),
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        ChatError::malformed("JSON", err.to_string())
    }
}

pub type ChatResult<T> = Result<T, ChatError>;

// ============================================
// Backend Trait
// ============================================

/// One provider's translation of the uniform message model to and from its wire format.
#[async_trait]
pub trait LLMBackend: Send + Sync {
    /// Display name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Issue exactly one request and return the plain response text.
    async fn send(
        &self,
        messages: &[ChatMessage],
        system: Option<&str>,
        model: Option<&str>,
    ) -> ChatResult<String>;
}

// ============================================
// Response helpers shared by the backends
// ============================================

/// Turn a non-2xx response into a transport error, otherwise hand back the body.
fn success_body(provider: &'static str, response: HttpResponse) -> ChatResult<String> {
    if response.is_success() {
        Ok(response.body)
    } else {
        tracing::warn!(provider, status = response.status, "provider returned an error status");
        Err(ChatError::Transport(format!(
            "{provider} error {}: {}",
            response.status, response.body
        )))
    }
}

fn parse_body<T: DeserializeOwned>(provider: &'static str, body: &str) -> ChatResult<T> {
    serde_json::from_str(body).map_err(|err| ChatError::malformed(provider, err.to_string()))
}

/// Treat an absent or empty system prompt the same way.
fn non_empty(system: Option<&str>) -> Option<&str> {
    system.filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_and_messages() {
        let err = ChatError::AuthMissing {
            provider: "OpenAI",
            var: "OPENAI_API_KEY",
        };
        assert_eq!(err.kind(), ErrorKind::AuthMissing);
        assert_eq!(err.to_string(), "OpenAI API key missing: set OPENAI_API_KEY");

        let err = ChatError::UnknownProvider("gemini".into());
        assert_eq!(err.kind(), ErrorKind::UnknownProvider);
        assert!(err.to_string().contains("gemini"));
    }

    #[test]
    fn non_success_status_is_transport_error() {
        let response = HttpResponse {
            status: 401,
            body: "nope".into(),
        };
        let err = success_body("OpenAI", response).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.to_string(), "OpenAI error 401: nope");
    }

    #[test]
    fn bad_json_is_malformed() {
        let err = parse_body::<serde_json::Value>("Ollama", "not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn json_errors_are_not_transport_errors() {
        let mut keyed = std::collections::HashMap::new();
        keyed.insert((1, 2), "tuple keys cannot be JSON object keys");
        let err: ChatError = serde_json::to_value(&keyed).unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
        assert!(err.to_string().starts_with("Malformed JSON"));
    }
}
