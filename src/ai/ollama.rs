use super::{
    ChatError, ChatResult, HttpTransport, LLMBackend, LocalDiscovery, non_empty, parse_body,
    success_body,
};
use crate::types::ChatMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_MODEL: &str = "llama3.1:latest";
const NAME: &str = "Ollama";

pub struct OllamaBackend {
    transport: Arc<dyn HttpTransport>,
    discovery: Arc<LocalDiscovery>,
}

impl OllamaBackend {
    pub fn new(transport: Arc<dyn HttpTransport>, discovery: Arc<LocalDiscovery>) -> Self {
        Self {
            transport,
            discovery,
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    prompt: String,
    stream: bool,
    model: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

/// `/api/generate` takes one flat prompt, so the system text and the JSON of
/// the message list are folded into it.
pub fn flatten_prompt(messages: &[ChatMessage], system: Option<&str>) -> ChatResult<String> {
    let encoded = serde_json::to_string(messages)?;
    Ok(format!(
        "SYSTEM PROMPT: {} MESSAGES: {encoded}",
        non_empty(system).unwrap_or_default()
    ))
}

fn generate_url(base: &str) -> String {
    format!("{}/api/generate", base.trim_end_matches('/'))
}

#[async_trait]
impl LLMBackend for OllamaBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn send(
        &self,
        messages: &[ChatMessage],
        system: Option<&str>,
        model: Option<&str>,
    ) -> ChatResult<String> {
        let base = self
            .discovery
            .resolve()
            .await
            .ok_or(ChatError::EndpointUnavailable)?;
        let url = generate_url(&base);
        let model = model.unwrap_or(DEFAULT_MODEL);

        let body = serde_json::to_value(GenerateRequest {
            prompt: flatten_prompt(messages, system)?,
            stream: false,
            model,
        })?;

        tracing::debug!(%url, model, "sending Ollama request");
        tracing::trace!("request: {body}");
        let response = self.transport.post(&url, &[], &body).await?;
        let body = success_body(NAME, response)?;
        tracing::trace!("response: {body}");

        parse_body::<GenerateResponse>(NAME, &body)?
            .response
            .ok_or_else(|| ChatError::malformed(NAME, "missing `response` field"))
    }
}
