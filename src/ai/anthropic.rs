//! Anthropic Messages API backend.
//!
//! Differs from OpenAI in that the system text is a top-level field, the key
//! goes in `x-api-key` and every request must name an API version.

use super::{
    ChatError, ChatResult, HttpTransport, LLMBackend, non_empty, parse_body, success_body,
};
use crate::config::ANTHROPIC_KEY_VAR;
use crate::types::{ChatMessage, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;
const NAME: &str = "Anthropic";

pub struct AnthropicBackend {
    transport: Arc<dyn HttpTransport>,
    api_key: Option<String>,
    endpoint: String,
}

impl AnthropicBackend {
    pub fn new(transport: Arc<dyn HttpTransport>, api_key: Option<String>) -> Self {
        Self {
            transport,
            api_key,
            endpoint: ENDPOINT.to_string(),
        }
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    messages: Vec<&'a ChatMessage>,
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

/// The Messages API has no `system` role, so system messages in the
/// sequence join the top-level field after the explicit system text.
fn request_body(
    messages: &[ChatMessage],
    system: Option<&str>,
    model: &str,
) -> ChatResult<serde_json::Value> {
    let (folded, turns): (Vec<&ChatMessage>, Vec<&ChatMessage>) = messages
        .iter()
        .partition(|message| message.role == Role::System);
    let system_parts: Vec<&str> = non_empty(system)
        .into_iter()
        .chain(folded.iter().map(|message| message.content.as_str()))
        .filter(|text| !text.is_empty())
        .collect();

    Ok(serde_json::to_value(MessagesRequest {
        messages: turns,
        model,
        max_tokens: MAX_TOKENS,
        system: (!system_parts.is_empty()).then(|| system_parts.join("\n")),
    })?)
}

#[async_trait]
impl LLMBackend for AnthropicBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn send(
        &self,
        messages: &[ChatMessage],
        system: Option<&str>,
        model: Option<&str>,
    ) -> ChatResult<String> {
        let key = self.api_key.as_deref().ok_or(ChatError::AuthMissing {
            provider: NAME,
            var: ANTHROPIC_KEY_VAR,
        })?;
        let model = model.unwrap_or(DEFAULT_MODEL);
        let body = request_body(messages, system, model)?;

        tracing::debug!(url = %self.endpoint, model, "sending Anthropic request");
        tracing::trace!("request: {body}");
        let headers = [("x-api-key", key), ("anthropic-version", API_VERSION)];
        let response = self.transport.post(&self.endpoint, &headers, &body).await?;
        let body = success_body(NAME, response)?;
        tracing::trace!("response: {body}");

        parse_body::<MessagesResponse>(NAME, &body)?
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .ok_or_else(|| ChatError::malformed(NAME, "missing `content[0].text`"))
    }
}
