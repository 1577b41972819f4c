use super::{
    ChatError, ChatResult, HttpTransport, LLMBackend, non_empty, parse_body, success_body,
};
use crate::config::OPENAI_KEY_VAR;
use crate::types::ChatMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o";
const NAME: &str = "OpenAI";

/// Models known to accept a dedicated `system` role message.
pub const SYSTEM_ROLE_MODELS: &[&str] = &[
    "gpt-4o",
    "gpt-4o-mini",
    "gpt-4-turbo",
    "gpt-4",
    "gpt-3.5-turbo",
];

/// Mis-decoded UTF-8 punctuation that shows up in some completions.
const MOJIBAKE: &[(&str, &str)] = &[
    ("\u{e2}\u{20ac}\u{201d}", "\u{2014}"),
    ("\u{e2}\u{20ac}\u{153}", "\u{201c}"),
    ("\u{e2}\u{20ac}\u{9d}", "\u{201d}"),
    ("\u{e2}\u{20ac}\u{2122}", "\u{2019}"),
    ("\u{e2}\u{20ac}\u{2dc}", "\u{2018}"),
];

pub struct OpenAIBackend {
    transport: Arc<dyn HttpTransport>,
    api_key: Option<String>,
    endpoint: String,
}

impl OpenAIBackend {
    pub fn new(transport: Arc<dyn HttpTransport>, api_key: Option<String>) -> Self {
        Self {
            transport,
            api_key,
            endpoint: ENDPOINT.to_string(),
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    messages: Vec<ChatMessage>,
    model: &'a str,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: Option<CompletionMessage>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

/// Prepend the system text, as a `system` message when the model supports
/// one and as a marked `user` message otherwise.
pub fn request_messages(
    messages: &[ChatMessage],
    system: Option<&str>,
    model: &str,
) -> Vec<ChatMessage> {
    let mut out = Vec::with_capacity(messages.len() + 1);
    if let Some(system) = non_empty(system) {
        if SYSTEM_ROLE_MODELS.contains(&model) {
            out.push(ChatMessage::system(system));
        } else {
            out.push(ChatMessage::user(format!("SYSTEM_PROMPT: {system}")));
        }
    }
    out.extend_from_slice(messages);
    out
}

/// Undo the known mis-encodings of dashes and curly quotes.
pub fn repair_encoding(text: &str) -> String {
    MOJIBAKE
        .iter()
        .fold(text.to_string(), |acc, (broken, fixed)| {
            acc.replace(broken, fixed)
        })
}

#[async_trait]
impl LLMBackend for OpenAIBackend {
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
            var: OPENAI_KEY_VAR,
        })?;
        let model = model.unwrap_or(DEFAULT_MODEL);

        let body = serde_json::to_value(CompletionRequest {
            messages: request_messages(messages, system, model),
            model,
        })?;

        let auth = format!("Bearer {key}");
        tracing::debug!(url = %self.endpoint, model, "sending OpenAI request");
        tracing::trace!("request: {body}");
        let response = self
            .transport
            .post(&self.endpoint, &[("Authorization", auth.as_str())], &body)
            .await?;
        let body = success_body(NAME, response)?;
        tracing::trace!("response: {body}");

        let content = parse_body::<CompletionResponse>(NAME, &body)?
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| ChatError::malformed(NAME, "missing `choices[0].message.content`"))?;
        Ok(repair_encoding(&content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    #[test]
    fn system_role_for_capable_models() {
        let out = request_messages(&[ChatMessage::user("hi")], Some("sys"), "gpt-4o");
        assert_eq!(out[0], ChatMessage::system("sys"));
        assert_eq!(out[1], ChatMessage::user("hi"));
    }

    #[test]
    fn marked_user_message_for_other_models() {
        let out = request_messages(&[ChatMessage::user("hi")], Some("sys"), "o1-mini");
        assert_eq!(out[0].role, Role::User);
        assert_eq!(out[0].content, "SYSTEM_PROMPT: sys");
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn no_system_message_when_absent() {
        let out = request_messages(&[ChatMessage::user("hi")], None, "gpt-4o");
        assert_eq!(out, vec![ChatMessage::user("hi")]);
    }

    #[test]
    fn repairs_mojibake_punctuation() {
        let broken = "It\u{e2}\u{20ac}\u{2122}s \u{e2}\u{20ac}\u{153}fine\u{e2}\u{20ac}\u{9d} \u{e2}\u{20ac}\u{201d} ok";
        assert_eq!(
            repair_encoding(broken),
            "It\u{2019}s \u{201c}fine\u{201d} \u{2014} ok"
        );
        assert_eq!(repair_encoding("plain ascii"), "plain ascii");
    }
}
