//! One chat session: the growing transcript and the system prompt it was started with.

use crate::ai::{ChatClient, ChatResult};
use crate::types::{ChatMessage, Role};

#[derive(Clone, Debug, Default)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    system_prompt: String,
}

impl ChatSession {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            system_prompt: system_prompt.into(),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Completed exchanges so far.
    pub fn turns(&self) -> usize {
        self.messages.len() / 2
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Send `prompt` with the whole history and record the exchange.
    ///
    /// Nothing is recorded unless the reply arrives, so a failed send leaves
    /// the session as it was.
    pub async fn send(&mut self, client: &ChatClient, prompt: &str) -> ChatResult<String> {
        let mut outgoing = self.messages.clone();
        outgoing.push(ChatMessage::user(prompt));

        let system = Some(self.system_prompt.as_str()).filter(|s| !s.is_empty());
        let reply = client.chat(system, &outgoing).await?;
        self.record(prompt, &reply);
        Ok(reply)
    }

    /// Append one user/assistant pair.
    pub fn record(&mut self, prompt: &str, reply: &str) {
        self.messages.push(ChatMessage::user(prompt));
        self.messages.push(ChatMessage::assistant(reply));
    }

    /// Render the chat buffer text.
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .map(render)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn render(message: &ChatMessage) -> String {
    let heading = match message.role {
        Role::User => "### User",
        Role::Assistant => "### Assistant",
        Role::System => "### System",
    };
    format!("{heading}\n{}", message.content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_alternating_turns() {
        let mut session = ChatSession::new("sys");
        session.record("q1", "a1");
        session.record("q2", "a2");

        assert_eq!(session.turns(), 2);
        let roles: Vec<_> = session.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
    }

    #[test]
    fn renders_transcript() {
        let mut session = ChatSession::new("sys");
        session.record("hello", "hi there");
        assert_eq!(
            session.transcript(),
            "### User\nhello\n\n### Assistant\nhi there"
        );
        session.clear();
        assert_eq!(session.transcript(), "");
        assert_eq!(session.system_prompt(), "sys");
    }
}
