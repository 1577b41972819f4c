//! Building the messages and the system text sent with every request.

use crate::types::ChatMessage;
use std::fmt;
use std::str::FromStr;

/// Constant persona statement, always first in the system message.
pub const PERSONA: &str = "You are Quill, a concise programming assistant embedded in a text editor.";

/// Build the message sequence for one request.
///
/// The selection, when requested and non-empty, goes before the prompt.
pub fn build_messages(
    prompt: &str,
    include_selection: bool,
    selection: Option<&str>,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(2);
    if include_selection
        && let Some(text) = selection
        && !text.is_empty()
    {
        messages.push(ChatMessage::user(text));
    }
    messages.push(ChatMessage::user(prompt));
    messages
}

/// Persona, editing context and task instructions, one per line.
pub fn system_message(context: &str, instructions: &str) -> String {
    [
        PERSONA.to_string(),
        format!("The user is currently editing in {context}."),
        instructions.to_string(),
    ]
    .join("\n")
}

/// Editor commands served by the chat core.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Task {
    /// Answer a question about the code; prose is fine.
    #[default]
    Ask,
    /// Replace the selection with new code.
    Rewrite,
    /// Free conversation in the chat buffer.
    Chat,
}

impl Task {
    pub fn instructions(self) -> &'static str {
        match self {
            Task::Ask => {
                "Answer the question directly. Use Markdown and put any code in fenced code blocks."
            }
            Task::Rewrite => {
                "Rewrite the provided code as instructed. Reply with the complete replacement code \
                 in a single fenced code block. Keep any explanation short and outside the block."
            }
            Task::Chat => {
                "You are chatting with the user. Keep answers brief and use fenced code blocks for code."
            }
        }
    }

    /// Whether the answer is meant to be inserted into source and needs [`crate::invert`].
    pub fn wants_inversion(self) -> bool {
        matches!(self, Task::Rewrite)
    }

    pub fn system_message(self, context: &str) -> String {
        system_message(context, self.instructions())
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Task::Ask => "ask",
            Task::Rewrite => "rewrite",
            Task::Chat => "chat",
        };
        f.write_str(name)
    }
}

impl FromStr for Task {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ask" => Ok(Task::Ask),
            "rewrite" | "replace" => Ok(Task::Rewrite),
            "chat" => Ok(Task::Chat),
            other => Err(format!("unknown task: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    #[test]
    fn selection_precedes_prompt() {
        let messages = build_messages("explain this", true, Some("fn main() {}"));
        assert_eq!(
            messages,
            vec![
                ChatMessage::user("fn main() {}"),
                ChatMessage::user("explain this")
            ]
        );
    }

    #[test]
    fn selection_ignored_unless_requested_and_present() {
        for (flag, selection) in [(false, Some("code")), (true, Some("")), (true, None)] {
            let messages = build_messages("hi", flag, selection);
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].role, Role::User);
            assert_eq!(messages[0].content, "hi");
        }
    }

    #[test]
    fn system_message_order() {
        let text = system_message("rust-mode", "Do the thing.");
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], PERSONA);
        assert!(lines[1].contains("rust-mode"));
        assert_eq!(lines[2], "Do the thing.");
    }

    #[test]
    fn task_parsing() {
        assert_eq!("Rewrite".parse::<Task>(), Ok(Task::Rewrite));
        assert_eq!("replace".parse::<Task>(), Ok(Task::Rewrite));
        assert!("summarize".parse::<Task>().is_err());
        assert!(Task::Rewrite.wants_inversion());
        assert!(!Task::Ask.wants_inversion());
    }
}
