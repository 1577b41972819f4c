//! Quill: the chat core behind an editor LLM extension.
//!
//! Builds prompts from the editor's selection and context, dispatches them to
//! Ollama, OpenAI or Anthropic, and turns Markdown answers back into source
//! with [`invert::invert`].

pub mod ai;
pub mod config;
pub mod invert;
pub mod prompt;
pub mod session;
pub mod types;
