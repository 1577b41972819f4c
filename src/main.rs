use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use quill::ai::ChatClient;
use quill::config::ProviderConfig;
use quill::invert::invert;
use quill::prompt::{Task, build_messages};
use quill::session::ChatSession;
use std::io::Read;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Ask an LLM about code from the command line or an editor.
#[derive(Debug, Parser)]
#[command(name = "quill", version, about)]
struct Cli {
    /// Verbosity level (use -v, -vv, etc.)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Provider to use: ollama, openai or anthropic (overrides QUILL_PROVIDER)
    #[arg(long)]
    provider: Option<String>,

    /// Model id (overrides QUILL_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Editing context named in the system message, e.g. the language mode
    #[arg(long, default_value = "plain text")]
    context: String,

    /// What the answer is for: ask, rewrite or chat
    #[arg(long, default_value_t = Task::Ask)]
    task: Task,

    /// File holding the selected text to send before the prompt
    #[arg(long)]
    selection_file: Option<PathBuf>,

    /// Comment syntax used when inverting a rewrite answer
    #[arg(long, default_value = "// ")]
    comment_prefix: String,

    #[arg(long, default_value = "")]
    comment_suffix: String,

    /// Interactive chat: one prompt per stdin line
    #[arg(long)]
    chat: bool,

    /// The prompt; read from stdin when omitted
    prompt: Option<String>,
}

impl Cli {
    fn init_tracing(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let directive = match self.verbose {
                0 => "warn",
                1 => "quill=debug",
                _ => "quill=trace",
            };
            EnvFilter::new(directive)
        });

        tracing_subscriber::fmt()
            .without_time()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    fn provider_config(&self) -> ProviderConfig {
        let mut config = match &self.provider {
            Some(provider) => ProviderConfig::from_env_for(provider),
            None => ProviderConfig::from_env(),
        };
        if let Some(model) = &self.model {
            config.model = Some(model.clone());
        }
        config
    }

    async fn run(self) -> Result<()> {
        let client = ChatClient::new(self.provider_config());
        if self.chat {
            return self.run_chat(&client).await;
        }

        let prompt = match &self.prompt {
            Some(prompt) => prompt.clone(),
            None => read_prompt(std::io::stdin())?,
        };
        if prompt.trim().is_empty() {
            bail!("empty prompt");
        }

        let selection = match &self.selection_file {
            Some(path) => Some(
                std::fs::read_to_string(path)
                    .with_context(|| format!("reading selection from {}", path.display()))?,
            ),
            None => None,
        };

        let messages = build_messages(&prompt, selection.is_some(), selection.as_deref());
        let system = self.task.system_message(&self.context);
        let reply = client.chat(Some(&system), &messages).await?;

        if self.task.wants_inversion() {
            println!(
                "{}",
                invert(&reply, &self.comment_prefix, &self.comment_suffix)
            );
        } else {
            println!("{reply}");
        }
        Ok(())
    }

    async fn run_chat(&self, client: &ChatClient) -> Result<()> {
        let mut session = ChatSession::new(Task::Chat.system_message(&self.context));
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        while let Some(line) = lines.next_line().await? {
            let prompt = line.trim();
            if prompt.is_empty() {
                continue;
            }
            match session.send(client, prompt).await {
                Ok(reply) => println!("### Assistant\n{reply}\n"),
                Err(err) => eprintln!("error: {err}"),
            }
        }

        tracing::debug!(turns = session.turns(), "chat finished");
        Ok(())
    }
}

/// Whole prompt from a reader, without the newline editors and shells append.
fn read_prompt(mut reader: impl Read) -> Result<String> {
    let mut buf = String::new();
    reader
        .read_to_string(&mut buf)
        .context("reading prompt from stdin")?;
    Ok(buf.trim().to_string())
}

fn load_dotenv() {
    // Existing environment variables take precedence over .env entries.
    if let Err(err) = dotenvy::dotenv()
        && !err.not_found()
    {
        eprintln!("warning: could not load .env: {err}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    let cli = Cli::parse();
    cli.init_tracing();
    cli.run().await
}

#[cfg(test)]
mod tests {
    use super::read_prompt;

    #[test]
    fn stdin_prompt_is_trimmed() {
        let prompt = read_prompt("explain this function\n".as_bytes()).unwrap();
        assert_eq!(prompt, "explain this function");

        let prompt = read_prompt("  first line\nsecond line\r\n\n".as_bytes()).unwrap();
        assert_eq!(prompt, "first line\nsecond line");
    }
}
