//! Line-based chat loop over any [`ConversationClient`]

mod client;

pub use client::ConversationClient;

#[cfg(test)]
pub use client::MockConversationClient;

use futures::StreamExt;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use crate::domain::llm::{Message, Usage};
use crate::domain::LlmError;

const EXIT_COMMANDS: [&str; 2] = ["exit", "quit"];
const UPLOAD_COMMAND: &str = "--upload";

/// Chat loop switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatbotOptions {
    /// Print deltas as they arrive
    pub stream: bool,
    /// Print token usage after each reply
    pub display_stats: bool,
}

impl Default for ChatbotOptions {
    fn default() -> Self {
        Self {
            stream: true,
            display_stats: false,
        }
    }
}

/// A reply as far as the chat loop cares
struct Turn {
    content: String,
    usage: Option<Usage>,
}

/// Interactive conversation with history kept across turns
pub struct Chatbot<C> {
    client: C,
    options: ChatbotOptions,
    history: Vec<Message>,
}

impl<C: ConversationClient> Chatbot<C> {
    pub fn new(client: C, options: ChatbotOptions) -> Self {
        Self {
            client,
            options,
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Run the loop on stdin and stdout
    pub async fn cli_run(&mut self) -> io::Result<()> {
        self.run(BufReader::new(io::stdin()), io::stdout()).await
    }

    /// Run the loop until an exit command or end of input.
    ///
    /// Failed turns are reported and dropped from the history; only I/O errors end the loop.
    pub async fn run<R, W>(&mut self, input: R, mut output: W) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        let mut attachment: Option<String> = None;

        output
            .write_all(b"Chatbot started. Type 'exit' to quit.\n\n")
            .await?;

        loop {
            output.write_all(b"YOU: ").await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                output.write_all(b"\nChatbot session ended.\n").await?;
                break;
            };
            let line = line.trim();

            if EXIT_COMMANDS.iter().any(|cmd| line.eq_ignore_ascii_case(cmd)) {
                output.write_all(b"Chatbot session ended.\n").await?;
                break;
            }

            if let Some(path) = line.strip_prefix(UPLOAD_COMMAND) {
                let path = path.trim();
                if path.is_empty() {
                    output.write_all(b"Usage: --upload <path>\n\n").await?;
                } else {
                    output
                        .write_all(format!("Attached {}. Type your message.\n\n", path).as_bytes())
                        .await?;
                    attachment = Some(path.to_string());
                }
                continue;
            }

            let message = match attachment.take() {
                Some(path) => match Message::from_file(&path, line) {
                    Ok(message) => message,
                    Err(e) => {
                        output.write_all(format!("Error: {}\n\n", e).as_bytes()).await?;
                        continue;
                    }
                },
                None if line.is_empty() => continue,
                None => Message::user(line),
            };

            self.history.push(message);
            debug!(turns = self.history.len(), "Chat turn");

            let result = if self.options.stream {
                self.stream_turn(&mut output).await?
            } else {
                self.reply_turn(&mut output).await?
            };

            match result {
                Ok(turn) => {
                    if self.options.display_stats {
                        write_usage(&mut output, turn.usage.as_ref()).await?;
                    }
                    self.history.push(Message::assistant(turn.content));
                }
                Err(e) => {
                    warn!(error = %e, "Chat turn failed");
                    self.history.pop();
                    output.write_all(format!("Error: {}\n\n", e).as_bytes()).await?;
                }
            }
        }

        output.flush().await
    }

    async fn reply_turn<W>(&self, output: &mut W) -> io::Result<Result<Turn, LlmError>>
    where
        W: AsyncWrite + Unpin,
    {
        let response = match self.client.reply(self.history.clone()).await {
            Ok(response) => response,
            Err(e) => return Ok(Err(e)),
        };

        output
            .write_all(format!("\nBOT: {}\n\n", response.content).as_bytes())
            .await?;

        Ok(Ok(Turn {
            content: response.content,
            usage: response.usage,
        }))
    }

    async fn stream_turn<W>(&self, output: &mut W) -> io::Result<Result<Turn, LlmError>>
    where
        W: AsyncWrite + Unpin,
    {
        let mut stream = match self.client.reply_stream(self.history.clone()).await {
            Ok(stream) => stream,
            Err(e) => return Ok(Err(e)),
        };

        output.write_all(b"\nBOT: ").await?;
        output.flush().await?;

        let mut content = String::new();
        let mut usage = None;

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    output.write_all(b"\n").await?;
                    return Ok(Err(e));
                }
            };

            if !chunk.content.is_empty() {
                output.write_all(chunk.content.as_bytes()).await?;
                output.flush().await?;
                content.push_str(&chunk.content);
            }

            if chunk.usage.is_some() {
                usage = chunk.usage;
            }
        }

        output.write_all(b"\n\n").await?;

        Ok(Ok(Turn { content, usage }))
    }
}

async fn write_usage<W>(output: &mut W, usage: Option<&Usage>) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let line = match usage {
        Some(usage) => format!(
            "Tokens: {} prompt, {} completion, {} total\n\n",
            usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
        ),
        None => "Tokens: not reported\n\n".to_string(),
    };

    output.write_all(line.as_bytes()).await
}
