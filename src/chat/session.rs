//! Interactive terminal session.
//!
//! Reads lines from stdin, intercepts slash commands, and sends
//! everything else through the conversation to the completion client.
//! One question is in flight at a time: the loop does not read the
//! next line until the current answer is in.

use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use super::conversation::{Conversation, MessageId, Sender};
use super::display::{render_message, ExpandedMessages};
use super::topics::{topic_by_number, SUGGESTED_QUESTIONS, TOPICS};
use crate::assistant::CompletionClient;
use crate::config::Config;

/// Whether the session keeps reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct ChatSession<W: Write> {
    client: CompletionClient,
    conversation: Conversation,
    expanded: ExpandedMessages,
    collapse_threshold: usize,
    out: W,
}

impl<W: Write> ChatSession<W> {
    pub fn new(config: &Config, client: CompletionClient, out: W) -> Self {
        Self {
            client,
            conversation: Conversation::with_welcome(&config.assistant.welcome_message),
            expanded: ExpandedMessages::new(),
            collapse_threshold: config.display.collapse_threshold,
            out,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Prints the conversation so far and, for a fresh one, some
    /// questions to try.
    pub fn print_intro(&mut self) -> Result<()> {
        self.cmd_history()?;
        if self.conversation.is_fresh() {
            self.cmd_suggest()?;
        }
        Ok(())
    }

    /// Reads stdin until EOF, `/quit` or Ctrl-C.
    pub async fn run(mut self) -> Result<()> {
        self.print_intro()?;

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            write!(self.out, "> ")?;
            self.out.flush()?;

            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, exiting");
                    break;
                }
            };

            let Some(line) = line else {
                debug!("End of input");
                break;
            };

            // A pending completion must not keep Ctrl-C from exiting
            let flow = tokio::select! {
                flow = self.handle_line(&line) => flow?,
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted while waiting for an answer, exiting");
                    break;
                }
            };
            if flow == Flow::Quit {
                break;
            }
        }

        writeln!(self.out, "Goodbye!")?;
        Ok(())
    }

    /// Handles one line of input.
    pub async fn handle_line(&mut self, line: &str) -> Result<Flow> {
        let trimmed = line.trim();
        if trimmed.starts_with('/') {
            return self.handle_command(trimmed).await;
        }
        self.ask(line).await?;
        Ok(Flow::Continue)
    }

    // ── Slash commands ────────────────────────────────────

    async fn handle_command(&mut self, body: &str) -> Result<Flow> {
        let mut parts = body.splitn(2, ' ');
        let command = parts.next().unwrap_or_default().to_lowercase();
        let arg = parts.next().map(str::trim).unwrap_or_default();

        debug!("Slash command: {command}");

        match command.as_str() {
            "/quit" | "/exit" => return Ok(Flow::Quit),
            "/help" => self.cmd_help()?,
            "/topics" => self.cmd_topics()?,
            "/topic" => self.cmd_topic(arg).await?,
            "/suggest" => self.cmd_suggest()?,
            "/more" => self.cmd_more(arg)?,
            "/history" => self.cmd_history()?,
            _ => writeln!(
                self.out,
                "Unknown command: {command}\nType /help for available commands."
            )?,
        }
        Ok(Flow::Continue)
    }

    fn cmd_help(&mut self) -> Result<()> {
        writeln!(
            self.out,
            "Commands:\n\
             /topics       list study topics\n\
             /topic <n>    ask about topic n\n\
             /suggest      show suggested questions\n\
             /more <id>    show more/less of a long answer\n\
             /history      show the whole conversation\n\
             /help         this help\n\
             /quit         leave\n\
             Anything else is sent as a question."
        )?;
        Ok(())
    }

    fn cmd_topics(&mut self) -> Result<()> {
        writeln!(self.out, "Topics:")?;
        for (i, topic) in TOPICS.iter().enumerate() {
            writeln!(self.out, "  {}. {}", i + 1, topic.name)?;
        }
        writeln!(self.out, "Type /topic <n> to ask about one.")?;
        Ok(())
    }

    async fn cmd_topic(&mut self, arg: &str) -> Result<()> {
        match arg.parse::<usize>().ok().and_then(topic_by_number) {
            Some(topic) => self.ask(topic.prompt).await,
            None => {
                writeln!(
                    self.out,
                    "Usage: /topic <n> with n between 1 and {}",
                    TOPICS.len()
                )?;
                Ok(())
            }
        }
    }

    fn cmd_suggest(&mut self) -> Result<()> {
        writeln!(self.out, "Try asking:")?;
        for question in SUGGESTED_QUESTIONS {
            writeln!(self.out, "  \"{question}\"")?;
        }
        Ok(())
    }

    fn cmd_more(&mut self, arg: &str) -> Result<()> {
        let Ok(raw_id) = arg.parse::<u64>() else {
            writeln!(self.out, "Usage: /more <message id>")?;
            return Ok(());
        };

        match self.toggle_expand(MessageId(raw_id)) {
            Some(rendered) => writeln!(self.out, "{rendered}")?,
            None => writeln!(self.out, "Message #{raw_id} has nothing more to show.")?,
        }
        Ok(())
    }

    fn cmd_history(&mut self) -> Result<()> {
        for message in self.conversation.messages() {
            writeln!(
                self.out,
                "{}\n",
                render_message(message, &self.expanded, self.collapse_threshold)
            )?;
        }
        Ok(())
    }

    // ── Presentation boundary ─────────────────────────────

    /// Flips a long message between collapsed and full display and
    /// returns its new rendering. `None` for user messages, missing ids,
    /// and answers short enough to always show in full.
    pub fn toggle_expand(&mut self, id: MessageId) -> Option<String> {
        let message = self.conversation.get(id)?;
        if message.sender != Sender::Assistant
            || message.pending
            || message.content.chars().count() <= self.collapse_threshold
        {
            return None;
        }
        self.expanded.toggle(id);
        Some(render_message(message, &self.expanded, self.collapse_threshold))
    }

    /// Submits a question and prints the answer.
    async fn ask(&mut self, text: &str) -> Result<()> {
        if self.conversation.is_busy() {
            writeln!(self.out, "Still waiting for the previous answer…")?;
            return Ok(());
        }
        if text.trim().is_empty() {
            return Ok(());
        }

        writeln!(self.out, "  thinking…")?;
        self.out.flush()?;

        if let Some(id) = self.conversation.submit(text, &self.client).await {
            if let Some(answer) = self.conversation.get(id) {
                writeln!(
                    self.out,
                    "{}\n",
                    render_message(answer, &self.expanded, self.collapse_threshold)
                )?;
            }
        }
        Ok(())
    }
}
