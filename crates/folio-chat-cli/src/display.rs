//! Display utilities for CLI output formatting
//!
//! Provides formatted output for the streamed transcript, the contact form
//! and its outcome.

use std::io::{self, Write};

use colored::Colorize;
use folio_chat::{ChatState, LeaveMessageParams, Message, MessageRole, ToolResponseStatus};

/// Conversation starters offered before the first message.
pub const SUGGESTIONS: [&str; 4] = [
    "Tell me about your projects",
    "What technologies do you use?",
    "Share your experience",
    "What's your background?",
];

/// The line shown for a resolved contact form.
#[must_use]
pub const fn status_line(status: ToolResponseStatus) -> &'static str {
    match status {
        ToolResponseStatus::Sent => "✓ Message sent successfully!",
        ToolResponseStatus::Failed => "✗ Failed to leave message. Please try again.",
        ToolResponseStatus::Cancelled => "Message cancelled.",
    }
}

/// Display the greeting and conversation starters
pub fn display_welcome() {
    println!("{}", "Folio Chat".bright_magenta().bold());
    println!("Hi! Ask me anything about my work, or pick a suggestion.");
    display_suggestions();
    println!("{}", ":help for commands, Ctrl-D to exit".dimmed());
    println!();
}

/// Display the numbered conversation starters
pub fn display_suggestions() {
    for (i, suggestion) in SUGGESTIONS.iter().enumerate() {
        println!("  {} {suggestion}", format!("{}.", i + 1).bright_yellow());
    }
}

/// Display the proposed contact form
pub fn display_contact_form(params: &LeaveMessageParams) {
    println!();
    println!("{}", "Leave a message".bright_cyan().bold());
    for (label, value) in [
        ("Name", params.from_name.as_str()),
        ("Email", params.from_email.as_str()),
        ("Subject", params.subject.as_str()),
        ("Message", params.body.as_str()),
    ] {
        println!("  {} {value}", format!("{label}:").bright_blue());
    }
}

/// Prints transcript entries as they appear in successive snapshots.
///
/// Assistant replies are streamed: each render prints only the text added
/// since the previous one. The visitor's own messages are not echoed.
#[derive(Debug)]
pub struct TranscriptPrinter<W> {
    out: W,
    /// Index of the first message not yet fully printed.
    cursor: usize,
    /// Text already printed for the message at `cursor`.
    shown: Option<String>,
}

impl TranscriptPrinter<io::Stdout> {
    /// A printer writing to stdout, starting after the first `cursor` messages.
    #[must_use]
    pub fn stdout(cursor: usize) -> Self {
        Self::new(io::stdout(), cursor)
    }
}

impl<W: Write> TranscriptPrinter<W> {
    /// A printer writing to `out`, starting after the first `cursor` messages.
    pub const fn new(out: W, cursor: usize) -> Self {
        Self {
            out,
            cursor,
            shown: None,
        }
    }

    /// Prints whatever a snapshot adds over the previous render.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn render(&mut self, state: &ChatState) -> io::Result<()> {
        self.render_messages(state.messages(), state.is_loading())
    }

    /// Prints new entries of `messages`; with `streaming` set, the newest
    /// assistant message is still growing.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn render_messages(&mut self, messages: &[Message], streaming: bool) -> io::Result<()> {
        while let Some(message) = messages.get(self.cursor) {
            let is_last = self.cursor + 1 == messages.len();
            match message.role {
                MessageRole::Assistant => {
                    if self.shown.is_none() {
                        writeln!(self.out, "{}", "●".bright_green())?;
                    }
                    let shown = self.shown.get_or_insert_with(String::new);
                    if let Some(fresh) = message.content.strip_prefix(shown.as_str()) {
                        write!(self.out, "{fresh}")?;
                    } else {
                        // The reply was replaced, e.g. by the error message
                        write!(self.out, "\n{}", message.content)?;
                    }
                    shown.clone_from(&message.content);
                    self.out.flush()?;

                    if is_last && streaming {
                        return Ok(());
                    }
                    writeln!(self.out)?;
                    self.shown = None;
                }
                MessageRole::Tool => {
                    if let Some(response) = message.as_tool_response() {
                        let line = status_line(response.status);
                        let line = match response.status {
                            ToolResponseStatus::Sent => line.bright_green(),
                            ToolResponseStatus::Failed => line.bright_red(),
                            ToolResponseStatus::Cancelled => line.dimmed(),
                        };
                        writeln!(self.out, "{line}")?;
                    }
                }
                MessageRole::User | MessageRole::System | MessageRole::Developer => {}
            }
            self.cursor += 1;
        }
        Ok(())
    }

    /// Consumes the printer, returning the writer.
    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}
