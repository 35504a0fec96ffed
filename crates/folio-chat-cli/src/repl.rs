//! REPL mode for interactive conversations.

use std::future::Future;

use anyhow::Result;
use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, warn};

use folio_chat::{ChatSession, ChatTransport, LeaveMessageParams, MessageGateway, SessionError};

use crate::display::{
    SUGGESTIONS, TranscriptPrinter, display_contact_form, display_suggestions, display_welcome,
};

/// What the visitor decided about a proposed contact form.
#[derive(Debug)]
enum Decision {
    Send(LeaveMessageParams),
    Cancel,
}

/// Runs the REPL loop.
///
/// # Errors
///
/// Returns an error if the REPL initialization fails or output cannot be
/// written.
pub async fn run_repl<T, G>(session: ChatSession<T, G>) -> Result<()>
where
    T: ChatTransport + 'static,
    G: MessageGateway + 'static,
{
    display_welcome();

    let mut rl = DefaultEditor::new()?;

    loop {
        let readline = rl.readline(&format!("{} ", ">".bright_green()));

        match readline {
            Ok(line) => {
                let line = line.trim();

                if line.is_empty() {
                    continue;
                }

                // Handle REPL commands
                let text = if let Some(cmd) = line.strip_prefix(':') {
                    let parts: Vec<&str> = cmd.split_whitespace().collect();
                    match parts.as_slice() {
                        ["suggest"] => {
                            display_suggestions();
                            continue;
                        }
                        ["suggest", n] => {
                            let picked = n
                                .parse::<usize>()
                                .ok()
                                .and_then(|n| SUGGESTIONS.get(n.wrapping_sub(1)));
                            match picked {
                                Some(suggestion) => {
                                    println!("{} {suggestion}", ">".bright_green());
                                    (*suggestion).to_string()
                                }
                                None => {
                                    eprintln!(
                                        "{} Pick a suggestion between 1 and {}",
                                        "Error:".bright_red(),
                                        SUGGESTIONS.len()
                                    );
                                    continue;
                                }
                            }
                        }
                        ["help"] => {
                            display_help();
                            continue;
                        }
                        _ => {
                            eprintln!(
                                "{} Unknown command: :{}\nType :help for available commands",
                                "Error:".bright_red(),
                                parts.join(" ")
                            );
                            continue;
                        }
                    }
                } else {
                    let _ = rl.add_history_entry(line);
                    line.to_string()
                };

                let outcome = stream_turn(&session, {
                    let session = session.clone();
                    async move { session.send_message(&text).await }
                })
                .await?;
                if let Err(e) = outcome {
                    eprintln!("{} {e}", "Error:".bright_red());
                    continue;
                }

                resolve_pending_tool_calls(&session, &mut rl).await?;
            }
            Err(ReadlineError::Interrupted) => {
                println!("Interrupted");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("Exiting");
                break;
            }
            Err(err) => {
                eprintln!("Error: {err}");
                break;
            }
        }
    }

    session.close();
    Ok(())
}

fn display_help() {
    println!("{}", "REPL Commands:".bright_cyan().bold());
    println!(
        "  {} - List conversation starters",
        ":suggest".bright_yellow()
    );
    println!(
        "  {} - Send conversation starter <n>",
        ":suggest <n>".bright_yellow()
    );
    println!("  {} - Show this help message", ":help".bright_yellow());
    println!("  {} - Exit the REPL", "Ctrl-D".bright_yellow());
    println!();
}

/// Runs a session operation on its own task while printing the transcript
/// as it grows.
async fn stream_turn<T, G, F>(
    session: &ChatSession<T, G>,
    operation: F,
) -> Result<std::result::Result<(), SessionError>>
where
    T: ChatTransport + 'static,
    G: MessageGateway + 'static,
    F: Future<Output = std::result::Result<(), SessionError>> + Send + 'static,
{
    let mut updates = session.subscribe();
    let start = updates.borrow_and_update().messages().len();
    let mut printer = TranscriptPrinter::stdout(start);

    let mut task = tokio::spawn(operation);
    let outcome = loop {
        tokio::select! {
            result = &mut task => break result?,
            changed = updates.changed() => {
                if changed.is_err() {
                    break (&mut task).await?;
                }
                let state = updates.borrow_and_update().clone();
                printer.render(&state)?;
            }
        }
    };

    printer.render(&session.snapshot())?;
    Ok(outcome)
}

/// Walks the visitor through every contact form the assistant proposes.
async fn resolve_pending_tool_calls<T, G>(
    session: &ChatSession<T, G>,
    rl: &mut DefaultEditor,
) -> Result<()>
where
    T: ChatTransport + 'static,
    G: MessageGateway + 'static,
{
    while let Some(call) = session.pending_tool_call() {
        let params = call.leave_message_params().unwrap_or_else(|| {
            warn!("Tool call {} carries an incomplete contact form", call.id);
            LeaveMessageParams::default()
        });

        let decision = prompt_decision(rl, params)?;
        debug!("Resolving tool call {} with {decision:?}", call.id);

        let id = call.id;
        let operation = {
            let session = session.clone();
            async move {
                match decision {
                    Decision::Send(params) => session.resolve_tool_accept(&id, params).await,
                    Decision::Cancel => session.resolve_tool_reject(&id).await,
                }
            }
        };

        if let Err(e) = stream_turn(session, operation).await? {
            eprintln!("{} {e}", "Error:".bright_red());
            break;
        }
    }
    Ok(())
}

/// Shows the contact form and asks what to do with it.
fn prompt_decision(rl: &mut DefaultEditor, mut params: LeaveMessageParams) -> Result<Decision> {
    loop {
        display_contact_form(&params);
        let prompt = format!(
            "{}end / {}dit / {}ancel > ",
            "[s]".bright_yellow(),
            "[e]".bright_yellow(),
            "[c]".bright_yellow()
        );

        match rl.readline(&prompt) {
            Ok(answer) => match answer.trim().to_lowercase().as_str() {
                "s" | "send" => return Ok(Decision::Send(params)),
                "c" | "cancel" => return Ok(Decision::Cancel),
                "e" | "edit" => params = edit_params(rl, params)?,
                _ => eprintln!("{} Answer s, e or c", "Error:".bright_red()),
            },
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => return Ok(Decision::Cancel),
            Err(err) => return Err(err.into()),
        }
    }
}

/// Re-prompts each field with its current value pre-filled.
fn edit_params(rl: &mut DefaultEditor, params: LeaveMessageParams) -> Result<LeaveMessageParams> {
    let mut edit = |label: &str, current: String| -> Result<String> {
        match rl.readline_with_initial(&format!("{label}: "), (current.as_str(), "")) {
            Ok(value) => Ok(value),
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(current),
            Err(err) => Err(err.into()),
        }
    };

    Ok(LeaveMessageParams {
        from_name: edit("Name", params.from_name)?,
        from_email: edit("Email", params.from_email)?,
        subject: edit("Subject", params.subject)?,
        body: edit("Message", params.body)?,
    })
}
