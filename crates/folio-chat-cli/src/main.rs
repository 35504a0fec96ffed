//! Folio Chat CLI - terminal front-end for the portfolio chat widget
//!
//! Streams replies from the chat backend into the terminal and walks the
//! visitor through any contact form the assistant proposes.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use folio_chat::{ChatSession, HttpChatClient};

use crate::config::{BASE_URL_ENV, Settings};

mod config;
mod display;
mod error;
mod repl;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the chat backend (or set FOLIO_CHAT_BASE_URL env var)
    #[arg(long)]
    base_url: Option<String>,

    /// Path to the configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
}

/// Initializes structured logging with tracing.
///
/// Supports two output formats via `FOLIO_CHAT_LOG_FORMAT` environment variable:
/// - `json`: Machine-readable JSON logs
/// - `pretty`: Human-readable formatted logs (default)
///
/// Log level is controlled via `RUST_LOG` environment variable. Logs go to
/// stderr so they never interleave with the streamed transcript.
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let format = std::env::var("FOLIO_CHAT_LOG_FORMAT")
        .unwrap_or_else(|_| "pretty".to_string())
        .to_lowercase();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("folio_chat=info,folio_chat_client=info,folio_chat_cli=info")
    });

    match format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .init();
        }
        _ => {
            fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(false)
                .with_line_number(false)
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing();

    let mut settings = match Settings::load(args.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return Err(e.into());
        }
    };
    settings.apply_base_url_override(std::env::var(BASE_URL_ENV).ok());
    if let Some(base_url) = args.base_url {
        settings.base_url = base_url;
    }
    if args.timeout.is_some() {
        settings.timeout_seconds = args.timeout;
    }
    settings.validate().context("Invalid configuration")?;

    let client = HttpChatClient::new(settings.client_config())
        .context("Failed to initialize the chat client")?;
    let session = ChatSession::new(client.clone(), client);

    info!(
        "Starting conversation {} against {}",
        session.conversation_id(),
        settings.base_url
    );

    repl::run_repl(session).await
}
