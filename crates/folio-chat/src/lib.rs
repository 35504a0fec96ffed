//! # folio-chat
//!
//! Conversation core of the portfolio chat widget.
//!
//! A [`ChatSession`] keeps the transcript, streams replies from the backend
//! into it, and handles the `leave_message` tool: when the assistant proposes
//! a contact form, the visitor accepts (possibly after editing) or rejects it,
//! and the session reports the outcome to the model and asks for a follow-up.
//!
//! ## Example
//!
//! ```no_run
//! use folio_chat::{ChatSession, Phase};
//! use folio_chat_client::HttpChatClient;
//! use folio_chat_common::ClientConfig;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = HttpChatClient::new(ClientConfig::default())?;
//! let session = ChatSession::new(client.clone(), client);
//!
//! session.send_message("Can I get in touch with you?").await?;
//!
//! if session.phase() == Phase::AwaitingToolResolution {
//!     if let Some(call) = session.pending_tool_call() {
//!         let params = call.leave_message_params().unwrap_or_default();
//!         session.resolve_tool_accept(&call.id, params).await?;
//!     }
//! }
//!
//! for message in session.messages() {
//!     println!("{:?}: {}", message.role, message.content);
//! }
//! # Ok(())
//! # }
//! ```

pub mod accumulator;
pub mod error;
pub mod gateway;
pub mod session;

pub use folio_chat_client::*;
pub use folio_chat_common::*;

pub use accumulator::MessageAccumulator;
pub use error::SessionError;
pub use gateway::ToolResolutionGateway;
pub use session::{ChatSession, ChatState, Phase};
