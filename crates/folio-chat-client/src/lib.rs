//! # folio-chat-client
//!
//! Client library for the portfolio chat backend.
//!
//! This crate provides the two network seams the chat session depends on:
//! - [`ChatTransport`]: stream a reply to the transcript so far
//! - [`MessageGateway`]: submit a visitor's contact form
//!
//! [`HttpChatClient`] implements both over HTTP. The streamed body is split
//! into `data:` lines by [`sse::SseLineDecoder`] and each line is parsed into
//! a [`MessageDelta`] by [`delta::parse_delta`].
//!
//! ## Example
//!
//! ```no_run
//! use folio_chat_client::{ChatTransport, HttpChatClient};
//! use folio_chat_common::{ClientConfig, Message};
//! use futures::StreamExt;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = HttpChatClient::new(ClientConfig::new("http://localhost:5000"))?;
//!
//! let messages = vec![Message::user("Tell me about your projects")];
//! let mut deltas = client.generate_stream(&messages).await?;
//! while let Some(delta) = deltas.next().await {
//!     if let Some(text) = delta?.content {
//!         print!("{text}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;

use folio_chat_common::{LeaveMessageParams, Message, MessageDelta};

pub mod delta;
pub mod error;
pub mod http;
pub mod sse;

pub use error::ClientError;
pub use http::HttpChatClient;

/// A stream of decoded deltas for one reply.
///
/// Items are `Err` only for transport failures, after which the stream ends.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<MessageDelta, ClientError>> + Send>>;

/// Streams replies from the chat backend.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Opens a generation request for the full ordered transcript.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent or the backend answers
    /// with a non-success status.
    async fn generate_stream(&self, messages: &[Message]) -> Result<DeltaStream, ClientError>;
}

/// Submits contact forms on the visitor's behalf.
#[async_trait]
pub trait MessageGateway: Send + Sync {
    /// Sends one contact form. Implementations must not retry.
    ///
    /// # Errors
    ///
    /// Returns an error if the submission did not succeed.
    async fn submit_leave_message(&self, params: &LeaveMessageParams) -> Result<(), ClientError>;
}

#[async_trait]
impl<T: ChatTransport + ?Sized> ChatTransport for Arc<T> {
    async fn generate_stream(&self, messages: &[Message]) -> Result<DeltaStream, ClientError> {
        (**self).generate_stream(messages).await
    }
}

#[async_trait]
impl<G: MessageGateway + ?Sized> MessageGateway for Arc<G> {
    async fn submit_leave_message(&self, params: &LeaveMessageParams) -> Result<(), ClientError> {
        (**self).submit_leave_message(params).await
    }
}
