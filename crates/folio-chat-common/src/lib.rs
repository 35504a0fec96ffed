//! # folio-chat-common
//!
//! Shared types for the folio chat widget.
//!
//! This crate provides the data model the rest of the workspace builds on:
//! - Transcript messages and the deltas streamed to build them
//! - Tool calls, the `leave_message` contact form, and tool responses
//! - Backend client configuration
//!
//! ## Example
//!
//! ```
//! use folio_chat_common::{LeaveMessageParams, Message, ToolCall, ToolResponse};
//!
//! // A streamed reply that proposes a contact form
//! let mut reply = Message::assistant("I can pass that on.");
//! reply.tool_calls.push(ToolCall::new(
//!     "call_1",
//!     "leave_message",
//!     r#"{"fromName":"Ada","fromEmail":"ada@example.com","subject":"Hi","body":"Hello!"}"#,
//! ));
//!
//! let params: LeaveMessageParams = reply.tool_calls[0].leave_message_params().unwrap();
//! assert_eq!(params.from_name, "Ada");
//!
//! // The visitor declines
//! let answer = Message::tool_response("call_1", &ToolResponse::cancelled());
//! assert_eq!(answer.content, r#"{"status":"cancelled"}"#);
//! ```

/// Transcript messages and stream deltas.
pub mod chat;
/// Backend configuration and request bodies.
pub mod client;
/// Tool calls and tool responses.
pub mod tools;

pub use chat::{ERROR_MESSAGE, Message, MessageDelta, MessageRole};
pub use client::{ClientConfig, GenerateRequest, RequestMessage, RetryConfig};
pub use tools::{
    FunctionCall, FunctionCallDelta, LeaveMessageParams, ToolCall, ToolCallDelta, ToolName,
    ToolResponse, ToolResponseStatus,
};
