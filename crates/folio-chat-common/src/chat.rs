//! Transcript messages and the streamed deltas that build them.
//!
//! # Overview
//!
//! - [`Message`]: one transcript entry. Assistant messages start life as an
//!   empty placeholder and grow while their reply streams in.
//! - [`MessageDelta`]: one decoded stream event. Every field is optional
//!   because an event only carries what became available since the last one.
//!
//! # Wire format
//!
//! Both types serialize with camelCase keys (`toolCalls`, `toolCallId`), which
//! is what the generation endpoint accepts in its request body and emits in
//! its stream.
//!
//! # Examples
//!
//! ```
//! use folio_chat_common::chat::{Message, MessageRole};
//!
//! let msg = Message::user("Tell me about your projects");
//! assert_eq!(msg.role, MessageRole::User);
//!
//! let json = serde_json::to_value(&msg).unwrap();
//! assert_eq!(json, serde_json::json!({"role": "user", "content": "Tell me about your projects"}));
//! ```

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use typed_builder::TypedBuilder;

use crate::tools::{ToolCall, ToolCallDelta, ToolName, ToolResponse, find_tool_call};

/// Fixed text shown in place of a reply that failed or produced nothing.
pub const ERROR_MESSAGE: &str = "Sorry, I encountered an error. Please try again.";

/// Represents the role of a message sender in a conversation.
///
/// Roles serialize to lowercase strings:
///
/// ```
/// use folio_chat_common::chat::MessageRole;
///
/// let json = serde_json::to_string(&MessageRole::Developer).unwrap();
/// assert_eq!(json, "\"developer\"");
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System-level instructions.
    System,
    /// The visitor.
    User,
    /// The model's reply.
    Assistant,
    /// The outcome of a tool call, as a serialized [`ToolResponse`].
    Tool,
    /// Developer-level instructions.
    Developer,
}

/// A single transcript entry.
///
/// The role is fixed at creation. `content` and `refusal` only ever grow while
/// the message is streaming, and `tool_calls` only lists calls that are
/// complete (see [`ToolCall::is_complete`]).
///
/// ```
/// use folio_chat_common::chat::{Message, MessageRole};
///
/// let msg = Message::builder()
///     .role(MessageRole::Assistant)
///     .content("Hi there!")
///     .build();
/// assert!(msg.tool_calls.is_empty());
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// The role of the message sender.
    pub role: MessageRole,

    /// Accumulated text.
    ///
    /// For `tool` messages this is the JSON-encoded [`ToolResponse`].
    #[builder(default, setter(into))]
    #[serde(default)]
    pub content: String,

    /// Accumulated refusal text, normally absent.
    #[builder(default, setter(strip_option, into))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refusal: Option<String>,

    /// Tool calls requested by an assistant message.
    ///
    /// Uses `SmallVec` since a reply carries at most one or two calls.
    #[builder(default)]
    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub tool_calls: SmallVec<[ToolCall; 2]>,

    /// For `tool` messages, the id of the call being answered.
    #[builder(default, setter(strip_option, into))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn with_role(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            refusal: None,
            tool_calls: SmallVec::new(),
            tool_call_id: None,
        }
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::User, content)
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::Assistant, content)
    }

    /// Creates the empty assistant message a streaming reply is written into.
    #[must_use]
    pub fn placeholder() -> Self {
        Self::with_role(MessageRole::Assistant, String::new())
    }

    /// Creates the assistant message shown when a reply fails.
    #[must_use]
    pub fn error() -> Self {
        Self::with_role(MessageRole::Assistant, ERROR_MESSAGE)
    }

    /// Creates a `tool` message answering `tool_call_id` with `response`.
    pub fn tool_response(tool_call_id: impl Into<String>, response: &ToolResponse) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::with_role(MessageRole::Tool, response.to_content())
        }
    }

    /// Returns the first call to `tool` on this message.
    #[must_use]
    pub fn find_tool_call(&self, tool: ToolName) -> Option<&ToolCall> {
        find_tool_call(&self.tool_calls, tool)
    }

    /// Decodes this message as a tool response, if it is one.
    #[must_use]
    pub fn as_tool_response(&self) -> Option<ToolResponse> {
        if self.role != MessageRole::Tool {
            return None;
        }
        ToolResponse::parse(&self.content)
    }

    /// Whether this message answers the call with the given id.
    #[must_use]
    pub fn answers(&self, tool_call_id: &str) -> bool {
        self.role == MessageRole::Tool && self.tool_call_id.as_deref() == Some(tool_call_id)
    }
}

/// One decoded stream event: the fields of a message that became available.
///
/// ```
/// use folio_chat_common::chat::MessageDelta;
///
/// let delta: MessageDelta = serde_json::from_str(r#"{"content":"Hi"}"#).unwrap();
/// assert_eq!(delta.content.as_deref(), Some("Hi"));
/// assert!(delta.role.is_none());
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageDelta {
    /// Role, typically only in the first event of a reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<MessageRole>,
    /// Next slice of content text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Next slice of refusal text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refusal: Option<String>,
    /// Tool-call fragments. Only the first entry is meaningful.
    #[serde(default, alias = "tool_calls", skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
    /// Tool-call back-reference, unused on assistant replies.
    #[serde(default, alias = "tool_call_id", skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl MessageDelta {
    /// A delta carrying only a role.
    #[must_use]
    pub fn role(role: MessageRole) -> Self {
        Self {
            role: Some(role),
            ..Self::default()
        }
    }

    /// A delta carrying only content text.
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// A delta carrying a single tool-call fragment.
    #[must_use]
    pub fn tool_call(fragment: ToolCallDelta) -> Self {
        Self {
            tool_calls: Some(vec![fragment]),
            ..Self::default()
        }
    }
}

/// Finds the response recorded for `tool_call_id`, if the visitor resolved it.
#[must_use]
pub fn find_tool_response(messages: &[Message], tool_call_id: &str) -> Option<ToolResponse> {
    messages
        .iter()
        .find(|m| m.answers(tool_call_id))
        .and_then(Message::as_tool_response)
}

/// Whether any `tool` message answers `tool_call_id`.
#[must_use]
pub fn is_resolved(messages: &[Message], tool_call_id: &str) -> bool {
    messages.iter().any(|m| m.answers(tool_call_id))
}

/// Returns the `leave_message` call awaiting the visitor's decision.
///
/// That is the call on the newest message when the newest message is an
/// assistant reply carrying a complete, unanswered `leave_message` call.
#[must_use]
pub fn pending_tool_call(messages: &[Message]) -> Option<&ToolCall> {
    let last = messages.last()?;
    if last.role != MessageRole::Assistant {
        return None;
    }
    last.find_tool_call(ToolName::LeaveMessage)
        .filter(|tc| tc.is_complete() && !is_resolved(messages, &tc.id))
}
