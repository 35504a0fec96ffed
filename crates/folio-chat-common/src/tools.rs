//! Tool calls streamed by the assistant and the contact-form payloads they carry.
//!
//! The widget exposes a single tool, `leave_message`, which lets the assistant
//! propose a contact form on the visitor's behalf. The visitor then accepts,
//! edits or rejects the proposal, and the outcome travels back to the model as
//! a [`ToolResponse`] serialized into a `tool` message.

use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

/// Names of the tools the assistant may invoke from the chat widget.
///
/// # Examples
///
/// ```
/// use folio_chat_common::tools::ToolName;
///
/// assert_eq!(ToolName::LeaveMessage.as_str(), "leave_message");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ToolName {
    /// Submit the visitor's contact form to the site owner.
    LeaveMessage,
}

impl ToolName {
    /// Returns the function name used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LeaveMessage => "leave_message",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents an invocation of a function with arguments.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct FunctionCall {
    /// The name of the function being called.
    #[serde(default)]
    pub name: String,
    /// The arguments as JSON text, possibly still incomplete while streaming.
    #[serde(default)]
    pub arguments: String,
}

impl FunctionCall {
    /// Parses the arguments as JSON.
    ///
    /// Returns `None` while the accumulated text is empty or not yet valid JSON.
    #[must_use]
    pub fn arguments_value(&self) -> Option<serde_json::Value> {
        let trimmed = self.arguments.trim();
        if trimmed.is_empty() {
            return None;
        }
        serde_json::from_str(trimmed).ok()
    }
}

fn default_call_type() -> String {
    "function".to_string()
}

/// A tool call issued by the assistant.
///
/// During streaming the fields arrive piecemeal; see [`ToolCall::apply_delta`]
/// for how fragments are folded in and [`ToolCall::is_complete`] for when the
/// call becomes actionable.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ToolCall {
    /// Opaque identifier assigned by the model.
    #[serde(default)]
    pub id: String,
    /// The type of call, always "function" today.
    #[serde(rename = "type", default = "default_call_type")]
    pub call_type: String,
    /// The function being invoked.
    #[serde(default)]
    pub function: FunctionCall,
}

impl Default for ToolCall {
    fn default() -> Self {
        Self {
            id: String::new(),
            call_type: default_call_type(),
            function: FunctionCall::default(),
        }
    }
}

impl ToolCall {
    /// Creates a tool call with the given id, function name and argument text.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            call_type: default_call_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    /// Folds one streamed fragment into this call.
    ///
    /// `id`, `type` and the function name are overwritten when present; argument
    /// text is appended.
    pub fn apply_delta(&mut self, delta: &ToolCallDelta) {
        if let Some(id) = &delta.id {
            self.id.clone_from(id);
        }
        if let Some(call_type) = &delta.call_type {
            self.call_type.clone_from(call_type);
        }
        if let Some(function) = &delta.function {
            if let Some(name) = &function.name {
                self.function.name.clone_from(name);
            }
            if let Some(arguments) = &function.arguments {
                self.function.arguments.push_str(arguments);
            }
        }
    }

    /// Whether the call carries everything needed to act on it.
    ///
    /// A call is complete when its id and function name are non-empty and its
    /// trimmed arguments parse as JSON. This is evaluated on demand and never
    /// cached, since arguments keep growing while the stream is open.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.id.is_empty()
            && !self.function.name.is_empty()
            && self.function.arguments_value().is_some()
    }

    /// Whether this call invokes the given tool.
    #[must_use]
    pub fn is_tool(&self, tool: ToolName) -> bool {
        self.function.name == tool.as_str()
    }

    /// Decodes the contact form carried by a complete `leave_message` call.
    ///
    /// Returns `None` for other tools, incomplete calls, or arguments missing
    /// any of the four fields.
    #[must_use]
    pub fn leave_message_params(&self) -> Option<LeaveMessageParams> {
        if !self.is_tool(ToolName::LeaveMessage) {
            return None;
        }
        let value = self.function.arguments_value()?;
        serde_json::from_value(value).ok()
    }
}

/// A streamed fragment of a tool call.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ToolCallDelta {
    /// Position of the call within the message. Sent by the upstream service
    /// but not used for routing; fragments always extend the newest call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    /// Call identifier, usually present only in the first fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Call type, usually present only in the first fragment.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub call_type: Option<String>,
    /// Function name and argument fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionCallDelta>,
}

impl ToolCallDelta {
    /// Opening fragment naming the call.
    pub fn start(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            index: Some(0),
            id: Some(id.into()),
            call_type: Some(default_call_type()),
            function: Some(FunctionCallDelta {
                name: Some(name.into()),
                arguments: None,
            }),
        }
    }

    /// Follow-up fragment carrying only argument text.
    pub fn arguments(arguments: impl Into<String>) -> Self {
        Self {
            index: Some(0),
            function: Some(FunctionCallDelta {
                name: None,
                arguments: Some(arguments.into()),
            }),
            ..Self::default()
        }
    }
}

/// A streamed fragment of a function invocation.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct FunctionCallDelta {
    /// Function name, usually present only in the first fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Next slice of the JSON argument text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

/// The contact form proposed through a `leave_message` call.
///
/// All four fields must be present; their contents are not validated.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LeaveMessageParams {
    /// Sender's name.
    pub from_name: String,
    /// Sender's email address.
    pub from_email: String,
    /// Subject line.
    pub subject: String,
    /// Message body.
    pub body: String,
}

/// How the visitor resolved a tool call.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolResponseStatus {
    /// Accepted and submitted successfully.
    Sent,
    /// Accepted but the submission failed.
    Failed,
    /// Rejected; nothing was submitted.
    Cancelled,
}

impl ToolResponseStatus {
    /// Returns the wire spelling of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ToolResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of resolving a tool call, serialized into a `tool` message's content.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ToolResponse {
    /// Outcome of the resolution.
    pub status: ToolResponseStatus,
    /// The parameters that were submitted, echoed back to the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<LeaveMessageParams>,
}

impl ToolResponse {
    /// A successful submission of `params`.
    #[must_use]
    pub const fn sent(params: LeaveMessageParams) -> Self {
        Self {
            status: ToolResponseStatus::Sent,
            parameters: Some(params),
        }
    }

    /// A failed submission of `params`.
    #[must_use]
    pub const fn failed(params: LeaveMessageParams) -> Self {
        Self {
            status: ToolResponseStatus::Failed,
            parameters: Some(params),
        }
    }

    /// A rejected call.
    #[must_use]
    pub const fn cancelled() -> Self {
        Self {
            status: ToolResponseStatus::Cancelled,
            parameters: None,
        }
    }

    /// Decodes a `tool` message's content.
    #[must_use]
    pub fn parse(content: &str) -> Option<Self> {
        serde_json::from_str(content).ok()
    }

    /// Serializes the response for a `tool` message's content.
    #[must_use]
    pub fn to_content(&self) -> String {
        // Only strings and a unit enum are involved, so the Err arm is
        // unreachable in practice; fall back to the bare status.
        match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                warn!("ToolResponse serialization unexpectedly failed: {e}");
                format!(r#"{{"status":"{}"}}"#, self.status)
            }
        }
    }
}

/// Finds the first call to `tool` in a list of tool calls.
#[must_use]
pub fn find_tool_call(tool_calls: &[ToolCall], tool: ToolName) -> Option<&ToolCall> {
    tool_calls.iter().find(|tc| tc.is_tool(tool))
}
