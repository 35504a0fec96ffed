//! Folds streamed deltas into one in-progress assistant message.

use folio_chat_common::{Message, MessageDelta, ToolCall};

/// Builds the assistant message for a single generation request.
///
/// Only one tool call is tracked per reply: every tool-call fragment extends
/// the newest call, regardless of the `index` the upstream service sends.
///
/// ```
/// use folio_chat::MessageAccumulator;
/// use folio_chat_common::{MessageDelta, MessageRole};
///
/// let mut acc = MessageAccumulator::new();
/// acc.accumulate(&MessageDelta::role(MessageRole::Assistant));
/// acc.accumulate(&MessageDelta::content("Hi"));
/// acc.accumulate(&MessageDelta::content(" there!"));
///
/// assert!(acc.has_content());
/// assert_eq!(acc.state().content, "Hi there!");
/// ```
#[derive(Debug, Clone)]
pub struct MessageAccumulator {
    message: Message,
}

impl Default for MessageAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageAccumulator {
    /// Starts an empty assistant message.
    #[must_use]
    pub fn new() -> Self {
        Self {
            message: Message::placeholder(),
        }
    }

    /// Applies one delta.
    pub fn accumulate(&mut self, delta: &MessageDelta) {
        if let Some(role) = delta.role {
            self.message.role = role;
        }

        if let Some(content) = delta.content.as_deref().filter(|c| !c.is_empty()) {
            self.message.content.push_str(content);
        }

        if let Some(refusal) = delta.refusal.as_deref().filter(|r| !r.is_empty()) {
            self.message
                .refusal
                .get_or_insert_with(String::new)
                .push_str(refusal);
        }

        let Some(fragment) = delta.tool_calls.as_ref().and_then(|calls| calls.first()) else {
            return;
        };
        if self.message.tool_calls.is_empty() {
            self.message.tool_calls.push(ToolCall::default());
        }
        if let Some(call) = self.message.tool_calls.last_mut() {
            call.apply_delta(fragment);
        }
    }

    /// Whether the reply produced anything worth showing: text or a tool call,
    /// complete or not.
    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.message.content.is_empty() || !self.message.tool_calls.is_empty()
    }

    /// The message so far, with tool calls that are not yet complete left out.
    #[must_use]
    pub fn state(&self) -> Message {
        let mut message = self.message.clone();
        message.tool_calls.retain(|call| call.is_complete());
        message
    }
}


#[cfg(test)]
mod proptests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;
    use folio_chat_common::ToolCallDelta;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn content_grows_monotonically_and_concatenates(
            fragments in prop::collection::vec(".{0,10}", 0..30),
        ) {
            let mut acc = MessageAccumulator::new();
            let mut previous = String::new();
            for fragment in &fragments {
                acc.accumulate(&MessageDelta::content(fragment.as_str()));
                let current = acc.state().content;
                prop_assert!(current.starts_with(&previous));
                previous = current;
            }
            prop_assert_eq!(previous, fragments.concat());
        }

        #[test]
        fn at_most_one_tool_call_in_progress(
            fragments in prop::collection::vec("[a-z{}:\",]{0,6}", 1..20),
        ) {
            let mut acc = MessageAccumulator::new();
            acc.accumulate(&MessageDelta::tool_call(ToolCallDelta::start("call_1", "leave_message")));
            for fragment in &fragments {
                acc.accumulate(&MessageDelta::tool_call(ToolCallDelta::arguments(fragment.as_str())));
            }

            let state = acc.state();
            prop_assert!(state.tool_calls.len() <= 1);
            let expected = fragments.concat();
            let complete = serde_json::from_str::<serde_json::Value>(expected.trim()).is_ok()
                && !expected.trim().is_empty();
            prop_assert_eq!(state.tool_calls.len() == 1, complete);
            if let Some(call) = state.tool_calls.first() {
                prop_assert_eq!(&call.function.arguments, &expected);
            }
        }
    }
}
