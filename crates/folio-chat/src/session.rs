//! The conversation state machine.
//!
//! A [`ChatSession`] owns the transcript and drives generation requests
//! against a [`ChatTransport`]. Its state lives in a `tokio::sync::watch`
//! channel: every transition is applied inside a single `send_if_modified`
//! closure, so checking and setting the in-flight flag, or the continuation
//! mark, cannot interleave with another transition. Observers get every
//! committed snapshot through [`ChatSession::subscribe`].
//!
//! ## Lifecycle
//!
//! 1. [`send_message`](ChatSession::send_message) appends the user's message
//!    and an empty assistant placeholder, then streams the reply into it.
//! 2. A reply carrying a complete `leave_message` call leaves the session in
//!    [`Phase::AwaitingToolResolution`].
//! 3. [`resolve_tool_accept`](ChatSession::resolve_tool_accept) or
//!    [`resolve_tool_reject`](ChatSession::resolve_tool_reject) appends a
//!    `tool` message, which triggers exactly one follow-up generation.

use std::collections::HashSet;
use std::sync::Arc;

use futures::StreamExt;
use log::{debug, error, info, warn};
use tokio::sync::watch;
use uuid::Uuid;

use folio_chat_client::{ChatTransport, MessageGateway};
use folio_chat_common::chat::pending_tool_call;
use folio_chat_common::{LeaveMessageParams, Message, MessageRole, ToolCall, ToolResponse};

use crate::accumulator::MessageAccumulator;
use crate::error::SessionError;
use crate::gateway::ToolResolutionGateway;

/// What the session is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the visitor to type.
    Idle,
    /// A reply is streaming.
    AwaitingStream,
    /// The newest reply proposes a contact form the visitor has not answered.
    AwaitingToolResolution,
}

/// One committed snapshot of a conversation.
#[derive(Debug, Clone, Default)]
pub struct ChatState {
    messages: Vec<Message>,
    is_loading: bool,
    has_chat_started: bool,
    /// Transcript length at the last continuation; only ever grows.
    continuation_mark: usize,
    closed: bool,
    /// Tool calls whose resolution has begun.
    resolved: HashSet<String>,
}

impl ChatState {
    /// The transcript, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Whether a reply is streaming.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Whether the visitor has sent at least one message.
    #[must_use]
    pub const fn has_chat_started(&self) -> bool {
        self.has_chat_started
    }

    /// Whether the session was closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// The `leave_message` call awaiting the visitor's decision, if any.
    #[must_use]
    pub fn pending_tool_call(&self) -> Option<&ToolCall> {
        if self.is_loading {
            return None;
        }
        pending_tool_call(&self.messages).filter(|call| !self.resolved.contains(&call.id))
    }

    /// Derives the current phase from the snapshot.
    #[must_use]
    pub fn phase(&self) -> Phase {
        if self.is_loading {
            Phase::AwaitingStream
        } else if self.pending_tool_call().is_some() {
            Phase::AwaitingToolResolution
        } else {
            Phase::Idle
        }
    }

    /// Marks a request in flight and appends the placeholder it streams into.
    fn begin_generation(&mut self) -> Generation {
        let history = self.messages.clone();
        self.messages.push(Message::placeholder());
        self.is_loading = true;
        Generation {
            history,
            slot: self.messages.len() - 1,
        }
    }

    /// Starts a follow-up request if a `tool` message is newest and has not
    /// been continued from yet.
    fn claim_continuation(&mut self) -> Option<Generation> {
        if self.closed || self.is_loading {
            return None;
        }
        let last = self.messages.last()?;
        if last.role != MessageRole::Tool || self.messages.len() <= self.continuation_mark {
            return None;
        }
        self.continuation_mark = self.messages.len();
        Some(self.begin_generation())
    }
}

/// A generation request: what was sent, and where the reply is written.
#[derive(Debug)]
struct Generation {
    history: Vec<Message>,
    slot: usize,
}

enum StreamOutcome {
    Replied,
    Failed,
    Closed,
}

struct Inner<T, G> {
    transport: T,
    gateway: ToolResolutionGateway<G>,
    state: watch::Sender<ChatState>,
    conversation_id: Uuid,
}

/// A single visitor conversation.
///
/// Cloning is cheap and every clone drives the same conversation.
///
/// Operations that stream (`send_message` and the tool resolutions) return
/// once the reply, and any follow-up it triggers, has finished. Run them on a
/// spawned task and [`subscribe`](Self::subscribe) to render progress.
pub struct ChatSession<T, G> {
    inner: Arc<Inner<T, G>>,
}

impl<T, G> Clone for ChatSession<T, G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, G> std::fmt::Debug for ChatSession<T, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("conversation_id", &self.inner.conversation_id)
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

impl<T: ChatTransport, G: MessageGateway> ChatSession<T, G> {
    /// Creates an empty conversation over the given backend seams.
    pub fn new(transport: T, gateway: G) -> Self {
        let (state, _) = watch::channel(ChatState::default());
        let conversation_id = Uuid::new_v4();
        debug!("Created chat session {conversation_id}");
        Self {
            inner: Arc::new(Inner {
                transport,
                gateway: ToolResolutionGateway::new(gateway),
                state,
                conversation_id,
            }),
        }
    }

    /// Identifier used to correlate log records for this conversation.
    #[must_use]
    pub fn conversation_id(&self) -> Uuid {
        self.inner.conversation_id
    }

    /// A receiver that observes every committed snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.inner.state.subscribe()
    }

    /// A copy of the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> ChatState {
        self.inner.state.borrow().clone()
    }

    /// The transcript, oldest first.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.inner.state.borrow().messages.clone()
    }

    /// Whether a reply is streaming.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading
    }

    /// Whether the visitor has sent at least one message.
    #[must_use]
    pub fn has_chat_started(&self) -> bool {
        self.inner.state.borrow().has_chat_started
    }

    /// What the session is waiting for.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.inner.state.borrow().phase()
    }

    /// The `leave_message` call awaiting the visitor's decision, if any.
    #[must_use]
    pub fn pending_tool_call(&self) -> Option<ToolCall> {
        self.inner.state.borrow().pending_tool_call().cloned()
    }

    /// Sends the visitor's message and streams the reply.
    ///
    /// The text is stored as typed; only the emptiness check trims it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::EmptyMessage`] for blank text,
    /// [`SessionError::RequestInFlight`] while a reply is streaming and
    /// [`SessionError::Closed`] after [`close`](Self::close). The transcript
    /// is untouched in each case.
    pub async fn send_message(&self, text: &str) -> Result<(), SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }

        let mut refused = None;
        let mut generation = None;
        self.inner.state.send_if_modified(|state| {
            if state.closed {
                refused = Some(SessionError::Closed);
                return false;
            }
            if state.is_loading {
                refused = Some(SessionError::RequestInFlight);
                return false;
            }
            state.messages.push(Message::user(text));
            state.has_chat_started = true;
            generation = Some(state.begin_generation());
            true
        });

        if let Some(e) = refused {
            debug!("[{}] Message refused: {e}", self.inner.conversation_id);
            return Err(e);
        }
        if let Some(generation) = generation {
            self.drive(generation).await;
        }
        Ok(())
    }

    /// Accepts a proposed contact form, possibly edited by the visitor.
    ///
    /// `params` is submitted exactly once and echoed back to the model in the
    /// `tool` message, which then triggers a follow-up reply.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ToolCallAlreadyResolved`] if this call was
    /// already accepted or rejected, and [`SessionError::Closed`] after
    /// [`close`](Self::close). Nothing is submitted in either case.
    pub async fn resolve_tool_accept(
        &self,
        tool_call_id: &str,
        params: LeaveMessageParams,
    ) -> Result<(), SessionError> {
        self.claim_resolution(tool_call_id)?;
        info!(
            "[{}] Visitor accepted tool call {tool_call_id}",
            self.inner.conversation_id
        );
        let response = self.inner.gateway.accept(params).await;
        self.record_resolution(tool_call_id, &response).await
    }

    /// Rejects a proposed contact form. Nothing is submitted; the model is
    /// told the visitor cancelled and replies again.
    ///
    /// # Errors
    ///
    /// Same as [`resolve_tool_accept`](Self::resolve_tool_accept).
    pub async fn resolve_tool_reject(&self, tool_call_id: &str) -> Result<(), SessionError> {
        self.claim_resolution(tool_call_id)?;
        info!(
            "[{}] Visitor rejected tool call {tool_call_id}",
            self.inner.conversation_id
        );
        let response = self.inner.gateway.reject();
        self.record_resolution(tool_call_id, &response).await
    }

    /// Tears the session down.
    ///
    /// Deltas, completions and continuations still in progress become no-ops
    /// and further operations return [`SessionError::Closed`].
    pub fn close(&self) {
        let closed = self.inner.state.send_if_modified(|state| {
            if state.closed {
                return false;
            }
            state.closed = true;
            state.is_loading = false;
            true
        });
        if closed {
            debug!("Closed chat session {}", self.inner.conversation_id);
        }
    }

    fn claim_resolution(&self, tool_call_id: &str) -> Result<(), SessionError> {
        let mut refused = None;
        // The resolved set is private, so observers need no notification.
        self.inner.state.send_if_modified(|state| {
            if state.closed {
                refused = Some(SessionError::Closed);
            } else if state.resolved.contains(tool_call_id)
                || folio_chat_common::chat::is_resolved(&state.messages, tool_call_id)
            {
                refused = Some(SessionError::ToolCallAlreadyResolved(
                    tool_call_id.to_string(),
                ));
            } else {
                state.resolved.insert(tool_call_id.to_string());
            }
            false
        });
        refused.map_or(Ok(()), Err)
    }

    async fn record_resolution(
        &self,
        tool_call_id: &str,
        response: &ToolResponse,
    ) -> Result<(), SessionError> {
        let mut closed = false;
        let mut generation = None;
        self.inner.state.send_if_modified(|state| {
            if state.closed {
                closed = true;
                return false;
            }
            state
                .messages
                .push(Message::tool_response(tool_call_id, response));
            generation = state.claim_continuation();
            true
        });

        if closed {
            return Err(SessionError::Closed);
        }
        debug!(
            "[{}] Recorded {} for tool call {tool_call_id}",
            self.inner.conversation_id, response.status
        );
        if let Some(generation) = generation {
            self.drive(generation).await;
        }
        Ok(())
    }

    /// Streams replies until no continuation is due.
    async fn drive(&self, mut generation: Generation) {
        loop {
            let outcome = self.stream_reply(&generation).await;
            if matches!(outcome, StreamOutcome::Closed) {
                return;
            }

            let mut next = None;
            self.inner.state.send_if_modified(|state| {
                if state.closed {
                    return false;
                }
                if matches!(outcome, StreamOutcome::Failed) {
                    if let Some(slot) = state.messages.get_mut(generation.slot) {
                        *slot = Message::error();
                    }
                }
                state.is_loading = false;
                next = state.claim_continuation();
                true
            });

            match next {
                Some(following) => {
                    info!(
                        "[{}] Continuing after tool response",
                        self.inner.conversation_id
                    );
                    generation = following;
                }
                None => return,
            }
        }
    }

    async fn stream_reply(&self, generation: &Generation) -> StreamOutcome {
        let id = self.inner.conversation_id;
        debug!(
            "[{id}] Requesting reply to {} messages",
            generation.history.len()
        );

        let mut stream = match self.inner.transport.generate_stream(&generation.history).await {
            Ok(stream) => stream,
            Err(e) if e.is_rate_limit_error() => {
                match e.retry_after() {
                    Some(delay) => {
                        warn!("[{id}] Rate limited, backend asks to retry after {delay:?}");
                    }
                    None => warn!("[{id}] Rate limited: {e}"),
                }
                return StreamOutcome::Failed;
            }
            Err(e) => {
                error!("[{id}] Generation request failed: {e}");
                return StreamOutcome::Failed;
            }
        };

        let mut accumulator = MessageAccumulator::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(delta) => {
                    accumulator.accumulate(&delta);
                    if !self.overwrite_slot(generation.slot, accumulator.state()) {
                        debug!("[{id}] Session closed while streaming");
                        return StreamOutcome::Closed;
                    }
                }
                Err(e) => {
                    error!("[{id}] Stream failed: {e}");
                    return StreamOutcome::Failed;
                }
            }
        }

        if accumulator.has_content() {
            debug!("[{id}] Reply complete");
            StreamOutcome::Replied
        } else {
            warn!("[{id}] Stream ended without content");
            StreamOutcome::Failed
        }
    }

    /// Writes the reply so far into its placeholder. Returns `false` once the
    /// session is closed.
    fn overwrite_slot(&self, slot: usize, reply: Message) -> bool {
        let mut live = true;
        self.inner.state.send_if_modified(|state| {
            if state.closed {
                live = false;
                return false;
            }
            let Some(message) = state.messages.get_mut(slot) else {
                return false;
            };
            message.content = reply.content;
            message.refusal = reply.refusal;
            message.tool_calls = reply.tool_calls;
            true
        });
        live
    }
}
