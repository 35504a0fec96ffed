use thiserror::Error;

/// Reasons a session operation was refused.
///
/// A refused operation leaves the transcript untouched. Transport and
/// submission failures are not reported here; they show up in the transcript.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("A reply is already streaming")]
    RequestInFlight,

    #[error("Session is closed")]
    Closed,

    #[error("Tool call {0} was already resolved")]
    ToolCallAlreadyResolved(String),
}
