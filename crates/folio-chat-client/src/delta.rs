//! Turning decoded `data:` payloads into [`MessageDelta`]s.
//!
//! Individual bad events never end a stream: they are logged and skipped so
//! the rest of the reply still arrives. Only transport failures surface as
//! stream items of type `Err`.

use std::collections::VecDeque;
use std::pin::Pin;

use futures::{Stream, StreamExt, stream};
use log::{debug, warn};

use folio_chat_common::MessageDelta;

use crate::DeltaStream;
use crate::error::ClientError;
use crate::sse::SseLineDecoder;

/// Parses one payload.
///
/// Returns `Ok(None)` for payloads that carry nothing: an empty payload or an
/// empty JSON object (heartbeat).
///
/// # Errors
///
/// Returns [`ClientError::SerializationError`] if the payload is not JSON and
/// [`ClientError::InvalidResponse`] if it is JSON of the wrong shape.
///
/// ```
/// use folio_chat_client::delta::parse_delta;
///
/// assert!(parse_delta("").unwrap().is_none());
/// assert!(parse_delta("{}").unwrap().is_none());
/// let delta = parse_delta(r#"{"content":"Hi"}"#).unwrap().unwrap();
/// assert_eq!(delta.content.as_deref(), Some("Hi"));
/// assert!(parse_delta("[1, 2]").is_err());
/// ```
pub fn parse_delta(payload: &str) -> Result<Option<MessageDelta>, ClientError> {
    if payload.trim().is_empty() {
        return Ok(None);
    }

    let value: serde_json::Value = serde_json::from_str(payload)?;
    let Some(object) = value.as_object() else {
        return Err(ClientError::InvalidResponse(format!(
            "expected a JSON object, got: {payload}"
        )));
    };
    if object.is_empty() {
        return Ok(None);
    }

    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| ClientError::InvalidResponse(format!("unexpected delta shape: {e}")))
}

/// Parses a payload, logging and discarding anything unusable.
fn accept_payload(payload: &str) -> Option<MessageDelta> {
    match parse_delta(payload) {
        Ok(delta) => delta,
        Err(e) => {
            warn!("Dropping malformed stream event: {e}");
            debug!("Problematic event data: {payload}");
            None
        }
    }
}

struct DecodeState<S> {
    body: Pin<Box<S>>,
    decoder: SseLineDecoder,
    pending: VecDeque<MessageDelta>,
    finished: bool,
}

/// Adapts a response body into a stream of deltas.
///
/// Chunks are fed through an [`SseLineDecoder`]; when the body ends, the
/// buffered partial line is flushed as a final event. A body error is yielded
/// once and ends the stream.
pub fn decode_delta_stream<S, B, E>(body: S) -> DeltaStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<ClientError> + Send + 'static,
{
    let state = DecodeState {
        body: Box::pin(body),
        decoder: SseLineDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    let deltas = stream::unfold(state, |mut state| async move {
        loop {
            if let Some(delta) = state.pending.pop_front() {
                return Some((Ok(delta), state));
            }
            if state.finished {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let payloads = state.decoder.push(chunk.as_ref());
                    state
                        .pending
                        .extend(payloads.iter().filter_map(|p| accept_payload(p)));
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(e.into()), state));
                }
                None => {
                    debug!("Response body ended");
                    state.finished = true;
                    let payloads = state.decoder.finish();
                    state
                        .pending
                        .extend(payloads.iter().filter_map(|p| accept_payload(p)));
                }
            }
        }
    });

    Box::pin(deltas)
}
