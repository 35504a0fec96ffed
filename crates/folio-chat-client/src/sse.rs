//! Line decoder for the generation endpoint's `data:` stream.
//!
//! The backend writes one `data: <json>` line per event and never sends blank
//! frame separators, so events are delimited by line-feeds alone. Bytes may
//! arrive either as incremental fragments or as the whole response-so-far on
//! every notification; [`SseLineDecoder`] handles both.

use log::debug;

/// Prefix a line must carry to be treated as an event.
pub const DATA_PREFIX: &str = "data: ";

/// Splits a byte stream into `data:` payloads.
///
/// Only complete lines are emitted. A trailing partial line is buffered until
/// the next push, or until [`finish`](Self::finish) flushes it.
///
/// ```
/// use folio_chat_client::sse::SseLineDecoder;
///
/// let mut decoder = SseLineDecoder::new();
/// assert!(decoder.push(b"data: {\"content\":").is_empty());
/// assert_eq!(decoder.push(b"\"Hi\"}\ndata: {}"), vec![r#"{"content":"Hi"}"#]);
/// assert_eq!(decoder.finish(), vec!["{}"]);
/// ```
#[derive(Debug, Default)]
pub struct SseLineDecoder {
    /// Bytes of the current, not yet terminated line.
    buffer: Vec<u8>,
    /// Length of the cumulative buffer consumed so far.
    consumed: usize,
}

impl SseLineDecoder {
    /// Creates an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an incremental fragment and returns the payloads of any lines it
    /// completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        // '\n' never occurs inside a multi-byte UTF-8 sequence, so splitting
        // on the raw byte cannot cut a character in half.
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(payload) = extract_payload(&line[..pos]) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Accepts the entire response received so far and returns the payloads
    /// of lines completed since the previous call.
    ///
    /// A buffer shorter than what was already consumed is ignored.
    pub fn push_cumulative(&mut self, response: &[u8]) -> Vec<String> {
        let Some(fresh) = response.get(self.consumed..) else {
            debug!(
                "Ignoring cumulative buffer of {} bytes, already consumed {}",
                response.len(),
                self.consumed
            );
            return Vec::new();
        };
        self.consumed = response.len();
        self.push(fresh)
    }

    /// Flushes the buffered partial line as a final, unterminated line.
    pub fn finish(&mut self) -> Vec<String> {
        let line = std::mem::take(&mut self.buffer);
        extract_payload(&line).into_iter().collect()
    }
}

fn extract_payload(line: &[u8]) -> Option<String> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let payload = line.strip_prefix(DATA_PREFIX.as_bytes())?;
    Some(String::from_utf8_lossy(payload).into_owned())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    const TWO_RECORDS: &str = "data: {\"role\":\"assistant\"}\ndata: {\"content\":\"Hi\"}\n";

    #[test]
    fn test_cumulative_boundary_anywhere() {
        for split in 0..=TWO_RECORDS.len() {
            let mut decoder = SseLineDecoder::new();
            let mut payloads = decoder.push_cumulative(&TWO_RECORDS.as_bytes()[..split]);
            payloads.extend(decoder.push_cumulative(TWO_RECORDS.as_bytes()));
            payloads.extend(decoder.finish());
            assert_eq!(
                payloads,
                vec![r#"{"role":"assistant"}"#, r#"{"content":"Hi"}"#],
                "split at {split}"
            );
        }
    }

    #[test]
    fn test_ignores_lines_without_prefix() {
        let mut decoder = SseLineDecoder::new();
        let payloads = decoder.push(b": keep-alive\nevent: message\ndata:{}\ndata: {}\n\n");
        assert_eq!(payloads, vec!["{}"]);
    }

    #[test]
    fn test_strips_carriage_return() {
        let mut decoder = SseLineDecoder::new();
        assert_eq!(decoder.push(b"data: {}\r\n"), vec!["{}"]);
    }

    #[test]
    fn test_empty_payload_is_emitted() {
        let mut decoder = SseLineDecoder::new();
        assert_eq!(decoder.push(b"data: \n"), vec![""]);
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut decoder = SseLineDecoder::new();
        assert!(decoder.push(b"data: {\"content\":\"end\"}").is_empty());
        assert_eq!(decoder.finish(), vec![r#"{"content":"end"}"#]);
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_shorter_cumulative_buffer_is_ignored() {
        let mut decoder = SseLineDecoder::new();
        assert_eq!(decoder.push_cumulative(b"data: 1\ndata: 2\n").len(), 2);
        assert!(decoder.push_cumulative(b"data: 1\n").is_empty());
        assert_eq!(decoder.push_cumulative(b"data: 1\ndata: 2\ndata: 3\n"), vec!["3"]);
    }

    #[test]
    fn test_multibyte_characters_split_across_chunks() {
        let text = "data: {\"content\":\"héllo ✓\"}\n".as_bytes();
        let mut decoder = SseLineDecoder::new();
        let mut payloads = Vec::new();
        for byte in text {
            payloads.extend(decoder.push(std::slice::from_ref(byte)));
        }
        assert_eq!(payloads, vec![r#"{"content":"héllo ✓"}"#]);
    }
}
