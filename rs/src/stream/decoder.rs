//! Incremental decoder for the text event-stream protocol
//!
//! Bytes arrive in chunks that need not line up with frame boundaries. The
//! decoder buffers raw bytes, splits complete lines on `\n` and holds back the
//! trailing partial line for the next chunk. Buffering bytes rather than text
//! keeps a multi-byte character that straddles two chunks intact.
//!
//! A line longer than the decoder's limit is dropped like any malformed
//! line: buffered bytes are released and everything up to the next `\n` is
//! skipped, so a peer that never terminates a line cannot grow the buffer
//! without bound.
//!
//! ```text
//! event: status\n          -> current type = "status"
//! data: {"phase":"start"}\n -> emit ("status", {"phase":"start"}), type resets
//! \n                       -> frame boundary, type resets
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace};

use crate::events::{DEFAULT_EVENT_TYPE, EventId, StreamEvent};

const EVENT_PREFIX: &str = "event:";
const DATA_PREFIX: &str = "data:";

/// Default limit on the length of one line, in bytes
pub const DEFAULT_MAX_LINE_LEN: usize = 1024 * 1024;

/// Stateful line decoder for one connection
pub struct FrameDecoder {
    pending: Vec<u8>,
    /// Prefix of `pending` already known to hold no `\n`
    scanned: usize,
    /// Skipping the rest of an overlong line
    discarding: bool,
    max_line_len: usize,
    current_type: Option<String>,
    sequence: Arc<AtomicU64>,
}

impl FrameDecoder {
    /// Create a decoder with its own id sequence
    pub fn new() -> Self {
        Self::with_sequence(Arc::new(AtomicU64::new(0)))
    }

    /// Create a decoder that draws event ids from a shared sequence
    ///
    /// Sharing the sequence across connections keeps ids unique for the whole
    /// client session.
    pub fn with_sequence(sequence: Arc<AtomicU64>) -> Self {
        Self {
            pending: Vec::new(),
            scanned: 0,
            discarding: false,
            max_line_len: DEFAULT_MAX_LINE_LEN,
            current_type: None,
            sequence,
        }
    }

    /// Set the longest line, in bytes, that is decoded rather than dropped
    pub fn with_max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len.max(1);
        self
    }

    /// Feed one chunk, returning every event completed by it
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        trace!(len = chunk.len(), pending = self.pending.len(), "FrameDecoder::push");
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut start = 0;
        let mut search_from = self.scanned;
        while let Some(offset) = self.pending[search_from..].iter().position(|b| *b == b'\n') {
            let end = search_from + offset;
            if self.discarding {
                self.discarding = false;
                debug!("FrameDecoder: end of overlong line");
            } else if end - start > self.max_line_len {
                self.drop_overlong_line(end - start);
            } else {
                let line = String::from_utf8_lossy(&self.pending[start..end]).into_owned();
                if let Some(event) = self.decode_line(&line) {
                    events.push(event);
                }
            }
            start = end + 1;
            search_from = start;
        }
        self.pending.drain(..start);
        self.scanned = self.pending.len();

        if self.discarding {
            self.pending.clear();
            self.scanned = 0;
        } else if self.pending.len() > self.max_line_len {
            self.drop_overlong_line(self.pending.len());
            self.pending.clear();
            self.scanned = 0;
            self.discarding = true;
        }

        events
    }

    /// Bytes held back waiting for a line terminator
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drop buffered bytes and the current event type
    pub fn reset(&mut self) {
        if !self.pending.is_empty() {
            debug!(pending = self.pending.len(), "FrameDecoder::reset: discarding partial line");
        }
        self.pending.clear();
        self.scanned = 0;
        self.discarding = false;
        self.current_type = None;
    }

    fn drop_overlong_line(&mut self, len: usize) {
        debug!(len, max = self.max_line_len, "FrameDecoder: dropping overlong line");
        self.current_type = None;
    }

    fn decode_line(&mut self, raw: &str) -> Option<StreamEvent> {
        let line = raw.trim();

        if line.is_empty() {
            // Frame boundary
            self.current_type = None;
            return None;
        }

        if let Some(value) = line.strip_prefix(EVENT_PREFIX) {
            let value = value.trim();
            trace!(event_type = %value, "FrameDecoder: event line");
            self.current_type = if value.is_empty() { None } else { Some(value.to_string()) };
            return None;
        }

        if let Some(value) = line.strip_prefix(DATA_PREFIX) {
            let event_type = self
                .current_type
                .take()
                .unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_string());

            return match serde_json::from_str::<serde_json::Value>(value.trim()) {
                Ok(payload) => {
                    let id = EventId(self.sequence.fetch_add(1, Ordering::Relaxed) + 1);
                    trace!(%id, %event_type, "FrameDecoder: frame complete");
                    Some(StreamEvent::new(id, event_type, payload))
                }
                Err(e) => {
                    debug!(%event_type, error = %e, "FrameDecoder: dropping malformed payload");
                    None
                }
            };
        }

        trace!(line = %line, "FrameDecoder: ignoring unrecognized line");
        None
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pairs(events: &[StreamEvent]) -> Vec<(String, serde_json::Value)> {
        events.iter().map(|e| (e.event_type.clone(), e.payload.clone())).collect()
    }

    #[test]
    fn test_single_frame() {
        let mut decoder = FrameDecoder::new();
        let events = decoder.push(b"event: status\ndata: {\"phase\":\"start\"}\n\n");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "status");
        assert_eq!(events[0].payload, serde_json::json!({"phase": "start"}));
        assert_eq!(events[0].id, EventId(1));
    }

    #[test]
    fn test_default_type_without_event_line() {
        let mut decoder = FrameDecoder::new();
        let events = decoder.push(b"data: {\"n\":1}\n");
        assert_eq!(events[0].event_type, DEFAULT_EVENT_TYPE);
    }

    #[test]
    fn test_type_resets_after_data() {
        let mut decoder = FrameDecoder::new();
        let events = decoder.push(b"event: step\ndata: 1\ndata: 2\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "step");
        assert_eq!(events[1].event_type, DEFAULT_EVENT_TYPE);
    }

    #[test]
    fn test_blank_line_resets_type() {
        let mut decoder = FrameDecoder::new();
        let events = decoder.push(b"event: step\n\ndata: {}\n");
        assert_eq!(events[0].event_type, DEFAULT_EVENT_TYPE);
    }

    #[test]
    fn test_tolerates_missing_blank_line() {
        let mut decoder = FrameDecoder::new();
        let events = decoder.push(b"event: a\ndata: 1\nevent: b\ndata: 2\n");
        assert_eq!(pairs(&events), vec![
            ("a".to_string(), serde_json::json!(1)),
            ("b".to_string(), serde_json::json!(2)),
        ]);
    }

    #[test]
    fn test_malformed_payload_dropped() {
        let mut decoder = FrameDecoder::new();
        let events = decoder.push(b"event: step\ndata: not json\n\nevent: step\ndata: {\"id\":\"s2\"}\n\n");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload["id"], "s2");
    }

    #[test]
    fn test_malformed_payload_resets_type() {
        let mut decoder = FrameDecoder::new();
        let events = decoder.push(b"event: error\ndata: {oops\ndata: {}\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, DEFAULT_EVENT_TYPE);
    }

    #[test]
    fn test_unrecognized_lines_ignored() {
        let mut decoder = FrameDecoder::new();
        let events = decoder.push(b": keepalive\nid: 42\nretry: 1000\ngarbage\nevent: ok\ndata: true\n");
        assert_eq!(pairs(&events), vec![("ok".to_string(), serde_json::json!(true))]);
    }

    #[test]
    fn test_crlf_lines() {
        let mut decoder = FrameDecoder::new();
        let events = decoder.push(b"event: status\r\ndata: {\"a\":1}\r\n\r\n");
        assert_eq!(events[0].event_type, "status");
        assert_eq!(events[0].payload["a"], 1);
    }

    #[test]
    fn test_partial_line_held_back() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"event: step\ndata: {\"id\":").is_empty());
        assert_eq!(decoder.pending_len(), "data: {\"id\":".len());

        let events = decoder.push(b"\"s1\"}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "step");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_split_multibyte_character() {
        let bytes = "data: {\"msg\":\"héllo\"}\n".as_bytes();
        let split = bytes.iter().position(|b| *b == 0xC3).unwrap() + 1;

        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(&bytes[..split]).is_empty());
        let events = decoder.push(&bytes[split..]);
        assert_eq!(events[0].payload["msg"], "héllo");
    }

    #[test]
    fn test_ids_monotonic_across_shared_sequence() {
        let sequence = Arc::new(AtomicU64::new(0));
        let mut first = FrameDecoder::with_sequence(Arc::clone(&sequence));
        let mut second = FrameDecoder::with_sequence(Arc::clone(&sequence));

        let a = first.push(b"data: 1\n");
        let b = second.push(b"data: 2\n");
        assert_eq!(a[0].id, EventId(1));
        assert_eq!(b[0].id, EventId(2));
    }

    #[test]
    fn test_reset_discards_partial() {
        let mut decoder = FrameDecoder::new();
        decoder.push(b"event: step\ndata: {\"x\"");
        decoder.reset();
        assert_eq!(decoder.pending_len(), 0);

        let events = decoder.push(b"data: 1\n");
        assert_eq!(events[0].event_type, DEFAULT_EVENT_TYPE);
    }

    #[test]
    fn test_overlong_partial_line_is_bounded() {
        let mut decoder = FrameDecoder::new().with_max_line_len(64);
        let filler = [b'x'; 50];
        for _ in 0..100 {
            assert!(decoder.push(&filler).is_empty());
            assert!(decoder.pending_len() <= 64);
        }

        let events = decoder.push(b"tail\nevent: step\ndata: {\"ok\":true}\n\n");
        assert_eq!(pairs(&events), vec![("step".to_string(), serde_json::json!({"ok": true}))]);
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_overlong_complete_line_dropped() {
        let mut decoder = FrameDecoder::new().with_max_line_len(32);
        let long = format!("event: step\ndata: \"{}\"\ndata: 1\n", "y".repeat(64));

        let events = decoder.push(long.as_bytes());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, DEFAULT_EVENT_TYPE);
        assert_eq!(events[0].payload, serde_json::json!(1));
        assert_eq!(events[0].id, EventId(1));
    }

    #[test]
    fn test_long_line_split_across_many_chunks() {
        let payload = "z".repeat(4096);
        let line = format!("event: blob\ndata: \"{}\"\n", payload);

        let mut decoder = FrameDecoder::new();
        let mut events = Vec::new();
        for chunk in line.as_bytes().chunks(7) {
            events.extend(decoder.push(chunk));
        }
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "blob");
        assert_eq!(events[0].payload, serde_json::json!(payload));
    }

    const STREAM: &str = concat!(
        "event: status\ndata: {\"phase\":\"start\"}\n\n",
        ": comment\n",
        "event: step\ndata: {\"id\":\"s1\",\"name\":\"naïve ✓\"}\n\n",
        "data: not json\n\n",
        "event: result\r\ndata: [1,2,3]\r\n\r\n",
        "data: {\"plain\":true}\n",
        "event: error\ndata: {\"message\":\"日本語\"}\n\n",
    );

    proptest! {
        #[test]
        fn prop_chunk_boundary_independence(mut cuts in proptest::collection::vec(0..STREAM.len(), 0..12)) {
            let bytes = STREAM.as_bytes();
            let whole = FrameDecoder::new().push(bytes);

            cuts.sort_unstable();
            cuts.dedup();
            let mut decoder = FrameDecoder::new();
            let mut chunked = Vec::new();
            let mut prev = 0;
            for cut in cuts.into_iter().chain(std::iter::once(bytes.len())) {
                chunked.extend(decoder.push(&bytes[prev..cut]));
                prev = cut;
            }

            prop_assert_eq!(pairs(&whole), pairs(&chunked));
            prop_assert_eq!(
                whole.iter().map(|e| e.id).collect::<Vec<_>>(),
                chunked.iter().map(|e| e.id).collect::<Vec<_>>()
            );
            prop_assert_eq!(whole.len(), 5);
        }
    }
}
