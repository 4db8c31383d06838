//! Line framing for server-sent event bodies
//!
//! The transport splits the body at arbitrary byte offsets, so a chunk may
//! end in the middle of a line, a JSON document or a UTF-8 sequence. The
//! framer only ever evaluates bytes up to a newline, which makes its output
//! independent of where the chunks were cut.

use serde_json::Value;

/// Prefix of SSE data lines
pub const DATA_PREFIX: &str = "data:";

/// Payload of the terminating data line
pub const DONE_MARKER: &str = "[DONE]";

/// SSE field lines that carry nothing for the decoder
const IGNORED_FIELDS: [&str; 3] = ["event:", "id:", "retry:"];

/// One logical protocol unit
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// A `data:` line (or bare JSON line) holding a JSON document
    Event(Value),
    /// The `data: [DONE]` end marker
    Done,
    /// Blank lines, comments and non-data SSE fields
    Ignored,
}

/// A line as produced by [`ChunkFramer`]
#[derive(Debug, Clone, PartialEq)]
pub enum FramedLine {
    /// The line parsed into a frame
    Complete { text: String, frame: Frame },
    /// Bytes left over at stream end that never formed a frame
    Incomplete { text: String },
}

impl FramedLine {
    pub fn is_complete(&self) -> bool {
        matches!(self, FramedLine::Complete { .. })
    }
}

/// Incremental framer over a chunked byte stream.
///
/// Feed chunks with [`push`](Self::push) and call [`finish`](Self::finish)
/// exactly once when the transport is exhausted.
#[derive(Debug, Default)]
pub struct ChunkFramer {
    buffer: Vec<u8>,
    /// Offset of the first byte not yet looked at for a newline
    scan_from: usize,
}

impl ChunkFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buffered, not yet framed bytes
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Append a chunk and return every frame it completed.
    ///
    /// At each newline the candidate is everything unconsumed up to that
    /// newline. A candidate that does not parse stays buffered and is retried,
    /// extended, at the next newline. When the newest physical line is a
    /// complete frame by itself, the stale prefix before it can no longer be
    /// a continuation: it comes back as `Incomplete` and framing resumes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<FramedLine> {
        self.buffer.extend_from_slice(chunk);
        let mut lines = Vec::new();

        while let Some(offset) = self.buffer[self.scan_from..].iter().position(|&b| b == b'\n') {
            let newline = self.scan_from + offset;
            let candidate = join_lines(&self.buffer[..newline]);

            if let Some(frame) = classify(&candidate) {
                self.buffer.drain(..=newline);
                self.scan_from = 0;
                lines.push(FramedLine::Complete {
                    text: candidate,
                    frame,
                });
                continue;
            }

            // scan_from marks where the newest physical line begins
            if self.scan_from > 0 {
                let line = join_lines(&self.buffer[self.scan_from..newline]);
                if let Some(frame) = classify(&line) {
                    let stale = join_lines(&self.buffer[..self.scan_from]);
                    self.buffer.drain(..=newline);
                    self.scan_from = 0;
                    lines.push(FramedLine::Incomplete { text: stale });
                    lines.push(FramedLine::Complete { text: line, frame });
                    continue;
                }
            }

            self.scan_from = newline + 1;
        }

        lines
    }

    /// Final parse attempt over the remaining buffer, line by line.
    ///
    /// Lines that still fail to parse come back as `Incomplete`. The framer
    /// is empty afterwards.
    pub fn finish(&mut self) -> Vec<FramedLine> {
        let remainder = std::mem::take(&mut self.buffer);
        self.scan_from = 0;

        remainder
            .split(|&b| b == b'\n')
            .map(|line| String::from_utf8_lossy(line).trim().to_string())
            .filter(|text| !text.is_empty())
            .map(|text| match classify(&text) {
                Some(frame) => FramedLine::Complete { text, frame },
                None => FramedLine::Incomplete { text },
            })
            .collect()
    }
}

/// Join the physical lines of `bytes` into one trimmed candidate
fn join_lines(bytes: &[u8]) -> String {
    let joined: String = bytes
        .split(|&b| b == b'\n')
        .map(|line| String::from_utf8_lossy(line.strip_suffix(b"\r").unwrap_or(line)))
        .collect();
    joined.trim().to_string()
}

/// Decide whether a trimmed candidate is a complete frame
fn classify(text: &str) -> Option<Frame> {
    if text.is_empty() || text.starts_with(':') {
        return Some(Frame::Ignored);
    }

    if let Some(payload) = text.strip_prefix(DATA_PREFIX) {
        let payload = payload.trim();
        if payload == DONE_MARKER {
            return Some(Frame::Done);
        }
        if payload.is_empty() {
            return Some(Frame::Ignored);
        }
        return serde_json::from_str::<Value>(payload).ok().map(Frame::Event);
    }

    if IGNORED_FIELDS.iter().any(|field| text.starts_with(field)) {
        return Some(Frame::Ignored);
    }

    // Newline-delimited JSON bodies carry no prefix at all
    if text.starts_with('{') {
        return serde_json::from_str::<Value>(text).ok().map(Frame::Event);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn events(lines: &[FramedLine]) -> Vec<Value> {
        lines
            .iter()
            .filter_map(|line| match line {
                FramedLine::Complete {
                    frame: Frame::Event(v),
                    ..
                } => Some(v.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_whole_lines_in_one_chunk() {
        let mut framer = ChunkFramer::new();
        let lines = framer.push(b"data: {\"a\":1}\n\ndata: {\"a\":2}\n\ndata: [DONE]\n");

        assert_eq!(events(&lines), vec![json!({"a": 1}), json!({"a": 2})]);
        assert!(lines.iter().any(|l| matches!(
            l,
            FramedLine::Complete { frame: Frame::Done, .. }
        )));
        assert_eq!(framer.pending_len(), 0);
    }

    #[test]
    fn test_line_split_across_chunks() {
        let mut framer = ChunkFramer::new();
        assert!(framer.push(b"data: {\"choices\":[{\"del").is_empty());
        assert!(framer.push(b"ta\":{\"content\":\"Hi\"}}]").is_empty());

        let lines = framer.push(b"}\n");
        assert_eq!(
            events(&lines),
            vec![json!({"choices": [{"delta": {"content": "Hi"}}]})]
        );
    }

    #[test]
    fn test_unparsable_line_is_retried_with_later_bytes() {
        let mut framer = ChunkFramer::new();
        // A stray newline inside the JSON document
        let lines = framer.push(b"data: {\"text\":\n\"joined\"}\n");
        assert_eq!(events(&lines), vec![json!({"text": "joined"})]);
    }

    #[test]
    fn test_comments_and_fields_are_ignored() {
        let mut framer = ChunkFramer::new();
        let lines = framer.push(b": keep-alive\nevent: message\nid: 7\ndata: {\"x\":true}\n");
        assert_eq!(lines.len(), 4);
        assert_eq!(events(&lines), vec![json!({"x": true})]);
    }

    #[test]
    fn test_finish_parses_unterminated_line() {
        let mut framer = ChunkFramer::new();
        assert!(framer.push(b"data: {\"done\":1}").is_empty());

        let lines = framer.finish();
        assert_eq!(events(&lines), vec![json!({"done": 1})]);
        assert_eq!(framer.pending_len(), 0);
    }

    #[test]
    fn test_finish_reports_truncated_remnant() {
        let mut framer = ChunkFramer::new();
        framer.push(b"data: {\"choices\":[{\"delta\":{\"conte");

        let lines = framer.finish();
        assert_eq!(lines.len(), 1);
        assert!(!lines[0].is_complete());
    }

    #[test]
    fn test_malformed_line_dropped_when_next_line_frames() {
        let mut framer = ChunkFramer::new();
        let pushed = framer.push(b"data: {broken\ndata: {\"ok\":1}\n");

        assert_eq!(
            pushed[0],
            FramedLine::Incomplete {
                text: "data: {broken".to_string()
            }
        );
        assert_eq!(events(&pushed), vec![json!({"ok": 1})]);
        assert_eq!(framer.pending_len(), 0);
        assert!(framer.finish().is_empty());
    }

    #[test]
    fn test_blank_line_ends_malformed_event() {
        let mut framer = ChunkFramer::new();
        let lines = framer.push(b"data: {oops not json}\n\ndata: [DONE]\n");

        assert_eq!(lines.iter().filter(|l| !l.is_complete()).count(), 1);
        assert!(lines.iter().any(|l| matches!(
            l,
            FramedLine::Complete { frame: Frame::Done, .. }
        )));
        assert_eq!(framer.pending_len(), 0);
    }

    #[test]
    fn test_multibyte_character_split() {
        let body = "data: {\"content\":\"привет\"}\n".as_bytes();
        let mut framer = ChunkFramer::new();
        let mut lines = Vec::new();
        for byte in body {
            lines.extend(framer.push(std::slice::from_ref(byte)));
        }
        assert_eq!(events(&lines), vec![json!({"content": "привет"})]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut framer = ChunkFramer::new();
        let lines = framer.push(b"data: {\"a\":1}\r\n\r\n");
        assert_eq!(events(&lines), vec![json!({"a": 1})]);
    }

    #[test]
    fn test_ndjson_lines() {
        let mut framer = ChunkFramer::new();
        let lines = framer.push(b"{\"response\":\"x\"}\n");
        assert_eq!(events(&lines), vec![json!({"response": "x"})]);
    }
}
