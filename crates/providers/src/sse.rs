//! Incremental parser for the textual event streams chat engines answer with.
//!
//! Records are newline-delimited. `data:` lines carry the payload; `event:`,
//! `id:`/`retry:` and `:` comment lines are ignored. A bare
//! non-empty line is taken as a payload too, so newline-delimited JSON bodies parse
//! the same way. `\r\n` line endings are accepted.

/// A single parsed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub data: String,
}

impl SseEvent {
    /// The `[DONE]` sentinel closing OpenAI-style streams.
    pub fn is_done(&self) -> bool {
        self.data.trim() == "[DONE]"
    }
}

/// Buffers partial lines across chunk boundaries.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes from the HTTP response. Returns every record completed by them.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        // Bytes are buffered until a full line is present so multi-byte characters
        // split across chunks decode intact.
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = self.parse_line(line.trim_end_matches(['\n', '\r'])) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing record that was not newline-terminated.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&rest).into_owned();
        self.parse_line(line.trim_end_matches('\r'))
    }

    fn parse_line(&self, line: &str) -> Option<SseEvent> {
        if line.trim().is_empty() {
            return None;
        }
        if ["event:", "id:", "retry:", ":"].iter().any(|p| line.starts_with(p)) {
            return None;
        }
        let data = match line.strip_prefix("data:") {
            Some(val) => val.strip_prefix(' ').unwrap_or(val),
            None => line,
        };
        Some(SseEvent {
            data: data.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_sse() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: hello\n\ndata: world\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "hello");
        assert_eq!(events[1].data, "world");
    }

    #[test]
    fn test_event_lines_are_skipped() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"event: message_start\ndata: {\"type\":\"message\"}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "{\"type\":\"message\"}");
    }

    #[test]
    fn test_split_across_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"data: hel").is_empty());
        let events = parser.feed(b"lo\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "hello");
    }

    #[test]
    fn test_multibyte_split_across_chunks() {
        let mut parser = SseParser::new();
        let bytes = "data: 你好\n".as_bytes();
        assert!(parser.feed(&bytes[..8]).is_empty());
        let events = parser.feed(&bytes[8..]);
        assert_eq!(events[0].data, "你好");
    }

    #[test]
    fn test_crlf_comments_and_done() {
        let mut parser = SseParser::new();
        let events = parser.feed(b": keep-alive\r\nid: 7\r\ndata: {}\r\n\r\ndata: [DONE]\r\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "{}");
        assert!(events[1].is_done());
    }

    #[test]
    fn test_bare_json_lines_and_trailing_record() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"{\"a\":1}\n{\"b\":");
        assert_eq!(events.len(), 1);
        assert!(parser.feed(b"2}").is_empty());
        assert_eq!(parser.finish().map(|e| e.data), Some("{\"b\":2}".to_string()));
        assert!(parser.finish().is_none());
    }
}
