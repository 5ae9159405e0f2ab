//! Incremental server-sent-events decoder.
//!
//! Network chunks can end anywhere, including mid-line, so bytes are
//! buffered until a full line is available. `data:` lines accumulate until a
//! blank line dispatches the event; comments and other fields are ignored.

#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buf: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes; returns the data payload of every event completed by
    /// them, in order.
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(event) = self.line(line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush whatever is left once the body has ended.
    pub(crate) fn finish(&mut self) -> Option<String> {
        if !self.buf.is_empty() {
            let raw = std::mem::take(&mut self.buf);
            let line = String::from_utf8_lossy(&raw).trim_end_matches('\r').to_string();
            if let Some(event) = self.line(&line) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        if let Some(value) = line.strip_prefix("data:") {
            self.data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
        }
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let event = self.data.join("\n");
        self.data.clear();
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_event() {
        let mut d = SseDecoder::new();
        assert_eq!(d.push(b"data: {\"a\":1}\n\n"), vec!["{\"a\":1}".to_string()]);
    }

    #[test]
    fn event_split_across_pushes() {
        let mut d = SseDecoder::new();
        assert!(d.push(b"data: hel").is_empty());
        assert!(d.push(b"lo\r\n").is_empty());
        assert_eq!(d.push(b"\r\n"), vec!["hello".to_string()]);
    }

    #[test]
    fn multiple_events_in_one_push() {
        let mut d = SseDecoder::new();
        let events = d.push(b"data: one\n\ndata: two\n\ndata: [DONE]\n\n");
        assert_eq!(events, ["one", "two", "[DONE]"]);
    }

    #[test]
    fn comments_and_other_fields_ignored() {
        let mut d = SseDecoder::new();
        let events = d.push(b": keep-alive\nevent: message\nid: 7\ndata: x\n\n");
        assert_eq!(events, ["x"]);
    }

    #[test]
    fn multi_line_data_joined() {
        let mut d = SseDecoder::new();
        assert_eq!(d.push(b"data: a\ndata: b\n\n"), ["a\nb"]);
    }

    #[test]
    fn finish_flushes_unterminated_event() {
        let mut d = SseDecoder::new();
        assert!(d.push(b"data: tail").is_empty());
        assert_eq!(d.finish(), Some("tail".to_string()));
        assert_eq!(d.finish(), None);
    }

    #[test]
    fn multibyte_split_is_preserved() {
        let text = "data: héllo\n\n".as_bytes();
        // Split inside the two-byte 'é'.
        let split = text.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let mut d = SseDecoder::new();
        assert!(d.push(&text[..split]).is_empty());
        assert_eq!(d.push(&text[split..]), ["héllo"]);
    }
}
