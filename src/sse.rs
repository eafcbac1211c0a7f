// Incremental parser for the `data:`-only SSE dialect used by
// chat-completion endpoints.

/// Collects `data:` payloads from a server-sent-event byte stream fed in
/// arbitrary chunks. Chat-completion streams carry no named event types;
/// every payload arrives on a `data:` line, with `data: [DONE]` as the
/// end-of-stream sentinel (left to the caller to recognize).
#[derive(Debug, Default)]
pub struct DataLineParser {
    /// Holds an incomplete line spanning chunk boundaries.
    buffer: String,
}

impl DataLineParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of text; returns the payloads of any complete `data:`
    /// lines. Comment lines (`:` prefix) and blank event-boundary lines are
    /// skipped; `\r\n` endings are handled.
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);
        let mut payloads = Vec::new();

        while let Some(pos) = self.buffer.find('\n') {
            let mut line: String = self.buffer.drain(..=pos).collect();
            if line.ends_with('\n') {
                line.pop();
            }
            if line.ends_with('\r') {
                line.pop();
            }

            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            if let Some(value) = line.strip_prefix("data:") {
                payloads.push(value.strip_prefix(' ').unwrap_or(value).to_string());
            }
            // Other field names (event:, id:, retry:) are not used by this
            // dialect and are ignored.
        }

        payloads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_data_line() {
        let mut parser = DataLineParser::new();
        let payloads = parser.feed("data: {\"x\":1}\n\n");
        assert_eq!(payloads, vec!["{\"x\":1}"]);
    }

    #[test]
    fn test_multiple_data_lines() {
        let mut parser = DataLineParser::new();
        let payloads = parser.feed("data: first\n\ndata: second\n\n");
        assert_eq!(payloads, vec!["first", "second"]);
    }

    #[test]
    fn test_partial_chunks_buffered() {
        let mut parser = DataLineParser::new();
        assert!(parser.feed("data: hel").is_empty());
        let payloads = parser.feed("lo\n");
        assert_eq!(payloads, vec!["hello"]);
    }

    #[test]
    fn test_chunk_split_inside_prefix() {
        let mut parser = DataLineParser::new();
        assert!(parser.feed("da").is_empty());
        let payloads = parser.feed("ta: hi\n");
        assert_eq!(payloads, vec!["hi"]);
    }

    #[test]
    fn test_comment_lines_skipped() {
        let mut parser = DataLineParser::new();
        let payloads = parser.feed(": keep-alive\ndata: real\n");
        assert_eq!(payloads, vec!["real"]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut parser = DataLineParser::new();
        let payloads = parser.feed("data: hi\r\n\r\n");
        assert_eq!(payloads, vec!["hi"]);
    }

    #[test]
    fn test_no_space_after_colon() {
        let mut parser = DataLineParser::new();
        let payloads = parser.feed("data:hi\n");
        assert_eq!(payloads, vec!["hi"]);
    }

    #[test]
    fn test_done_sentinel_passed_through() {
        let mut parser = DataLineParser::new();
        let payloads = parser.feed("data: [DONE]\n\n");
        assert_eq!(payloads, vec!["[DONE]"]);
    }

    #[test]
    fn test_unrelated_fields_ignored() {
        let mut parser = DataLineParser::new();
        let payloads = parser.feed("event: message\nid: 7\ndata: hi\n\n");
        assert_eq!(payloads, vec!["hi"]);
    }
}
