//! Minimal buffer-based SSE event splitter.
//!
//! Grounded on the teacher's `src/llm/sse.rs::SSEParser`: accumulate bytes,
//! split on the blank-line event boundary, and hand back whole `data: ` lines.
//! This implementation only needs the `data:` field — the gateway wire format
//! never emits named `event:`/`id:`/`retry:` fields.

pub struct SseLineParser {
    buffer: String,
}

impl SseLineParser {
    pub fn new() -> Self {
        Self { buffer: String::new() }
    }

    /// Feeds a raw chunk of upstream bytes, returning any complete `data: `
    /// payloads found so far (with the `data: ` prefix stripped).
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut out = Vec::new();
        while let Some(pos) = self.buffer.find("\n\n") {
            let block: String = self.buffer.drain(..pos + 2).collect();
            for line in block.lines() {
                if let Some(data) = line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")) {
                    out.push(data.trim().to_string());
                }
            }
        }
        out
    }
}

impl Default for SseLineParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_events_on_blank_line() {
        let mut parser = SseLineParser::new();
        let out = parser.push(b"data: {\"a\":1}\n\ndata: {\"b\":2}\n\n");
        assert_eq!(out, vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[test]
    fn buffers_partial_events_across_chunks() {
        let mut parser = SseLineParser::new();
        assert!(parser.push(b"data: {\"a\"").is_empty());
        let out = parser.push(b":1}\n\n");
        assert_eq!(out, vec!["{\"a\":1}"]);
    }
}
