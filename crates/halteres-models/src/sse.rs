//! Incremental decoder for the upstream's SSE line protocol.
//!
//! The generative backend streams its response as `data: `-prefixed lines.
//! Network reads do not respect line boundaries, so the decoder keeps the
//! trailing fragment of each read buffered until the rest of the line
//! arrives. Feeding the same bytes in any chunking yields the same frames.
//!
//! A payload that parses as a completion chunk becomes a structured frame; a
//! payload that does not is yielded verbatim as a raw-text frame rather than
//! dropped, so malformed lines never lose content. The `[DONE]` sentinel is
//! consumed and never surfaces as a frame.

use serde::Deserialize;
use tracing::debug;

/// The upstream's end-of-stream token.
pub const END_OF_STREAM: &str = "[DONE]";

/// The event prefix on upstream data lines.
const DATA_PREFIX: &str = "data:";

/// One decoded logical event from the upstream response.
#[derive(Debug, Clone, PartialEq)]
pub enum SseFrame {
    /// A payload that parsed as a structured completion chunk.
    Completion(CompletionChunk),
    /// A payload that did not parse; carried verbatim.
    Raw(String),
}

impl SseFrame {
    /// Returns the textual content carried by this frame, if any.
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Completion(chunk) => chunk.content(),
            Self::Raw(text) => Some(text.as_str()),
        }
    }
}

/// A structured streaming chunk in the OpenAI chat-completions format.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CompletionChunk {
    /// Completion choices; streaming responses carry at most one.
    pub choices: Vec<ChunkChoice>,
}

impl CompletionChunk {
    /// Returns the delta content of the first choice, if present.
    pub fn content(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.delta.content.as_deref())
    }
}

/// One choice within a streaming chunk.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChunkChoice {
    /// The incremental delta for this choice.
    pub delta: ChunkDelta,
}

/// The incremental payload of a streaming choice.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChunkDelta {
    /// New text produced since the previous chunk, if any.
    pub content: Option<String>,
}

/// Incremental line-buffer decoder for the upstream byte stream.
///
/// Feed raw chunks with [`push`](Self::push) in arrival order; call
/// [`finish`](Self::finish) once the stream is exhausted to flush any
/// buffered trailing fragment.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Creates an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one raw chunk and returns the frames completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            // Lines are split at the byte level so a multi-byte character can
            // never straddle the decode boundary.
            let line = String::from_utf8_lossy(&line[..line.len() - 1]);
            if let Some(frame) = Self::decode_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flushes the remaining buffer after input exhaustion.
    ///
    /// A buffered complete data line is decoded normally; any other
    /// non-empty remainder is yielded as a final raw-text frame.
    pub fn finish(&mut self) -> Option<SseFrame> {
        if self.buffer.is_empty() {
            return None;
        }
        let remainder = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();

        if remainder.trim_start().starts_with(DATA_PREFIX) {
            return Self::decode_line(&remainder);
        }
        let trimmed = remainder.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(SseFrame::Raw(trimmed.to_string()))
    }

    /// Decodes one complete line. Non-event lines and the end-of-stream
    /// sentinel produce no frame.
    fn decode_line(line: &str) -> Option<SseFrame> {
        let payload = line.trim_start().strip_prefix(DATA_PREFIX)?.trim();
        if payload.is_empty() || payload == END_OF_STREAM {
            return None;
        }

        match serde_json::from_str::<CompletionChunk>(payload) {
            Ok(chunk) => Some(SseFrame::Completion(chunk)),
            Err(e) => {
                debug!(error = %e, "Upstream line did not parse as a chunk, keeping as raw text");
                Some(SseFrame::Raw(payload.to_string()))
            }
        }
    }
}
