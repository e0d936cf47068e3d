//! The running context: accumulated prior-week content that biases every
//! subsequent week's generation.
//!
//! The buffer is owned exclusively by the orchestrator and only ever grows.
//! Continuity requires replaying the full history into each prompt, at the
//! cost of prompt size growing linearly with completed weeks.

/// Append-only accumulator of verified week content.
#[derive(Debug, Default)]
pub struct ContextAccumulator {
    buffer: String,
}

impl ContextAccumulator {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one verified week's full content, tagged with its ordinal.
    /// There is no removal operation; context only grows for the lifetime
    /// of a run.
    pub fn append(&mut self, week: u32, content: &str) {
        if !self.buffer.is_empty() {
            self.buffer.push_str("\n\n");
        }
        self.buffer.push_str(&format!("### Week {week}\n\n"));
        self.buffer.push_str(content.trim());
    }

    /// Returns a detached copy of the current context for the next week's
    /// prompt. Later appends do not affect copies already taken.
    pub fn snapshot(&self) -> String {
        self.buffer.clone()
    }

    /// Whether anything has been committed yet.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
