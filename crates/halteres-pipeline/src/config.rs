//! Pipeline tuning knobs.

use std::time::Duration;

/// Configuration for one pipeline instance.
///
/// Defaults match the behavior of the production deployment; tests shrink
/// the backoff to keep retry scenarios fast.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Attempt ceiling per week, counting both transport failures and
    /// incomplete verdicts.
    pub max_attempts: u32,

    /// Fixed wait between attempts of the same week.
    pub retry_backoff: Duration,

    /// Minimum similarity for retrieval matches.
    pub match_threshold: f32,

    /// Maximum number of retrieval matches injected into prompts.
    pub match_count: usize,

    /// Bound of the outbound event channel. Backpressure here throttles how
    /// fast the upstream response is consumed.
    pub channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_backoff: Duration::from_secs(2),
            match_threshold: 0.8,
            match_count: 3,
            channel_capacity: 32,
        }
    }
}
