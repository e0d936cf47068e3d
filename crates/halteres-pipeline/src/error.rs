// Error types for the generation pipeline

use halteres_abstraction::BackendError;
use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Pipeline errors
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// A required request field is missing or empty. Raised before any
    /// upstream call is made and never reaches the event stream.
    #[error("Invalid request: missing or empty field '{field}'")]
    InvalidRequest {
        /// Dotted path of the offending field
        field: String,
    },

    /// The generative backend failed. Retryable within a week's attempt
    /// ceiling; fatal once the ceiling is exhausted.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// A week never reached its expected workout count within the attempt
    /// ceiling. Fatal: partial weeks would corrupt continuity for every
    /// later week, so the run aborts rather than salvaging.
    #[error("Week {week} incomplete after retries: {seen} of {expected} workouts generated")]
    WeekIncomplete {
        /// The week that failed
        week: u32,
        /// Workout count observed in the best attempt
        seen: usize,
        /// Workout count the schedule requires
        expected: usize,
        /// Content of the best attempt, kept for diagnostics
        best_content: String,
    },

    /// The consumer disconnected mid-run. Triggers cancellation; not
    /// reported as an event since there is no longer anyone to report to.
    #[error("Consumer disconnected")]
    ConsumerGone,
}
