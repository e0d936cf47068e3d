//! Consumer-facing event protocol for a generation run.
//!
//! This is the canonical event stream contract for the pipeline. Clients
//! consume these for progress display and for assembling the final program
//! text. For a given run, events are emitted in strict production order:
//! `Content` for week N always precedes `WeekComplete(N)`, which always
//! precedes `Progress` for week N+1.

use serde::{Deserialize, Serialize};

/// The fixed end-marker line the transport writes after the last event,
/// on both the success and the abort path.
pub const STREAM_TERMINATOR: &str = "[DONE]";

/// Events emitted during a generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// The run has started; retrieval and generation follow.
    Start,

    /// Generation of a week is beginning.
    Progress {
        /// One-based week ordinal.
        week: u32,
        /// Total weeks in the run.
        total_weeks: u32,
    },

    /// The in-flight week reached another workout.
    WorkoutProgress {
        /// One-based week ordinal.
        week: u32,
        /// Workouts observed so far this week.
        workout: u32,
        /// Workouts the schedule requires per week.
        total_workouts: u32,
    },

    /// A text increment, forwarded as it arrives from the backend.
    Content {
        /// The increment text.
        text: String,
    },

    /// A week passed verification and was committed to the running context.
    WeekComplete {
        /// One-based week ordinal.
        week: u32,
    },

    /// The run failed. No further weeks are generated after this.
    Error {
        /// Week that failed, if the failure was week-scoped.
        week: Option<u32>,
        /// Human-readable failure description.
        message: String,
    },

    /// Every week completed; the run succeeded.
    Complete,
}
