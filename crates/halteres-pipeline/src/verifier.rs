//! Structural completeness check for one week's generated content.
//!
//! Each workout is required (by the prompt) to open with a
//! `[DATE: MM-DD-YYYY]` header, so a week is judged complete when the
//! header count reaches the schedule's active-weekday count. The check is
//! purely structural; it never inspects workout semantics. The marker
//! heuristic can in principle under- or over-count if the marker text
//! appears inside generated prose; the contract here is deliberately kept
//! black-box so a stronger structural check can replace the heuristic
//! without touching the retry or orchestrator layers.

/// The per-workout header marker the prompt mandates.
pub const WORKOUT_MARKER: &str = "[DATE:";

/// The verifier's verdict on one attempt's accumulated content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// Whether the expected workout count was reached.
    pub complete: bool,
    /// Workout markers observed.
    pub seen: usize,
}

/// Counts workout markers in `content`.
pub fn count_workouts(content: &str) -> usize {
    content.matches(WORKOUT_MARKER).count()
}

/// Judges one week's content against the expected workout count.
pub fn verify_week(content: &str, expected: usize) -> Verdict {
    let seen = count_workouts(content);
    Verdict { complete: seen >= expected, seen }
}
