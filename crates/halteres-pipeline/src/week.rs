//! Week descriptors: the fixed-size unit the pipeline generates and
//! verifies independently.

use chrono::{Days, NaiveDate};

/// Identifies one generation unit. Constructed immediately before dispatch
/// and discarded once the week completes or permanently fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekDescriptor {
    /// One-based ordinal of this week.
    pub week: u32,
    /// Total number of weeks in the run.
    pub total_weeks: u32,
    /// First day of this week.
    pub start: NaiveDate,
    /// Last day of this week.
    pub end: NaiveDate,
}

impl WeekDescriptor {
    /// Derives the descriptor for `week` of `total_weeks`, starting the
    /// program on `program_start`.
    pub fn for_week(program_start: NaiveDate, week: u32, total_weeks: u32) -> Self {
        let start = program_start + Days::new(u64::from(week - 1) * 7);
        let end = start + Days::new(6);
        Self { week, total_weeks, start, end }
    }
}
