//! Program generation pipeline for Halteres.
//!
//! This crate turns a validated [`ProgramRequest`] into an ordered stream of
//! [`StreamEvent`]s: one retrieval pass up front, then each week generated
//! in turn with verification and bounded retries, with every verified week
//! feeding the next week's prompt.

pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod generator;
pub mod orchestrator;
pub mod prompt;
pub mod request;
pub mod retrieval;
pub mod retry;
pub mod state;
pub mod verifier;
pub mod week;

pub use config::PipelineConfig;
pub use context::ContextAccumulator;
pub use error::{PipelineError, Result};
pub use events::{StreamEvent, STREAM_TERMINATOR};
pub use generator::{BackendWeekGenerator, WeekGenerator};
pub use orchestrator::Orchestrator;
pub use request::{
    ClientMetrics, GymProfile, ProgramOverview, ProgramRequest, Schedule, WorkoutFormat,
};
pub use retrieval::{RetrievalAugmenter, RetrievalContext};
pub use retry::RetryController;
pub use verifier::{count_workouts, verify_week, Verdict, WORKOUT_MARKER};
pub use week::WeekDescriptor;
