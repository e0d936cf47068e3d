//! Week generation: one upstream request per attempt, yielded as a lazy
//! stream of text increments.
//!
//! `WeekGenerator` is the seam between the pipeline and the generative
//! backend. The retry controller and orchestrator only ever see this trait,
//! so tests drive them with scripted generators instead of a live backend.

use async_trait::async_trait;
use halteres_abstraction::{ChatMessage, GenerationBackend, GenerationParameters, TextStream};
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::prompt::week_prompt;
use crate::request::ProgramRequest;
use crate::retrieval::RetrievalContext;
use crate::week::WeekDescriptor;

/// Produces one week's content as a stream of text increments.
#[async_trait]
pub trait WeekGenerator: Send + Sync {
    /// Issues one generation attempt for the given week.
    ///
    /// `history` is a snapshot of the running context at dispatch time; the
    /// generator reads it and never writes it.
    ///
    /// # Errors
    /// Fails with `PipelineError::Backend` if the upstream request cannot
    /// be established or is rejected.
    async fn generate_week(
        &self,
        request: &ProgramRequest,
        week: &WeekDescriptor,
        history: &str,
        retrieval: &RetrievalContext,
    ) -> Result<TextStream>;
}

/// Production generator over a streaming backend.
pub struct BackendWeekGenerator {
    backend: Arc<dyn GenerationBackend>,
    parameters: GenerationParameters,
}

impl BackendWeekGenerator {
    /// Creates a generator over the given backend with default sampling
    /// parameters.
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend, parameters: GenerationParameters::default() }
    }

    /// Overrides the sampling parameters used for every attempt.
    #[must_use]
    pub fn with_parameters(mut self, parameters: GenerationParameters) -> Self {
        self.parameters = parameters;
        self
    }
}

#[async_trait]
impl WeekGenerator for BackendWeekGenerator {
    async fn generate_week(
        &self,
        request: &ProgramRequest,
        week: &WeekDescriptor,
        history: &str,
        retrieval: &RetrievalContext,
    ) -> Result<TextStream> {
        debug!(
            week = week.week,
            total_weeks = week.total_weeks,
            history_len = history.len(),
            model_id = %self.backend.model_id(),
            "Dispatching week generation"
        );

        let prompt = week_prompt(request, week, history, retrieval);
        let messages = vec![ChatMessage::developer(prompt)];
        let stream = self
            .backend
            .stream_completion(&messages, Some(self.parameters.clone()))
            .await?;
        Ok(stream)
    }
}
