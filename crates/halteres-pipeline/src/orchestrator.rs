//! Top-level run driver.
//!
//! One `Orchestrator::run` call produces one event stream. Validation is
//! synchronous and happens before anything else: an invalid request returns
//! an error directly and never spawns the pipeline task, emits an event, or
//! touches an upstream service. Everything after validation runs on a
//! spawned task and reports exclusively through the bounded event channel;
//! when the consumer drops the stream, channel sends start failing and the
//! task winds down on its own.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info};

use crate::config::PipelineConfig;
use crate::context::ContextAccumulator;
use crate::error::{PipelineError, Result};
use crate::events::StreamEvent;
use crate::generator::WeekGenerator;
use crate::request::ProgramRequest;
use crate::retrieval::RetrievalAugmenter;
use crate::retry::RetryController;
use crate::week::WeekDescriptor;

/// Drives full program generation runs.
pub struct Orchestrator {
    generator: Arc<dyn WeekGenerator>,
    augmenter: Arc<RetrievalAugmenter>,
    config: PipelineConfig,
}

impl Orchestrator {
    /// Creates an orchestrator over the given generator and augmenter.
    pub fn new(
        generator: Arc<dyn WeekGenerator>,
        augmenter: RetrievalAugmenter,
        config: PipelineConfig,
    ) -> Self {
        Self { generator, augmenter: Arc::new(augmenter), config }
    }

    /// Starts one generation run and returns its event stream.
    ///
    /// # Errors
    /// Returns `PipelineError::InvalidRequest` before any event is emitted
    /// or any upstream call is made.
    pub fn run(&self, request: ProgramRequest) -> Result<ReceiverStream<StreamEvent>> {
        request.validate()?;

        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let generator = Arc::clone(&self.generator);
        let augmenter = Arc::clone(&self.augmenter);
        let config = self.config.clone();

        tokio::spawn(async move {
            if let Err(PipelineError::ConsumerGone) =
                drive(generator, augmenter, config, request, tx).await
            {
                debug!("Consumer disconnected, run cancelled");
            }
        });

        Ok(ReceiverStream::new(rx))
    }
}

/// Runs the pipeline to completion, reporting through `events`.
///
/// Only `ConsumerGone` escapes as an error; every other failure is reported
/// as an `Error` event and ends the run.
async fn drive(
    generator: Arc<dyn WeekGenerator>,
    augmenter: Arc<RetrievalAugmenter>,
    config: PipelineConfig,
    request: ProgramRequest,
    events: mpsc::Sender<StreamEvent>,
) -> Result<()> {
    let Some(start_date) = request.schedule.start_date else {
        // Unreachable after validation; bail rather than panic.
        return Ok(());
    };
    let total_weeks = request.schedule.duration_weeks;
    info!(total_weeks, workouts_per_week = request.workouts_per_week(), "Starting program run");

    send(&events, StreamEvent::Start).await?;

    let retrieval = augmenter.augment(&request).await;
    let controller = RetryController::new(&config);
    let mut accumulator = ContextAccumulator::new();

    for week in 1..=total_weeks {
        send(&events, StreamEvent::Progress { week, total_weeks }).await?;

        let descriptor = WeekDescriptor::for_week(start_date, week, total_weeks);
        let history = accumulator.snapshot();
        match controller
            .run_week(generator.as_ref(), &request, &descriptor, &history, &retrieval, &events)
            .await
        {
            Ok(content) => {
                accumulator.append(week, &content);
                send(&events, StreamEvent::WeekComplete { week }).await?;
            }
            Err(PipelineError::ConsumerGone) => return Err(PipelineError::ConsumerGone),
            Err(e) => {
                error!(week, error = %e, "Run aborted");
                send(&events, StreamEvent::Error { week: Some(week), message: e.to_string() })
                    .await?;
                return Ok(());
            }
        }
    }

    info!(total_weeks, "Program run complete");
    send(&events, StreamEvent::Complete).await
}

async fn send(events: &mpsc::Sender<StreamEvent>, event: StreamEvent) -> Result<()> {
    events.send(event).await.map_err(|_| PipelineError::ConsumerGone)
}
