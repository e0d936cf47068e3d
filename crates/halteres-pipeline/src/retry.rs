//! Bounded retry loop around week generation and verification.
//!
//! Drives the pure state machine in [`crate::state`] against real I/O: one
//! upstream attempt per `Generating` state, one verdict per `Verifying`
//! state, a fixed backoff between attempts. Content increments are
//! forwarded to the event channel as they arrive, so the first attempt's
//! first token reaches the consumer before the attempt is judged.

use futures::StreamExt;
use halteres_abstraction::BackendError;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::events::StreamEvent;
use crate::generator::WeekGenerator;
use crate::request::ProgramRequest;
use crate::retrieval::RetrievalContext;
use crate::state::{AttemptEvent, WeekState};
use crate::verifier::{count_workouts, verify_week};
use crate::week::WeekDescriptor;

/// Why the last attempt did not complete.
enum FailureCause {
    Transport(BackendError),
    Incomplete,
}

/// Runs week generation attempts up to a fixed ceiling.
pub struct RetryController {
    max_attempts: u32,
    backoff: std::time::Duration,
}

impl RetryController {
    /// Creates a controller from the pipeline configuration.
    pub fn new(config: &PipelineConfig) -> Self {
        Self { max_attempts: config.max_attempts, backoff: config.retry_backoff }
    }

    /// Generates one week, retrying until it verifies complete or the
    /// attempt ceiling is exhausted.
    ///
    /// Returns the verified attempt's full content. Increment and
    /// workout-progress events are sent on `events` as they happen.
    ///
    /// # Errors
    /// - `PipelineError::Backend` if the final attempt failed at the
    ///   transport layer.
    /// - `PipelineError::WeekIncomplete` if the ceiling was exhausted on
    ///   verification, carrying the best attempt's content.
    /// - `PipelineError::ConsumerGone` if the event channel closed.
    pub async fn run_week(
        &self,
        generator: &dyn WeekGenerator,
        request: &ProgramRequest,
        week: &WeekDescriptor,
        history: &str,
        retrieval: &RetrievalContext,
        events: &mpsc::Sender<StreamEvent>,
    ) -> Result<String> {
        let expected = request.workouts_per_week();
        let mut state = WeekState::Pending.advance(AttemptEvent::Dispatched, self.max_attempts);
        let mut attempt_content = String::new();
        let mut best: Option<(usize, String)> = None;
        let mut last_cause = FailureCause::Incomplete;

        loop {
            state = match state {
                WeekState::Generating { attempt } => {
                    if attempt > 1 {
                        debug!(week = week.week, attempt, "Retrying week after backoff");
                        sleep(self.backoff).await;
                    }
                    attempt_content.clear();

                    match generator.generate_week(request, week, history, retrieval).await {
                        Ok(stream) => {
                            match self
                                .consume_attempt(
                                    stream,
                                    week.week,
                                    expected,
                                    &mut attempt_content,
                                    events,
                                )
                                .await?
                            {
                                None => state.advance(AttemptEvent::StreamEnded, self.max_attempts),
                                Some(e) => {
                                    warn!(week = week.week, attempt, error = %e, "Attempt failed mid-stream");
                                    last_cause = FailureCause::Transport(e);
                                    state.advance(AttemptEvent::TransportFailed, self.max_attempts)
                                }
                            }
                        }
                        Err(PipelineError::Backend(e)) => {
                            warn!(week = week.week, attempt, error = %e, "Attempt failed to dispatch");
                            last_cause = FailureCause::Transport(e);
                            state.advance(AttemptEvent::TransportFailed, self.max_attempts)
                        }
                        Err(other) => return Err(other),
                    }
                }
                WeekState::Verifying { attempt } => {
                    let verdict = verify_week(&attempt_content, expected);
                    debug!(
                        week = week.week,
                        attempt,
                        seen = verdict.seen,
                        expected,
                        complete = verdict.complete,
                        "Attempt verified"
                    );
                    if !verdict.complete {
                        if best.as_ref().map_or(true, |(seen, _)| verdict.seen > *seen) {
                            best = Some((verdict.seen, attempt_content.clone()));
                        }
                        last_cause = FailureCause::Incomplete;
                    }
                    state.advance(
                        AttemptEvent::Verified { complete: verdict.complete },
                        self.max_attempts,
                    )
                }
                WeekState::Complete => return Ok(attempt_content),
                WeekState::Failed => {
                    return Err(match last_cause {
                        FailureCause::Transport(e) => PipelineError::Backend(e),
                        FailureCause::Incomplete => {
                            let (seen, best_content) = best.unwrap_or_default();
                            PipelineError::WeekIncomplete {
                                week: week.week,
                                seen,
                                expected,
                                best_content,
                            }
                        }
                    });
                }
                WeekState::Pending => unreachable!("week state returned to Pending"),
            };
        }
    }

    /// Drains one attempt's stream, forwarding increments and workout
    /// progress. Returns the transport error if the stream failed mid-way.
    async fn consume_attempt(
        &self,
        mut stream: halteres_abstraction::TextStream,
        week: u32,
        expected: usize,
        content: &mut String,
        events: &mpsc::Sender<StreamEvent>,
    ) -> Result<Option<BackendError>> {
        let mut reported = 0usize;
        while let Some(item) = stream.next().await {
            match item {
                Ok(text) => {
                    content.push_str(&text);
                    send(events, StreamEvent::Content { text }).await?;

                    let seen = count_workouts(content);
                    if seen > reported {
                        reported = seen;
                        send(
                            events,
                            StreamEvent::WorkoutProgress {
                                week,
                                workout: seen.min(expected) as u32,
                                total_workouts: expected as u32,
                            },
                        )
                        .await?;
                    }
                }
                Err(e) => return Ok(Some(e)),
            }
        }
        Ok(None)
    }
}

async fn send(events: &mpsc::Sender<StreamEvent>, event: StreamEvent) -> Result<()> {
    events.send(event).await.map_err(|_| PipelineError::ConsumerGone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use halteres_abstraction::TextStream;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Generator stub that plays back one scripted attempt per call.
    struct ScriptedGenerator {
        attempts: Vec<Vec<std::result::Result<String, BackendError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedGenerator {
        fn new(attempts: Vec<Vec<std::result::Result<String, BackendError>>>) -> Self {
            Self { attempts, calls: AtomicUsize::new(0) }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WeekGenerator for ScriptedGenerator {
        async fn generate_week(
            &self,
            _request: &ProgramRequest,
            _week: &WeekDescriptor,
            _history: &str,
            _retrieval: &RetrievalContext,
        ) -> Result<TextStream> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let attempt = self.attempts.get(call).cloned().unwrap_or_default();
            Ok(Box::pin(futures::stream::iter(attempt)))
        }
    }

    fn config() -> PipelineConfig {
        PipelineConfig { retry_backoff: Duration::from_millis(1), ..PipelineConfig::default() }
    }

    fn request() -> ProgramRequest {
        // Three training days, so a complete week needs three markers.
        crate::request::tests::valid_request()
    }

    fn week() -> WeekDescriptor {
        WeekDescriptor::for_week(NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(), 1, 4)
    }

    fn complete_attempt() -> Vec<std::result::Result<String, BackendError>> {
        vec![
            Ok("[DATE: 03-03-2025]\nday one\n".to_string()),
            Ok("[DATE: 03-05-2025]\nday two\n".to_string()),
            Ok("[DATE: 03-07-2025]\nday three\n".to_string()),
        ]
    }

    fn incomplete_attempt() -> Vec<std::result::Result<String, BackendError>> {
        vec![Ok("[DATE: 03-03-2025]\nonly day\n".to_string())]
    }

    async fn run(
        generator: &ScriptedGenerator,
    ) -> (Result<String>, Vec<StreamEvent>) {
        let (tx, mut rx) = mpsc::channel(256);
        let controller = RetryController::new(&config());
        let result = controller
            .run_week(generator, &request(), &week(), "", &RetrievalContext::empty(), &tx)
            .await;
        drop(tx);
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (result, events)
    }

    #[tokio::test]
    async fn test_first_attempt_complete() {
        let generator = ScriptedGenerator::new(vec![complete_attempt()]);
        let (result, events) = run(&generator).await;

        let content = result.unwrap();
        assert_eq!(count_workouts(&content), 3);
        assert_eq!(generator.calls(), 1);

        let progress: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::WorkoutProgress { workout, .. } => Some(*workout),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let generator = ScriptedGenerator::new(vec![
            incomplete_attempt(),
            incomplete_attempt(),
            complete_attempt(),
        ]);
        let (result, _) = run(&generator).await;

        let content = result.unwrap();
        assert!(content.contains("day three"));
        assert_eq!(generator.calls(), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_fails_with_best_attempt() {
        let generator = ScriptedGenerator::new(vec![
            incomplete_attempt(),
            // Second attempt gets further; it should be kept as "best".
            vec![
                Ok("[DATE: 03-03-2025]\na\n".to_string()),
                Ok("[DATE: 03-05-2025]\nb\n".to_string()),
            ],
            incomplete_attempt(),
        ]);
        let (result, _) = run(&generator).await;

        assert_eq!(generator.calls(), 3);
        match result.unwrap_err() {
            PipelineError::WeekIncomplete { week, seen, expected, best_content } => {
                assert_eq!(week, 1);
                assert_eq!(seen, 2);
                assert_eq!(expected, 3);
                assert_eq!(count_workouts(&best_content), 2);
            }
            other => panic!("Expected WeekIncomplete, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transport_failure_consumes_attempts() {
        let failing = vec![Err(BackendError::Unavailable("reset".to_string()))];
        let generator =
            ScriptedGenerator::new(vec![failing.clone(), failing.clone(), failing]);
        let (result, _) = run(&generator).await;

        assert_eq!(generator.calls(), 3);
        assert!(matches!(result.unwrap_err(), PipelineError::Backend(_)));
    }

    #[tokio::test]
    async fn test_transport_failure_then_success() {
        let generator = ScriptedGenerator::new(vec![
            vec![Err(BackendError::Unavailable("reset".to_string()))],
            complete_attempt(),
        ]);
        let (result, _) = run(&generator).await;

        assert!(result.is_ok());
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test]
    async fn test_increments_forwarded_live() {
        let generator = ScriptedGenerator::new(vec![complete_attempt()]);
        let (_, events) = run(&generator).await;

        let contents: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Content { text } => Some(text.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(contents.len(), 3);
        assert!(contents[0].contains("day one"));
    }

    #[tokio::test]
    async fn test_closed_channel_cancels() {
        let generator = ScriptedGenerator::new(vec![complete_attempt()]);
        let (tx, rx) = mpsc::channel(4);
        drop(rx);

        let controller = RetryController::new(&config());
        let result = controller
            .run_week(&generator, &request(), &week(), "", &RetrievalContext::empty(), &tx)
            .await;
        assert!(matches!(result.unwrap_err(), PipelineError::ConsumerGone));
        // No further attempts once the consumer is gone.
        assert_eq!(generator.calls(), 1);
    }
}
