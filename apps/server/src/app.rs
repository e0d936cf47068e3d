//! HTTP surface for the generation pipeline.
//!
//! One streaming endpoint plus a health probe. Request validation failures
//! are synchronous JSON errors; everything after validation is delivered as
//! server-sent events, one JSON-encoded pipeline event per `data:` line,
//! closed by a `data: [DONE]` line on both the success and the abort path.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{Stream, StreamExt};
use halteres_pipeline::{
    Orchestrator, PipelineError, ProgramRequest, StreamEvent, STREAM_TERMINATOR,
};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/programs/generate", post(generate))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// POST /v1/programs/generate — starts a run and streams its events.
async fn generate(
    State(state): State<AppState>,
    Json(request): Json<ProgramRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, Json<serde_json::Value>)>
{
    let events = state.orchestrator.run(request).map_err(|e| {
        let message = e.to_string();
        match e {
            PipelineError::InvalidRequest { field } => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": message, "field": field })),
            ),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": message }))),
        }
    })?;

    let body = events
        .map(|event| Ok(encode_event(&event)))
        .chain(futures::stream::once(async {
            Ok(Event::default().data(STREAM_TERMINATOR))
        }));
    Ok(Sse::new(body))
}

/// Encodes one pipeline event as an SSE data line.
fn encode_event(event: &StreamEvent) -> Event {
    match serde_json::to_string(event) {
        Ok(json) => Event::default().data(json),
        Err(e) => {
            warn!(error = %e, "Failed to encode event");
            Event::default().data(r#"{"type":"error","week":null,"message":"encoding failure"}"#)
        }
    }
}
