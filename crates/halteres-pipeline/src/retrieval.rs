//! Retrieval augmentation: few-shot context from the reference workout
//! index.
//!
//! The query is built from a fixed subset of request fields, embedded once
//! per run, and searched with the embedding split into two halves (the
//! index's parameter-size workaround; the halves are an opaque two-part
//! key). Retrieval is an enhancement, not a correctness requirement: any
//! provider or search failure is logged and downgraded to an empty context.

use halteres_abstraction::{EmbeddingProvider, ReferenceIndex, ReferenceWorkout};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::request::ProgramRequest;

/// Fallback prompt text when no matches are available.
const NO_MATCHES: &str = "No similar workouts found for reference.";

/// A small ordered set of reference workouts for few-shot context.
/// Read-only after construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalContext {
    matches: Vec<ReferenceWorkout>,
}

impl RetrievalContext {
    /// An empty context, used when retrieval is degraded or disabled.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wraps ranked matches.
    pub fn from_matches(matches: Vec<ReferenceWorkout>) -> Self {
        Self { matches }
    }

    /// Whether any matches are present.
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Formats the matches as a prompt block, or the fallback line when
    /// empty.
    pub fn to_prompt_block(&self) -> String {
        if self.matches.is_empty() {
            return NO_MATCHES.to_string();
        }
        let mut block = String::new();
        for workout in &self.matches {
            if !block.is_empty() {
                block.push_str("\n\n");
            }
            let _ = write!(block, "{}:\n{}", workout.title, workout.body);
        }
        block
    }
}

/// Computes the per-run retrieval context.
pub struct RetrievalAugmenter {
    embeddings: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn ReferenceIndex>,
    threshold: f32,
    match_count: usize,
}

impl RetrievalAugmenter {
    /// Creates an augmenter over the given provider and index.
    pub fn new(
        embeddings: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn ReferenceIndex>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            embeddings,
            index,
            threshold: config.match_threshold,
            match_count: config.match_count,
        }
    }

    /// Builds the query, embeds it, and searches the index. Never fails:
    /// a degraded retrieval downgrades to an empty context.
    pub async fn augment(&self, request: &ProgramRequest) -> RetrievalContext {
        let query = build_query(request);

        let embedding = match self.embeddings.embed(&query).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(error = %e, "Embedding failed, continuing without retrieval context");
                return RetrievalContext::empty();
            }
        };

        let (key_a, key_b) = embedding.split_at(embedding.len() / 2);
        match self.index.search(key_a, key_b, self.threshold, self.match_count).await {
            Ok(matches) => {
                debug!(match_count = matches.len(), "Retrieved similar workouts");
                RetrievalContext::from_matches(matches)
            }
            Err(e) => {
                warn!(error = %e, "Similarity search failed, continuing without retrieval context");
                RetrievalContext::empty()
            }
        }
    }
}

/// Builds the natural-language retrieval query from the request.
fn build_query(request: &ProgramRequest) -> String {
    format!(
        "Program: {}\n\
         Description: {}\n\
         Training Styles: {}\n\
         Focus Areas: {}\n\
         Program Instructions: {}\n\
         Injuries/Restrictions: {}\n\
         Equipment: {}\n\
         Space: {}",
        or_default(&request.overview.name, "Unnamed Program"),
        or_default(&request.overview.description, "No description provided"),
        request.format.format.join(", "),
        request.format.focus.join(", "),
        request.format.instructions.as_deref().unwrap_or("None provided"),
        request.format.restrictions.as_deref().unwrap_or("None provided"),
        or_default(&request.gym.equipment, "Standard Gym"),
        request.gym.space.as_deref().unwrap_or("Standard space"),
    )
}

fn or_default<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}
