//! Backend abstraction layer for Halteres.
//!
//! This module defines the traits and types the generation pipeline uses to
//! talk to its external collaborators: the streaming generative backend, the
//! embedding provider, and the similarity-search index. Concrete clients live
//! in `halteres-models`; the pipeline itself only ever sees these traits, so
//! every collaborator can be stubbed in tests.

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use thiserror::Error;

/// Represents an error from one of the external backends.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendError {
    /// The request could not be established at all (DNS, connect, timeout).
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// The backend accepted the connection but rejected the request.
    /// The response body is carried verbatim as diagnostic detail.
    #[error("Backend rejected request ({status}): {detail}")]
    Rejected {
        /// HTTP status code returned by the backend.
        status: u16,
        /// Response body, as returned by the backend.
        detail: String,
    },

    /// An error occurred while decoding the response.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Other unexpected errors.
    #[error("Backend error: {0}")]
    Other(String),
}

/// Represents a message in a conversation with a chat model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of the message sender (e.g., "user", "developer", "system").
    pub role: String,
    /// The content of the message.
    pub content: String,
}

impl ChatMessage {
    /// Convenience constructor for a developer-role message.
    pub fn developer(content: impl Into<String>) -> Self {
        Self { role: "developer".to_string(), content: content.into() }
    }

    /// Convenience constructor for a user-role message.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// Parameters for controlling the model's generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParameters {
    /// Sampling temperature, between 0 and 2.
    pub temperature: Option<f32>,

    /// Nucleus sampling probability mass.
    pub top_p: Option<f32>,

    /// The maximum number of tokens to generate.
    pub max_tokens: Option<u32>,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self { temperature: Some(0.7), top_p: None, max_tokens: None }
    }
}

/// A lazy, single-pass sequence of text increments from a streamed response.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, BackendError>> + Send>>;

/// A trait for the streaming generative backend.
///
/// One call produces one streamed completion. The backend is stateless per
/// call; continuity across calls is the pipeline's responsibility.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Issues a single streamed chat-completion request.
    ///
    /// Returns a stream of text increments in arrival order. The stream is
    /// finite: it ends when the backend signals end of stream.
    ///
    /// # Errors
    /// Returns `BackendError::Unavailable` if the request cannot be
    /// established and `BackendError::Rejected` on a non-success status.
    async fn stream_completion(
        &self,
        messages: &[ChatMessage],
        parameters: Option<GenerationParameters>,
    ) -> Result<TextStream, BackendError>;

    /// Returns the ID of the underlying model.
    fn model_id(&self) -> &str;
}

/// A trait for the external embedding provider.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Computes a single embedding vector for the given text.
    ///
    /// # Errors
    /// Returns a `BackendError` if the provider request fails. Callers in the
    /// pipeline treat this as non-fatal.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, BackendError>;
}

/// A reference workout returned by the similarity-search index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceWorkout {
    /// Title of the reference workout.
    pub title: String,
    /// Full text body of the reference workout.
    pub body: String,
}

/// A trait for the external similarity-search index.
///
/// The query embedding is passed as two halves. This is a workaround for the
/// index's parameter size limit; treat the halves as an opaque two-part key.
#[async_trait]
pub trait ReferenceIndex: Send + Sync {
    /// Returns the ranked reference workouts most similar to the query key.
    ///
    /// # Errors
    /// Returns a `BackendError` if the search request fails. Callers in the
    /// pipeline treat this as non-fatal.
    async fn search(
        &self,
        key_a: &[f32],
        key_b: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<ReferenceWorkout>, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_constructors() {
        let msg = ChatMessage::developer("plan the week");
        assert_eq!(msg.role, "developer");
        assert_eq!(msg.content, "plan the week");

        let msg = ChatMessage::user("hello");
        assert_eq!(msg.role, "user");
    }

    #[test]
    fn test_default_parameters() {
        let params = GenerationParameters::default();
        assert_eq!(params.temperature, Some(0.7));
        assert!(params.top_p.is_none());
        assert!(params.max_tokens.is_none());
    }

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::Rejected { status: 429, detail: "rate limit".to_string() };
        assert_eq!(err.to_string(), "Backend rejected request (429): rate limit");
    }
}
