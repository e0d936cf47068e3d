//! OpenAI API clients.
//!
//! Two clients live here: [`OpenAiBackend`], the streaming chat-completions
//! backend driving program generation, and [`OpenAiEmbeddings`], the
//! embedding provider used by retrieval augmentation. Both work against any
//! server implementing the OpenAI API specification.

use async_trait::async_trait;
use futures::Stream;
use halteres_abstraction::{
    BackendError, ChatMessage, EmbeddingProvider, GenerationBackend, GenerationParameters,
    TextStream,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::env;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tracing::{debug, error};

use crate::sse::SseDecoder;

/// Default per-attempt request timeout. Distinct from the pipeline's
/// unit-level retry ceiling; one timeout consumes one retry slot there.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Streaming chat-completions backend for an OpenAI-compatible API.
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    /// The model ID (e.g., "gpt-4o").
    model_id: String,
    /// The API key for authentication.
    api_key: String,
    /// The base URL for the API.
    base_url: String,
    /// HTTP client for making requests.
    client: Client,
}

impl OpenAiBackend {
    /// Creates a new `OpenAiBackend` with the given model ID.
    ///
    /// # Errors
    /// Returns a `BackendError` if `OPENAI_API_KEY` is not set.
    pub fn new(model_id: String) -> Result<Self, BackendError> {
        let api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            BackendError::Other("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self::with_api_key(model_id, api_key))
    }

    /// Creates a new `OpenAiBackend` with an explicit API key.
    #[must_use]
    pub fn with_api_key(model_id: String, api_key: String) -> Self {
        Self {
            model_id,
            api_key,
            base_url: "https://api.openai.com/v1".to_string(),
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Overrides the base URL, for compatible servers and tests.
    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    async fn stream_completion(
        &self,
        messages: &[ChatMessage],
        parameters: Option<GenerationParameters>,
    ) -> Result<TextStream, BackendError> {
        debug!(
            model_id = %self.model_id,
            message_count = messages.len(),
            "OpenAiBackend starting streamed completion"
        );

        let url = format!("{}/chat/completions", self.base_url);

        let mut request_body = StreamingRequest {
            model: self.model_id.clone(),
            messages: messages.to_vec(),
            stream: true,
            temperature: None,
            top_p: None,
            max_tokens: None,
        };
        if let Some(params) = parameters {
            request_body.temperature = params.temperature;
            request_body.top_p = params.top_p;
            request_body.max_tokens = params.max_tokens;
        }

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, url = %url, "Failed to send streaming request");
                BackendError::Unavailable(format!("Network error: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail =
                response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                status = %status,
                detail = %detail,
                "Chat API returned error status for streaming request"
            );
            return Err(BackendError::Rejected { status: status.as_u16(), detail });
        }

        Ok(Box::pin(CompletionStream::new(response)))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Adapts the raw response body into a stream of text increments.
///
/// Each poll feeds arriving bytes through the [`SseDecoder`] and yields the
/// textual content of every frame in order. Frames with no textual payload
/// are skipped.
struct CompletionStream {
    bytes: Pin<Box<dyn Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    done: bool,
}

impl CompletionStream {
    fn new(response: reqwest::Response) -> Self {
        Self {
            bytes: Box::pin(response.bytes_stream()),
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            done: false,
        }
    }
}

impl Stream for CompletionStream {
    type Item = Result<String, BackendError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(text) = self.pending.pop_front() {
                return Poll::Ready(Some(Ok(text)));
            }
            if self.done {
                return Poll::Ready(None);
            }

            match self.bytes.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    let frames = self.decoder.push(&chunk);
                    self.pending.extend(
                        frames.iter().filter_map(|f| f.content().map(str::to_string)),
                    );
                }
                Poll::Ready(Some(Err(e))) => {
                    self.done = true;
                    return Poll::Ready(Some(Err(BackendError::Unavailable(format!(
                        "Stream error: {}",
                        e
                    )))));
                }
                Poll::Ready(None) => {
                    self.done = true;
                    if let Some(text) =
                        self.decoder.finish().and_then(|f| f.content().map(str::to_string))
                    {
                        self.pending.push_back(text);
                    }
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Embedding provider backed by the OpenAI embeddings API.
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddings {
    /// The embedding model ID.
    model_id: String,
    /// Requested vector dimensionality.
    dimensions: u32,
    /// The API key for authentication.
    api_key: String,
    /// The base URL for the API.
    base_url: String,
    /// HTTP client for making requests.
    client: Client,
}

impl OpenAiEmbeddings {
    /// Default embedding model, matching the reference corpus the index was
    /// built with.
    pub const DEFAULT_MODEL: &'static str = "text-embedding-3-large";

    /// Dimensionality the similarity index expects.
    pub const DEFAULT_DIMENSIONS: u32 = 1536;

    /// Creates a new `OpenAiEmbeddings` with the default model.
    ///
    /// # Errors
    /// Returns a `BackendError` if `OPENAI_API_KEY` is not set.
    pub fn new() -> Result<Self, BackendError> {
        let api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            BackendError::Other("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self::with_api_key(api_key))
    }

    /// Creates a new `OpenAiEmbeddings` with an explicit API key.
    #[must_use]
    pub fn with_api_key(api_key: String) -> Self {
        Self {
            model_id: Self::DEFAULT_MODEL.to_string(),
            dimensions: Self::DEFAULT_DIMENSIONS,
            api_key,
            base_url: "https://api.openai.com/v1".to_string(),
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Overrides the base URL, for compatible servers and tests.
    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, BackendError> {
        debug!(model_id = %self.model_id, text_len = text.len(), "Requesting embedding");

        let url = format!("{}/embeddings", self.base_url);
        let request_body = EmbeddingRequest {
            model: self.model_id.clone(),
            input: text.to_string(),
            dimensions: self.dimensions,
            encoding_format: "float".to_string(),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send embedding request");
                BackendError::Unavailable(format!("Network error: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail =
                response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, detail = %detail, "Embedding API returned error status");
            return Err(BackendError::Rejected { status: status.as_u16(), detail });
        }

        let body: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse embedding response");
            BackendError::Decode(format!("Failed to parse response: {}", e))
        })?;

        body.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| BackendError::Decode("No embedding in API response".to_string()))
    }
}

// API request/response structures

#[derive(Debug, Serialize)]
struct StreamingRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    model: String,
    input: String,
    dimensions: u32,
    encoding_format: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn message(content: &str) -> Vec<ChatMessage> {
        vec![ChatMessage::user(content)]
    }

    #[test]
    fn test_backend_creation_with_api_key() {
        let backend = OpenAiBackend::with_api_key("gpt-4o".to_string(), "test-key".to_string());
        assert_eq!(backend.model_id(), "gpt-4o");
    }

    #[tokio::test]
    async fn test_stream_completion_success() {
        let mut server = mockito::Server::new_async().await;
        let base_url = format!("{}/v1", server.url());

        let body = b"data: {\"choices\":[{\"delta\":{\"content\":\"Day\"}}]}\n\ndata: {\"choices\":[{\"delta\":{\"content\":\" 1\"}}]}\n\ndata: [DONE]\n\n";
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let backend = OpenAiBackend::with_api_key("gpt-4o".to_string(), "test-key".to_string())
            .with_base_url(base_url);

        let mut stream =
            backend.stream_completion(&message("two days"), None).await.unwrap();

        let mut increments = Vec::new();
        while let Some(item) = stream.next().await {
            increments.push(item.unwrap());
        }

        assert_eq!(increments, vec!["Day".to_string(), " 1".to_string()]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_stream_completion_rejected() {
        let mut server = mockito::Server::new_async().await;
        let base_url = format!("{}/v1", server.url());

        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .with_body(r#"{"error": "Rate limit exceeded"}"#)
            .create_async()
            .await;

        let backend = OpenAiBackend::with_api_key("gpt-4o".to_string(), "test-key".to_string())
            .with_base_url(base_url);

        let result = backend.stream_completion(&message("hi"), None).await;
        match result {
            Err(BackendError::Rejected { status, detail }) => {
                assert_eq!(status, 429);
                assert!(detail.contains("Rate limit"));
            }
            Err(other) => panic!("Expected Rejected error, got {other:?}"),
            Ok(_) => panic!("Expected Rejected error, got a stream"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_stream_completion_unavailable() {
        // Nothing is listening on this port.
        let backend = OpenAiBackend::with_api_key("gpt-4o".to_string(), "test-key".to_string())
            .with_base_url("http://127.0.0.1:1/v1".to_string());

        let result = backend.stream_completion(&message("hi"), None).await;
        assert!(matches!(result.err(), Some(BackendError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_stream_completion_raw_fallback_lines() {
        let mut server = mockito::Server::new_async().await;
        let base_url = format!("{}/v1", server.url());

        let body =
            b"data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n\ndata: not json\n\n";
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let backend = OpenAiBackend::with_api_key("gpt-4o".to_string(), "test-key".to_string())
            .with_base_url(base_url);

        let mut stream = backend.stream_completion(&message("hi"), None).await.unwrap();
        let mut increments = Vec::new();
        while let Some(item) = stream.next().await {
            increments.push(item.unwrap());
        }

        // The malformed line is preserved as raw text, not dropped.
        assert_eq!(increments, vec!["ok".to_string(), "not json".to_string()]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_stream_completion_applies_parameters() {
        let mut server = mockito::Server::new_async().await;
        let base_url = format!("{}/v1", server.url());

        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"model":"gpt-4o","stream":true,"temperature":0.7}"#.to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body("data: [DONE]\n\n")
            .create_async()
            .await;

        let backend = OpenAiBackend::with_api_key("gpt-4o".to_string(), "test-key".to_string())
            .with_base_url(base_url);

        let mut stream = backend
            .stream_completion(&message("hi"), Some(GenerationParameters::default()))
            .await
            .unwrap();
        assert!(stream.next().await.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_embed_success() {
        let mut server = mockito::Server::new_async().await;
        let base_url = format!("{}/v1", server.url());

        let mock = server
            .mock("POST", "/v1/embeddings")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"model":"text-embedding-3-large","dimensions":1536,"encoding_format":"float"}"#
                    .to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[{"embedding":[0.1,0.2,0.3,0.4]}]}"#)
            .create_async()
            .await;

        let provider =
            OpenAiEmbeddings::with_api_key("test-key".to_string()).with_base_url(base_url);

        let vector = provider.embed("strength program").await.unwrap();
        assert_eq!(vector, vec![0.1, 0.2, 0.3, 0.4]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_embed_error_status() {
        let mut server = mockito::Server::new_async().await;
        let base_url = format!("{}/v1", server.url());

        let mock = server
            .mock("POST", "/v1/embeddings")
            .with_status(500)
            .with_body(r#"{"error": "Internal server error"}"#)
            .create_async()
            .await;

        let provider =
            OpenAiEmbeddings::with_api_key("test-key".to_string()).with_base_url(base_url);

        let result = provider.embed("query").await;
        assert!(matches!(result.unwrap_err(), BackendError::Rejected { status: 500, .. }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_embed_empty_data() {
        let mut server = mockito::Server::new_async().await;
        let base_url = format!("{}/v1", server.url());

        let mock = server
            .mock("POST", "/v1/embeddings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[]}"#)
            .create_async()
            .await;

        let provider =
            OpenAiEmbeddings::with_api_key("test-key".to_string()).with_base_url(base_url);

        let result = provider.embed("query").await;
        assert!(matches!(result.unwrap_err(), BackendError::Decode(_)));
        mock.assert_async().await;
    }
}
