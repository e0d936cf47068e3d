//! Supabase similarity-search client.
//!
//! Queries the `match_similar_workouts` RPC of a Supabase project. The index
//! stores reference workouts with their embeddings split across two columns,
//! so the query embedding is passed as two halves; the halves are an opaque
//! two-part key here, not a semantic split.

use async_trait::async_trait;
use halteres_abstraction::{BackendError, ReferenceIndex, ReferenceWorkout};
use reqwest::Client;
use serde::Serialize;
use std::env;
use std::time::Duration;
use tracing::{debug, error};

/// The RPC that ranks reference workouts against a query embedding.
const MATCH_RPC: &str = "match_similar_workouts";

/// Similarity-search client for a Supabase-hosted workout index.
#[derive(Debug, Clone)]
pub struct SupabaseIndex {
    /// Project base URL (e.g., "https://xyz.supabase.co").
    base_url: String,
    /// Anonymous API key for the project.
    anon_key: String,
    /// HTTP client for making requests.
    client: Client,
}

impl SupabaseIndex {
    /// Creates a new `SupabaseIndex` from `SUPABASE_URL` and
    /// `SUPABASE_ANON_KEY`.
    ///
    /// # Errors
    /// Returns a `BackendError` if either environment variable is not set.
    pub fn new() -> Result<Self, BackendError> {
        let base_url = env::var("SUPABASE_URL").map_err(|_| {
            BackendError::Other("SUPABASE_URL environment variable not set".to_string())
        })?;
        let anon_key = env::var("SUPABASE_ANON_KEY").map_err(|_| {
            BackendError::Other("SUPABASE_ANON_KEY environment variable not set".to_string())
        })?;
        Ok(Self::with_credentials(base_url, anon_key))
    }

    /// Creates a new `SupabaseIndex` with explicit credentials.
    #[must_use]
    pub fn with_credentials(base_url: String, anon_key: String) -> Self {
        Self {
            base_url,
            anon_key,
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }
}

#[async_trait]
impl ReferenceIndex for SupabaseIndex {
    async fn search(
        &self,
        key_a: &[f32],
        key_b: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<ReferenceWorkout>, BackendError> {
        debug!(
            key_a_len = key_a.len(),
            key_b_len = key_b.len(),
            threshold,
            limit,
            "Searching similar workouts"
        );

        let url = format!("{}/rest/v1/rpc/{}", self.base_url, MATCH_RPC);
        let request_body = MatchRequest {
            query_embedding_1: key_a.to_vec(),
            query_embedding_2: key_b.to_vec(),
            match_threshold: threshold,
            match_count: limit,
        };

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send similarity search request");
                BackendError::Unavailable(format!("Network error: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail =
                response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, detail = %detail, "Similarity search returned error status");
            return Err(BackendError::Rejected { status: status.as_u16(), detail });
        }

        response.json::<Vec<ReferenceWorkout>>().await.map_err(|e| {
            error!(error = %e, "Failed to parse similarity search response");
            BackendError::Decode(format!("Failed to parse response: {}", e))
        })
    }
}

#[derive(Debug, Serialize)]
struct MatchRequest {
    query_embedding_1: Vec<f32>,
    query_embedding_2: Vec<f32>,
    match_threshold: f32,
    match_count: usize,
}
