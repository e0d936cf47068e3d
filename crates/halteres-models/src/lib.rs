//! Backend client implementations for Halteres.
//!
//! Concrete clients for the external collaborators the generation pipeline
//! depends on:
//!
//! - [`OpenAiBackend`]: streaming chat completions against an
//!   OpenAI-compatible API.
//! - [`OpenAiEmbeddings`]: single-vector embeddings for retrieval queries.
//! - [`SupabaseIndex`]: the `match_similar_workouts` RPC on a Supabase
//!   project, queried with a split embedding key.
//! - [`SseDecoder`]: the incremental decoder for the upstream's `data: `
//!   line protocol, shared by the streaming backend and its tests.
//!
//! All clients are explicitly constructed and injected into the pipeline at
//! startup. There is no module-level client state.

pub mod openai;
pub mod sse;
pub mod supabase;

pub use openai::{OpenAiBackend, OpenAiEmbeddings};
pub use sse::{CompletionChunk, SseDecoder, SseFrame};
pub use supabase::SupabaseIndex;
