//! Halteres server — streaming workout program generation over HTTP.
//!
//! Wires the OpenAI-backed generator, embeddings, and the Supabase
//! similarity index into the pipeline orchestrator, and exposes it via a
//! single server-sent-events endpoint.

mod app;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use halteres_models::{OpenAiBackend, OpenAiEmbeddings, SupabaseIndex};
use halteres_pipeline::{BackendWeekGenerator, Orchestrator, PipelineConfig, RetrievalAugmenter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::AppState;

const DEFAULT_GENERATION_MODEL: &str = "gpt-4o";

/// Streaming workout program generation server.
#[derive(Parser, Debug)]
#[command(name = "halteres-server", version, about = "Halteres program generation server")]
struct Args {
    /// Address to listen on.
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    addr: SocketAddr,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Chat model used for week generation.
    #[arg(short, long, default_value = DEFAULT_GENERATION_MODEL)]
    model: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!(
                "halteres_server={level},halteres_pipeline={level},halteres_models={level},tower_http=info",
                level = args.log_level
            )
            .into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let backend = OpenAiBackend::new(args.model.clone())
        .context("OPENAI_API_KEY must be set for generation")?;
    let embeddings = OpenAiEmbeddings::new()
        .context("OPENAI_API_KEY must be set for embeddings")?;
    let index = SupabaseIndex::new()
        .context("SUPABASE_URL and SUPABASE_ANON_KEY must be set for retrieval")?;

    let config = PipelineConfig::default();
    let generator = Arc::new(BackendWeekGenerator::new(Arc::new(backend)));
    let augmenter = RetrievalAugmenter::new(Arc::new(embeddings), Arc::new(index), &config);
    let orchestrator = Arc::new(Orchestrator::new(generator, augmenter, config));

    let router = app::router(AppState { orchestrator });

    tracing::info!(addr = %args.addr, model = %args.model, "Halteres server listening");
    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("failed to bind {}", args.addr))?;
    axum::serve(listener, router).await.context("server error")?;

    Ok(())
}
