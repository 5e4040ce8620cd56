//! Offline walk-through of the full pipeline: ingest a sample document, then
//! run a lookup question, an out-of-scope question, and a summary request.
//!
//! Every collaborator is an in-process double, so this runs without network
//! access or credentials:
//!
//! ```bash
//! cargo run --example doc_pipeline
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tracing_subscriber::EnvFilter;

use ragdoc::{
    DocumentSource, InMemoryPassageStore, MockEmbeddingProvider, RagError, RagPipeline,
    ScriptedGenerationProvider,
};

const SAMPLE_DOC: &str = "Refund Policy\n\
    refund requests are honored within thirty days of purchase when the item is unused. \
    refunds are issued to the original payment method.\n\
    Shipping\n\
    items ship from the warehouse within two business days of ordering. expedited \
    shipping is available for an extra fee.";

struct StaticSource;

#[async_trait]
impl DocumentSource for StaticSource {
    async fn fetch(&self, document_id: &str) -> Result<String, RagError> {
        tracing::info!(document_id, "serving embedded sample document");
        Ok(SAMPLE_DOC.to_string())
    }
}

#[tokio::main]
async fn main() -> Result<(), RagError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let generator = Arc::new(
        ScriptedGenerationProvider::new()
            .with_default_reply("Refunds are honored within thirty days. Refund Policy (pp. 1–1)"),
    );
    generator.push_reply("Refunds are honored for unused items within thirty days.");
    generator.push_reply("Items ship within two business days; expedited is extra.");

    let pipeline = RagPipeline::builder()
        .source(Arc::new(StaticSource))
        .embedder(Arc::new(MockEmbeddingProvider::new()))
        .generator(generator)
        .store(Arc::new(InMemoryPassageStore::new()))
        .build();

    let report = pipeline.ingest_and_store("sample-doc").await?;
    println!("ingested {} chunks", report.chunk_count);

    for question in [
        "What is the refund time window?",
        "Who won the world cup?",
        "Can you give me an overview?",
    ] {
        let reply = pipeline.chat(question, &[]).await?;
        println!("\nQ: {question}\nA: {}", reply.answer);
    }

    let reset = pipeline.reset_store().await?;
    println!("\nreset removed {} passages", reset.deleted);
    Ok(())
}
