//! The end-to-end pipeline: ingest a document, answer questions about it.
//!
//! All collaborators are injected as `Arc<dyn Trait>` service objects built
//! once at startup, so every external dependency can be substituted with a
//! fake in tests.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::answer::{generate_answer, generate_document_summary};
use crate::chunking::chunk_text;
use crate::classify::is_summary_query;
use crate::config::PipelineConfig;
use crate::embeddings::EmbeddingProvider;
use crate::generation::GenerationProvider;
use crate::retrieval::{collect_chunk_summaries, retrieve};
use crate::rewrite::rewrite_query;
use crate::source::{DocumentSource, extract_doc_id};
use crate::stores::VectorStore;
use crate::summarize::summarize_chunk;
use crate::types::{PassageMetadata, PassageRecord, RagError};

/// Answer returned before any document has been ingested.
pub const NOT_INGESTED_ANSWER: &str = "No document has been ingested yet. \
    Please provide a publicly shareable Google Doc link first.";

/// Answer returned when the summary path finds no stored summaries.
pub const NO_SUMMARY_ANSWER: &str = "Could not generate a summary.";

/// Successful ingest outcome.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct IngestReport {
    pub chunk_count: usize,
}

/// Outcome of a reset.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct ResetReport {
    pub deleted: usize,
}

/// A chat answer.
#[derive(Clone, Debug, Serialize)]
pub struct ChatReply {
    pub answer: String,
}

/// Structured ingest result for the outward boundary: errors are converted
/// into a categorized payload, never surfaced as a raw failure.
#[derive(Clone, Debug, Serialize)]
pub struct IngestResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl IngestResponse {
    fn success(report: IngestReport) -> Self {
        Self {
            status: "success",
            total_chunks: Some(report.chunk_count),
            error_type: None,
            message: None,
        }
    }

    fn failure(err: &RagError) -> Self {
        let message = match err {
            RagError::NotAccessible(_) => "The document could not be accessed. \
                Please make sure the link is publicly shareable."
                .to_string(),
            RagError::EmptyDocument | RagError::InvalidDocument(_) => err.to_string(),
            other => format!("Failed to ingest the document. Error: {other}"),
        };
        Self {
            status: "error",
            total_chunks: None,
            error_type: Some(err.error_type()),
            message: Some(message),
        }
    }
}

/// Retrieval-augmented question answering over one ingested document.
pub struct RagPipeline {
    source: Arc<dyn DocumentSource>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerationProvider>,
    store: Arc<dyn VectorStore>,
    config: PipelineConfig,
}

impl RagPipeline {
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Fetches, chunks, summarizes, embeds, and stores a document.
    ///
    /// The store is cleared immediately before the new passages are written,
    /// so a replaced document never mixes with its predecessor and the last
    /// ingest always wins.
    pub async fn ingest_and_store(&self, document_id: &str) -> Result<IngestReport, RagError> {
        let text = self.source.fetch(document_id).await?;
        let chunks = chunk_text(&text, &self.config.chunking)?;
        tracing::info!(document_id, chunk_count = chunks.len(), "document chunked");

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();

        let mut metadata = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let chunk_summary = summarize_chunk(self.generator.as_ref(), &chunk.text).await?;
            metadata.push(PassageMetadata {
                section: chunk.section.clone(),
                page_start: chunk.page_start,
                page_end: chunk.page_end,
                citation: chunk.citation(),
                chunk_summary,
            });
        }

        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        let records: Vec<PassageRecord> = texts
            .into_iter()
            .zip(embeddings)
            .zip(metadata)
            .map(|((text, embedding), metadata)| PassageRecord {
                id: Uuid::new_v4().to_string(),
                text,
                embedding,
                metadata,
            })
            .collect();

        let chunk_count = records.len();
        self.store.clear().await?;
        self.store.upsert(records).await?;
        tracing::info!(document_id, chunk_count, "document ingested");

        Ok(IngestReport { chunk_count })
    }

    /// Ingests from a share URL, converting any failure into a structured
    /// boundary response.
    pub async fn ingest_from_url(&self, doc_url: &str) -> IngestResponse {
        let result = async {
            let document_id = extract_doc_id(doc_url)?;
            self.ingest_and_store(&document_id).await
        }
        .await;

        match result {
            Ok(report) => IngestResponse::success(report),
            Err(err) => {
                tracing::warn!(error = %err, "ingest failed");
                IngestResponse::failure(&err)
            }
        }
    }

    /// Answers a user message against the ingested document.
    ///
    /// Follows the query path: rewrite with bounded history, route between
    /// whole-document summary and similarity lookup, then generate. Errors
    /// propagate as typed failures; the caller decides the user-facing
    /// wording.
    pub async fn chat(&self, message: &str, history: &[String]) -> Result<ChatReply, RagError> {
        if self.store.is_empty().await? {
            return Ok(ChatReply {
                answer: NOT_INGESTED_ANSWER.to_string(),
            });
        }

        let rewritten = rewrite_query(self.generator.as_ref(), message, history).await?;
        tracing::debug!(query = %rewritten, "query rewritten");

        let answer = if is_summary_query(&rewritten) {
            let summaries = collect_chunk_summaries(self.store.as_ref()).await?;
            if summaries.is_empty() {
                NO_SUMMARY_ANSWER.to_string()
            } else {
                generate_document_summary(self.generator.as_ref(), summaries).await?
            }
        } else {
            let query_embedding = self
                .embedder
                .embed_batch(std::slice::from_ref(&rewritten))
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    RagError::Embedding("endpoint returned no embedding for the query".to_string())
                })?;

            let evidence = retrieve(self.store.as_ref(), &query_embedding, &self.config.retrieval)
                .await?;
            tracing::debug!(evidence_count = evidence.len(), "evidence assembled");
            generate_answer(self.generator.as_ref(), &rewritten, &evidence).await?
        };

        Ok(ChatReply { answer })
    }

    /// Deletes every stored passage.
    pub async fn reset_store(&self) -> Result<ResetReport, RagError> {
        let deleted = self.store.clear().await?;
        tracing::info!(deleted, "vector store cleared");
        Ok(ResetReport { deleted })
    }

    /// True iff a document is currently ingested.
    pub async fn is_ingested(&self) -> Result<bool, RagError> {
        Ok(!self.store.is_empty().await?)
    }
}

/// Builder for [`RagPipeline`] instances.
#[derive(Default)]
pub struct RagPipelineBuilder {
    source: Option<Arc<dyn DocumentSource>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    generator: Option<Arc<dyn GenerationProvider>>,
    store: Option<Arc<dyn VectorStore>>,
    config: PipelineConfig,
}

impl RagPipelineBuilder {
    #[must_use]
    pub fn source(mut self, source: Arc<dyn DocumentSource>) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    #[must_use]
    pub fn generator(mut self, generator: Arc<dyn GenerationProvider>) -> Self {
        self.generator = Some(generator);
        self
    }

    #[must_use]
    pub fn store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the pipeline.
    ///
    /// # Panics
    ///
    /// Panics if any collaborator is missing; use [`try_build`](Self::try_build)
    /// for a fallible variant.
    pub fn build(self) -> RagPipeline {
        self.try_build()
            .expect("RagPipelineBuilder requires source, embedder, generator, and store")
    }

    /// Builds the pipeline, returning `None` if a collaborator is missing.
    pub fn try_build(self) -> Option<RagPipeline> {
        Some(RagPipeline {
            source: self.source?,
            embedder: self.embedder?,
            generator: self.generator?,
            store: self.store?,
            config: self.config,
        })
    }
}
