//! Retrieval-augmented question answering over a single ingested document.
//!
//! ```text
//! Ingest:
//!   DocumentSource::fetch ──► chunking::chunk_text ──► summarize (per chunk)
//!                                                          │
//!                                  embeddings (one batch) ◄┘
//!                                                          │
//!                                  stores::VectorStore.upsert (clear first)
//!
//! Query:
//!   message + history ──► rewrite ──► classify ─┬─► summaries ──► document summary
//!                                               └─► embed ──► retrieve (top-k + gate)
//!                                                                  │
//!                                               answer::generate_answer (citations)
//! ```
//!
//! The store holds exactly one document at a time; re-ingesting replaces it
//! wholesale. Every external service (document export, embedding endpoint,
//! completion endpoint, vector database) sits behind an injected trait so the
//! whole pipeline runs offline in tests.

pub mod answer;
pub mod chunking;
pub mod classify;
pub mod config;
pub mod embeddings;
pub mod generation;
pub mod pipeline;
pub mod retrieval;
pub mod rewrite;
pub mod source;
pub mod stores;
pub mod summarize;
pub mod types;

pub use answer::{REFUSAL, generate_answer, generate_document_summary};
pub use chunking::chunk_text;
pub use classify::is_summary_query;
pub use config::{ChunkingConfig, Credentials, PipelineConfig, RetrievalConfig};
pub use embeddings::{EmbeddingProvider, HfEmbeddingClient, MockEmbeddingProvider};
pub use generation::{
    ChatCompletionsClient, CompletionParams, CompletionRequest, GenerationProvider,
    ScriptedGenerationProvider,
};
pub use pipeline::{
    ChatReply, IngestReport, IngestResponse, RagPipeline, RagPipelineBuilder, ResetReport,
};
pub use retrieval::{MAX_DISTANCE_THRESHOLD, TOP_K, retrieve};
pub use rewrite::rewrite_query;
pub use source::{DocumentSource, GoogleDocSource, extract_doc_id};
pub use stores::{InMemoryPassageStore, SqlitePassageStore, VectorStore};
pub use types::{Chunk, ChunkSummaryEntry, Evidence, PassageMetadata, PassageRecord, RagError};
