//! Shared data types and the crate-wide error taxonomy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by the pipeline and its external collaborators.
///
/// Every external call is a single synchronous attempt; a failure here is
/// fatal to the request that triggered it. Retry and backoff policy, if any,
/// belongs to the collaborating client, not to this taxonomy.
#[derive(Debug, Error)]
pub enum RagError {
    /// The document source refused access (private or unshared document).
    #[error("document is not accessible: {0}")]
    NotAccessible(String),

    /// The document contained no extractable text.
    #[error("the document is empty or unreadable")]
    EmptyDocument,

    /// The document reference could not be parsed.
    #[error("invalid document reference: {0}")]
    InvalidDocument(String),

    /// The embedding service responded with a failure or is misconfigured.
    #[error("embedding service error: {0}")]
    Embedding(String),

    /// The generation service responded with a failure or is misconfigured.
    #[error("generation service error: {0}")]
    Generation(String),

    /// The vector store failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Transport-level HTTP failure before a service could respond.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RagError {
    /// Stable machine-readable category, used by the ingest boundary to
    /// build structured error responses.
    pub fn error_type(&self) -> &'static str {
        match self {
            RagError::NotAccessible(_) => "PRIVATE_OR_UNREADABLE",
            RagError::EmptyDocument | RagError::InvalidDocument(_) => "INVALID_OR_EMPTY",
            RagError::Embedding(_) => "EMBEDDING_SERVICE",
            RagError::Generation(_) => "GENERATION_SERVICE",
            RagError::Storage(_) => "STORAGE",
            RagError::Http(_) | RagError::Io(_) => "UNKNOWN",
        }
    }
}

/// A contiguous, provenance-tagged slice of document text.
///
/// Chunks are created once at ingest time and never mutated; re-ingesting a
/// document replaces the whole set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// The chunk text. Never empty.
    pub text: String,
    /// Title of the logical section the chunk belongs to.
    pub section: String,
    /// First page the chunk touches (1-based).
    pub page_start: u32,
    /// Last page the chunk touches; always >= `page_start`.
    pub page_end: u32,
}

impl Chunk {
    /// Human-readable citation string, copied verbatim into generated
    /// answers: `"{section} (pp. {page_start}–{page_end})"`.
    pub fn citation(&self) -> String {
        format!(
            "{} (pp. {}\u{2013}{})",
            self.section, self.page_start, self.page_end
        )
    }
}

/// Metadata persisted alongside each stored passage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassageMetadata {
    pub section: String,
    pub page_start: u32,
    pub page_end: u32,
    /// Derived citation string; see [`Chunk::citation`].
    pub citation: String,
    /// Abstractive 1-3 sentence summary produced at ingest time.
    pub chunk_summary: String,
}

/// A chunk plus derived fields, as persisted in the vector store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PassageRecord {
    /// Process-generated unique id with no semantic meaning.
    pub id: String,
    pub text: String,
    /// Fixed-length embedding; all records in a store share one length.
    pub embedding: Vec<f32>,
    pub metadata: PassageMetadata,
}

/// A raw similarity hit returned by a vector store query.
#[derive(Clone, Debug)]
pub struct ScoredPassage {
    pub text: String,
    pub citation: String,
    pub distance: f32,
}

/// A retrieved chunk plus its citation and similarity distance, used to
/// ground an answer. Constructed per query and never persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct Evidence {
    pub text: String,
    pub citation: String,
    pub distance: f32,
}

/// A per-chunk summary read back from stored metadata, used to assemble a
/// whole-document summary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkSummaryEntry {
    pub summary: String,
    pub section: String,
    pub page: u32,
}
