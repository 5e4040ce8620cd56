//! Vector storage for ingested passages.
//!
//! The pipeline talks to storage only through the [`VectorStore`] trait, a
//! thin contract over a black-box similarity store:
//!
//! ```text
//!                  ┌──────────────────┐
//!                  │ VectorStore trait │
//!                  │   (async CRUD)    │
//!                  └────────┬─────────┘
//!                           │
//!              ┌────────────┴────────────┐
//!              ▼                         ▼
//!   ┌────────────────────┐   ┌────────────────────┐
//!   │ InMemoryPassageStore│   │ SqlitePassageStore │
//!   │  (exact scan)       │   │  (sqlite-vec)      │
//!   └────────────────────┘   └────────────────────┘
//! ```
//!
//! The store holds passages for at most one ingested document at a time;
//! ingesting a new document clears it first and then writes, so "last ingest
//! wins" with no merged documents.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

pub use memory::InMemoryPassageStore;
pub use sqlite::SqlitePassageStore;

use crate::types::{PassageMetadata, PassageRecord, RagError, ScoredPassage};

/// Thin contract over an external vector database.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Adds passages to the store. Ids are caller-assigned and unique per
    /// ingest run.
    async fn upsert(&self, passages: Vec<PassageRecord>) -> Result<(), RagError>;

    /// Nearest-neighbor search by cosine distance. Returns at most `top_k`
    /// hits ordered by ascending distance.
    async fn query(&self, embedding: &[f32], top_k: usize)
    -> Result<Vec<ScoredPassage>, RagError>;

    /// Full metadata scan, used for whole-document summarization and
    /// ingestion-state inspection.
    async fn get_all_metadata(&self) -> Result<Vec<PassageMetadata>, RagError>;

    /// Deletes every stored passage, returning how many were removed.
    async fn clear(&self) -> Result<usize, RagError>;

    /// True iff no passage is stored.
    async fn is_empty(&self) -> Result<bool, RagError>;
}
