//! Similarity retrieval with a distance gate.

use crate::config::RetrievalConfig;
use crate::stores::VectorStore;
use crate::types::{ChunkSummaryEntry, Evidence, RagError};

/// Maximum number of passages considered per query.
pub const TOP_K: usize = 3;

/// Cosine-distance ceiling; anything farther is discarded as irrelevant.
pub const MAX_DISTANCE_THRESHOLD: f32 = 1.2;

/// Runs a similarity query and assembles gated, citation-bearing evidence.
///
/// Results keep the store's ascending-distance order. An empty return is a
/// normal outcome (empty store, or every hit gated out), not an error.
pub async fn retrieve(
    store: &dyn VectorStore,
    query_embedding: &[f32],
    config: &RetrievalConfig,
) -> Result<Vec<Evidence>, RagError> {
    let hits = store.query(query_embedding, config.top_k).await?;
    let total = hits.len();

    let evidence: Vec<Evidence> = hits
        .into_iter()
        .filter(|hit| hit.distance <= config.max_distance)
        .map(|hit| Evidence {
            text: hit.text,
            citation: hit.citation,
            distance: hit.distance,
        })
        .collect();

    if evidence.len() < total {
        tracing::debug!(
            gated_out = total - evidence.len(),
            kept = evidence.len(),
            "distance gate dropped retrieval hits"
        );
    }
    Ok(evidence)
}

/// Reads every stored chunk summary back from passage metadata, for
/// whole-document summarization.
pub async fn collect_chunk_summaries(
    store: &dyn VectorStore,
) -> Result<Vec<ChunkSummaryEntry>, RagError> {
    let entries = store
        .get_all_metadata()
        .await?
        .into_iter()
        .map(|metadata| ChunkSummaryEntry {
            summary: metadata.chunk_summary,
            section: metadata.section,
            page: metadata.page_start,
        })
        .collect();
    Ok(entries)
}
