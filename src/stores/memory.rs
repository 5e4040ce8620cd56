//! In-memory vector store with an exact cosine-distance scan.
//!
//! This is both the default store for small single-document deployments and
//! the substitute used by tests; the scan is exact, so retrieval behavior is
//! fully deterministic.

use async_trait::async_trait;
use parking_lot::RwLock;

use super::VectorStore;
use crate::types::{PassageMetadata, PassageRecord, RagError, ScoredPassage};

#[derive(Default)]
pub struct InMemoryPassageStore {
    passages: RwLock<Vec<PassageRecord>>,
}

impl InMemoryPassageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Cosine distance in `[0, 2]`; degenerate zero-norm vectors are treated as
/// maximally neutral (distance 1).
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0f32;
    let mut norm_a = 0f32;
    let mut norm_b = 0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[async_trait]
impl VectorStore for InMemoryPassageStore {
    async fn upsert(&self, passages: Vec<PassageRecord>) -> Result<(), RagError> {
        if passages.is_empty() {
            return Ok(());
        }
        let mut guard = self.passages.write();
        if let Some(existing) = guard.first() {
            let expected = existing.embedding.len();
            if passages.iter().any(|p| p.embedding.len() != expected) {
                return Err(RagError::Storage(format!(
                    "embedding length mismatch: store holds {expected}-dim vectors"
                )));
            }
        }
        guard.extend(passages);
        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPassage>, RagError> {
        let guard = self.passages.read();
        let mut scored: Vec<ScoredPassage> = guard
            .iter()
            .map(|passage| {
                if passage.embedding.len() != embedding.len() {
                    return Err(RagError::Storage(format!(
                        "query embedding has {} dims, stored passages have {}",
                        embedding.len(),
                        passage.embedding.len()
                    )));
                }
                Ok(ScoredPassage {
                    text: passage.text.clone(),
                    citation: passage.metadata.citation.clone(),
                    distance: cosine_distance(embedding, &passage.embedding),
                })
            })
            .collect::<Result<_, _>>()?;

        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn get_all_metadata(&self) -> Result<Vec<PassageMetadata>, RagError> {
        Ok(self
            .passages
            .read()
            .iter()
            .map(|passage| passage.metadata.clone())
            .collect())
    }

    async fn clear(&self) -> Result<usize, RagError> {
        let mut guard = self.passages.write();
        let deleted = guard.len();
        guard.clear();
        Ok(deleted)
    }

    async fn is_empty(&self) -> Result<bool, RagError> {
        Ok(self.passages.read().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PassageMetadata;

    fn record(id: &str, text: &str, embedding: Vec<f32>) -> PassageRecord {
        PassageRecord {
            id: id.to_string(),
            text: text.to_string(),
            embedding,
            metadata: PassageMetadata {
                section: "S".to_string(),
                page_start: 1,
                page_end: 1,
                citation: format!("{id} (pp. 1–1)"),
                chunk_summary: format!("summary of {id}"),
            },
        }
    }

    #[tokio::test]
    async fn query_orders_by_ascending_distance_and_truncates() {
        let store = InMemoryPassageStore::new();
        store
            .upsert(vec![
                record("far", "far text", vec![-1.0, 0.0]),
                record("near", "near text", vec![1.0, 0.0]),
                record("mid", "mid text", vec![0.0, 1.0]),
                record("also-mid", "also mid", vec![0.0, -1.0]),
            ])
            .await
            .unwrap();

        let hits = store.query(&[1.0, 0.0], 3).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].text, "near text");
        assert!(hits[0].distance < hits[1].distance);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[tokio::test]
    async fn mismatched_widths_are_a_storage_error() {
        let store = InMemoryPassageStore::new();
        store
            .upsert(vec![record("a", "a", vec![1.0, 0.0])])
            .await
            .unwrap();

        let err = store
            .upsert(vec![record("b", "b", vec![1.0, 0.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Storage(_)));

        let err = store.query(&[1.0], 3).await.unwrap_err();
        assert!(matches!(err, RagError::Storage(_)));
    }

    #[tokio::test]
    async fn clear_empties_the_store_and_reports_the_count() {
        let store = InMemoryPassageStore::new();
        store
            .upsert(vec![
                record("a", "a", vec![1.0, 0.0]),
                record("b", "b", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();
        assert!(!store.is_empty().await.unwrap());

        assert_eq!(store.clear().await.unwrap(), 2);
        assert!(store.is_empty().await.unwrap());
        assert_eq!(store.clear().await.unwrap(), 0);
        assert!(store.get_all_metadata().await.unwrap().is_empty());
    }
}
