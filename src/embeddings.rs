//! Embedding providers for passages and queries.
//!
//! The hosted inference endpoint is shape-ambiguous: depending on the
//! deployed pipeline it returns either one pooled vector per input or a
//! token-level matrix. [`RawEmbedding`] keeps that branching explicit and
//! mean-pools the token-level case so callers always see one fixed-length
//! vector per text.

use std::hash::{DefaultHasher, Hash, Hasher};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::RagError;

/// Default hosted inference endpoint for the embedding model.
pub const DEFAULT_EMBEDDING_ENDPOINT: &str =
    "https://router.huggingface.co/hf-inference/models/BAAI/bge-base-en-v1.5";

/// Converts batches of texts into fixed-length vectors, one per input, in
/// input order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a [String],
    options: EmbedOptions,
}

#[derive(Serialize)]
struct EmbedOptions {
    /// The endpoint blocks until the model is warm; the client issues one
    /// logical call and never retries locally.
    wait_for_model: bool,
}

/// Per-item response shape from the inference endpoint.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEmbedding {
    /// Already pooled: `[dims]`.
    Pooled(Vec<f32>),
    /// Token-level: `[tokens][dims]`, pooled here by per-dimension mean.
    TokenLevel(Vec<Vec<f32>>),
}

impl RawEmbedding {
    fn into_pooled(self) -> Result<Vec<f32>, RagError> {
        match self {
            RawEmbedding::Pooled(vector) if vector.is_empty() => Err(RagError::Embedding(
                "endpoint returned an empty embedding".to_string(),
            )),
            RawEmbedding::Pooled(vector) => Ok(vector),
            RawEmbedding::TokenLevel(rows) => mean_pool(&rows),
        }
    }
}

fn mean_pool(rows: &[Vec<f32>]) -> Result<Vec<f32>, RagError> {
    let Some(first) = rows.first() else {
        return Err(RagError::Embedding(
            "endpoint returned zero token vectors".to_string(),
        ));
    };
    let dims = first.len();
    let mut pooled = vec![0f32; dims];
    for row in rows {
        if row.len() != dims {
            return Err(RagError::Embedding(format!(
                "ragged token vectors: expected {dims} dims, got {}",
                row.len()
            )));
        }
        for (slot, value) in pooled.iter_mut().zip(row) {
            *slot += value;
        }
    }
    let count = rows.len() as f32;
    for slot in &mut pooled {
        *slot /= count;
    }
    Ok(pooled)
}

/// Client for a hosted text-embedding endpoint.
pub struct HfEmbeddingClient {
    client: reqwest::Client,
    endpoint: String,
    api_token: String,
}

impl HfEmbeddingClient {
    pub fn new(client: reqwest::Client, api_token: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: DEFAULT_EMBEDDING_ENDPOINT.to_string(),
            api_token: api_token.into(),
        }
    }

    /// Builds a client from [`Credentials`](crate::config::Credentials)-style
    /// environment state; a missing token is a configuration error.
    pub fn from_env(client: reqwest::Client) -> Result<Self, RagError> {
        let token = crate::config::Credentials::from_env()
            .hf_api_token
            .ok_or_else(|| RagError::Embedding("HF_API_TOKEN not set".to_string()))?;
        Ok(Self::new(client, token))
    }

    /// Overrides the inference endpoint (used by tests and self-hosted
    /// deployments).
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl EmbeddingProvider for HfEmbeddingClient {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .json(&EmbedRequest {
                inputs: texts,
                options: EmbedOptions {
                    wait_for_model: true,
                },
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Embedding(format!(
                "inference endpoint returned {status}: {body}"
            )));
        }

        let raw: Vec<RawEmbedding> = response
            .json()
            .await
            .map_err(|err| RagError::Embedding(format!("unexpected response shape: {err}")))?;

        if raw.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "requested {} embeddings, endpoint returned {}",
                texts.len(),
                raw.len()
            )));
        }

        raw.into_iter().map(RawEmbedding::into_pooled).collect()
    }
}

/// Deterministic offline embedding provider for tests and demos.
///
/// Vectors are derived from a hash of the text, so identical inputs always
/// map to identical vectors and distinct inputs almost always differ.
#[derive(Clone, Debug)]
pub struct MockEmbeddingProvider {
    dims: usize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self { dims: 16 }
    }

    #[must_use]
    pub fn with_dims(mut self, dims: usize) -> Self {
        self.dims = dims.max(1);
        self
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        (0..self.dims)
            .map(|dim| {
                let mut hasher = DefaultHasher::new();
                text.hash(&mut hasher);
                dim.hash(&mut hasher);
                let bucket = (hasher.finish() % 2000) as f32;
                bucket / 1000.0 - 1.0
            })
            .collect()
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pooled_embeddings_pass_through() {
        let raw = RawEmbedding::Pooled(vec![0.5, -0.25, 1.0]);
        assert_eq!(raw.into_pooled().unwrap(), vec![0.5, -0.25, 1.0]);
    }

    #[test]
    fn token_level_embeddings_are_mean_pooled() {
        let raw = RawEmbedding::TokenLevel(vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]);
        assert_eq!(raw.into_pooled().unwrap(), vec![3.0, 4.0]);
    }

    #[test]
    fn pooled_and_token_level_yield_the_same_width() {
        let pooled = RawEmbedding::Pooled(vec![0.1, 0.2]).into_pooled().unwrap();
        let token_level = RawEmbedding::TokenLevel(vec![vec![0.3, 0.4], vec![0.5, 0.6]])
            .into_pooled()
            .unwrap();
        assert_eq!(pooled.len(), token_level.len());
    }

    #[test]
    fn ragged_token_vectors_are_rejected() {
        let raw = RawEmbedding::TokenLevel(vec![vec![1.0, 2.0], vec![3.0]]);
        assert!(matches!(raw.into_pooled(), Err(RagError::Embedding(_))));
    }

    #[test]
    fn shape_detection_is_per_item() {
        let body = r#"[[0.1, 0.2], [[0.3, 0.4], [0.5, 0.6]]]"#;
        let raw: Vec<RawEmbedding> = serde_json::from_str(body).unwrap();
        let pooled: Vec<Vec<f32>> = raw
            .into_iter()
            .map(|item| item.into_pooled().unwrap())
            .collect();
        assert_eq!(pooled[0], vec![0.1, 0.2]);
        assert_eq!(pooled[1], vec![0.4, 0.5]);
    }

    #[tokio::test]
    async fn mock_provider_is_deterministic() {
        let provider = MockEmbeddingProvider::new();
        let inputs = vec!["hello".to_string(), "world".to_string(), "hello".to_string()];
        let first = provider.embed_batch(&inputs).await.unwrap();
        let second = provider.embed_batch(&inputs).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0], first[2]);
        assert_ne!(first[0], first[1]);
        assert!(first.iter().all(|vector| vector.len() == 16));
    }
}
