//! Pipeline configuration and environment credential loading.

use std::env;

use crate::retrieval::{MAX_DISTANCE_THRESHOLD, TOP_K};

/// Knobs for the chunking pass.
#[derive(Clone, Debug)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    pub max_chunk_size: usize,
    /// Number of trailing characters duplicated into the next chunk so ideas
    /// spanning a boundary appear whole in at least one chunk.
    pub overlap_size: usize,
    /// Estimated characters per page, used when the document carries no
    /// explicit form-feed page breaks.
    pub chars_per_page: usize,
    /// Section title assigned to text that precedes the first heading.
    pub default_section: String,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 1000,
            overlap_size: 150,
            chars_per_page: 1800,
            default_section: "Introduction".to_string(),
        }
    }
}

/// Knobs for similarity retrieval.
#[derive(Clone, Copy, Debug)]
pub struct RetrievalConfig {
    /// Maximum number of passages returned per query.
    pub top_k: usize,
    /// Results farther than this cosine distance are discarded as irrelevant.
    pub max_distance: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: TOP_K,
            max_distance: MAX_DISTANCE_THRESHOLD,
        }
    }
}

/// Aggregate configuration for a [`RagPipeline`](crate::pipeline::RagPipeline).
#[derive(Clone, Debug, Default)]
pub struct PipelineConfig {
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
}

/// Credentials for the external inference services.
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    /// Bearer token for the embedding inference endpoint (`HF_API_TOKEN`).
    pub hf_api_token: Option<String>,
    /// API key for the chat-completions endpoint (`GROQ_API_KEY`).
    pub groq_api_key: Option<String>,
}

impl Credentials {
    /// Loads credentials from the process environment, honoring a `.env`
    /// file when present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self {
            hf_api_token: env::var("HF_API_TOKEN").ok(),
            groq_api_key: env::var("GROQ_API_KEY").ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retrieval_defaults_match_pipeline_constants() {
        let config = RetrievalConfig::default();
        assert_eq!(config.top_k, 3);
        assert!((config.max_distance - 1.2).abs() < f32::EPSILON);
    }

    #[test]
    fn overlap_smaller_than_chunk_by_default() {
        let config = ChunkingConfig::default();
        assert!(config.overlap_size < config.max_chunk_size);
    }
}
