//! Per-chunk abstractive summarization at ingest time.

use crate::generation::{CompletionParams, CompletionRequest, FAST_MODEL, GenerationProvider};
use crate::types::RagError;

/// Produces a 1-3 sentence summary of one chunk.
///
/// The prompt carries only the chunk text plus an explicit instruction not to
/// add information, at temperature 0 for reproducibility. A failure aborts
/// the whole ingest for that chunk's document; there is no partial-summary
/// fallback.
pub async fn summarize_chunk(
    provider: &dyn GenerationProvider,
    chunk_text: &str,
) -> Result<String, RagError> {
    let user_prompt = format!(
        "Summarize the following text in 1\u{2013}3 concise sentences.\n\
         Do not add extra information.\n\n\
         Text:\n{chunk_text}"
    );

    let summary = provider
        .complete(CompletionRequest {
            system_prompt: None,
            user_prompt,
            params: CompletionParams {
                model: FAST_MODEL.to_string(),
                temperature: 0.0,
                top_p: 1.0,
                max_tokens: 3072,
            },
        })
        .await?;

    Ok(summary.trim().to_string())
}
