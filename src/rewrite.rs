//! Rewrites follow-up questions into standalone ones using bounded
//! conversational history.

use crate::generation::{CompletionParams, CompletionRequest, FAST_MODEL, GenerationProvider};
use crate::types::RagError;

/// At most this many of the most recent history entries feed the rewrite.
pub const MAX_HISTORY: usize = 5;

/// Rewrites `query` into a standalone question using prior user utterances.
///
/// With empty history the query is returned unchanged and no service call is
/// made; that keeps first-turn behavior deterministic and free. A failed
/// rewrite propagates: falling back to the unrewritten query would silently
/// change retrieval behavior.
pub async fn rewrite_query(
    provider: &dyn GenerationProvider,
    query: &str,
    history: &[String],
) -> Result<String, RagError> {
    if history.is_empty() {
        return Ok(query.to_string());
    }

    let start = history.len().saturating_sub(MAX_HISTORY);
    let formatted_history = history[start..].join("\n");

    let user_prompt = format!(
        "Rewrite the user's question to be standalone and clear.\n\n\
         Conversation history:\n{formatted_history}\n\n\
         Current question:\n{query}\n\n\
         Standalone rewritten question:"
    );

    let rewritten = provider
        .complete(CompletionRequest {
            system_prompt: None,
            user_prompt,
            params: CompletionParams {
                model: FAST_MODEL.to_string(),
                temperature: 0.0,
                top_p: 1.0,
                max_tokens: 1024,
            },
        })
        .await?;

    Ok(rewritten
        .trim()
        .trim_matches('"')
        .trim_matches('\'')
        .to_string())
}
