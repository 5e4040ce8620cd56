//! Text-generation providers.
//!
//! All prompting components (summarizer, rewriter, answer generator) go
//! through the [`GenerationProvider`] trait, so tests and demos can swap in
//! the [`ScriptedGenerationProvider`] and assert on exactly what was sent.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::types::RagError;

/// Default chat-completions endpoint (Groq's OpenAI-compatible API).
pub const DEFAULT_COMPLETIONS_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Small instruction-following model used for rewriting and summarizing.
pub const FAST_MODEL: &str = "llama-3.1-8b-instant";

/// Larger model used for grounded answer generation.
pub const ANSWER_MODEL: &str = "openai/gpt-oss-20b";

/// Sampling parameters for one completion call. Streaming is always off.
#[derive(Clone, Debug)]
pub struct CompletionParams {
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

/// One completion request: an optional system prompt, a user prompt, and
/// sampling parameters.
#[derive(Clone, Debug)]
pub struct CompletionRequest {
    pub system_prompt: Option<String>,
    pub user_prompt: String,
    pub params: CompletionParams,
}

/// A black-box text-completion service.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, RagError>;
}

#[derive(Serialize)]
struct ChatRequestBody<'a> {
    model: &'a str,
    messages: Vec<ChatRequestMessage<'a>>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatRequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponseBody {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Client for an OpenAI-compatible chat-completions endpoint.
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl ChatCompletionsClient {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: DEFAULT_COMPLETIONS_ENDPOINT.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Builds a client from the process environment; a missing key is a
    /// configuration error.
    pub fn from_env(client: reqwest::Client) -> Result<Self, RagError> {
        let key = crate::config::Credentials::from_env()
            .groq_api_key
            .ok_or_else(|| RagError::Generation("GROQ_API_KEY not set".to_string()))?;
        Ok(Self::new(client, key))
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl GenerationProvider for ChatCompletionsClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, RagError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system_prompt.as_deref() {
            messages.push(ChatRequestMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatRequestMessage {
            role: "user",
            content: &request.user_prompt,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&ChatRequestBody {
                model: &request.params.model,
                messages,
                temperature: request.params.temperature,
                top_p: request.params.top_p,
                max_tokens: request.params.max_tokens,
                stream: false,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Generation(format!(
                "completions endpoint returned {status}: {body}"
            )));
        }

        let body: ChatResponseBody = response
            .json()
            .await
            .map_err(|err| RagError::Generation(format!("unexpected response shape: {err}")))?;

        let reply = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| RagError::Generation("completions response had no choices".to_string()))?;

        Ok(reply.trim().to_string())
    }
}

/// In-process generation double that replays queued replies and records every
/// request it receives.
#[derive(Default)]
pub struct ScriptedGenerationProvider {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<CompletionRequest>>,
    default_reply: Option<String>,
}

impl ScriptedGenerationProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply returned once the queued replies run out. Without one, an
    /// exhausted queue is a [`RagError::Generation`].
    #[must_use]
    pub fn with_default_reply(mut self, reply: impl Into<String>) -> Self {
        self.default_reply = Some(reply.into());
        self
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().push_back(reply.into());
    }

    /// Requests seen so far, in call order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl GenerationProvider for ScriptedGenerationProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<String, RagError> {
        self.requests.lock().push(request);
        if let Some(reply) = self.replies.lock().pop_front() {
            return Ok(reply);
        }
        self.default_reply
            .clone()
            .ok_or_else(|| RagError::Generation("scripted provider exhausted".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_provider_replays_in_order_then_falls_back() {
        let provider = ScriptedGenerationProvider::new().with_default_reply("fallback");
        provider.push_reply("first");
        provider.push_reply("second");

        let request = CompletionRequest {
            system_prompt: None,
            user_prompt: "q".to_string(),
            params: CompletionParams {
                model: FAST_MODEL.to_string(),
                temperature: 0.0,
                top_p: 1.0,
                max_tokens: 16,
            },
        };

        assert_eq!(provider.complete(request.clone()).await.unwrap(), "first");
        assert_eq!(provider.complete(request.clone()).await.unwrap(), "second");
        assert_eq!(provider.complete(request).await.unwrap(), "fallback");
        assert_eq!(provider.call_count(), 3);
    }
}
