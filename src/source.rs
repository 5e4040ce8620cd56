//! Document sources: where the single ingested document comes from.
//!
//! The fetch side is deliberately thin glue around an external service; the
//! pipeline only depends on the [`DocumentSource`] trait.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use url::Url;

use crate::types::RagError;

/// Fetches the plain text of a document by its id.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self, document_id: &str) -> Result<String, RagError>;
}

fn doc_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"/d/([A-Za-z0-9_-]+)").expect("doc id pattern is valid"))
}

/// Extracts the document id from a Google Docs share URL.
pub fn extract_doc_id(doc_url: &str) -> Result<String, RagError> {
    doc_id_pattern()
        .captures(doc_url)
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str().to_string())
        .ok_or_else(|| RagError::InvalidDocument(format!("not a Google Docs URL: {doc_url}")))
}

/// Fetches the public plain-text export of a Google Doc.
///
/// Only publicly shareable documents are reachable this way; anything else
/// surfaces as [`RagError::NotAccessible`].
pub struct GoogleDocSource {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleDocSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: "https://docs.google.com/document/d".to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl DocumentSource for GoogleDocSource {
    async fn fetch(&self, document_id: &str) -> Result<String, RagError> {
        let url = Url::parse(&format!(
            "{}/{}/export?format=txt",
            self.base_url.trim_end_matches('/'),
            document_id
        ))
        .map_err(|err| RagError::InvalidDocument(err.to_string()))?;

        tracing::debug!(%url, "fetching document export");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RagError::NotAccessible(format!(
                "document export returned {status}"
            )));
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Err(RagError::EmptyDocument);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_id_from_share_url() {
        let id = extract_doc_id(
            "https://docs.google.com/document/d/1AbC-xyz_789/edit?usp=sharing",
        )
        .unwrap();
        assert_eq!(id, "1AbC-xyz_789");
    }

    #[test]
    fn rejects_urls_without_an_id() {
        let err = extract_doc_id("https://example.com/whatever").unwrap_err();
        assert!(matches!(err, RagError::InvalidDocument(_)));
    }
}
