//! Remote search service adapter
//!
//! Wire format:
//!
//! ```text
//! POST {endpoint}   {"query": "...", "k": 10}
//! 200               {"results": [{"content": "...", "source_id": "...", "page": 0}]}
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::domain::{DomainError, PassageLocation, RetrievalOrigin, RetrievalSource, RetrievedPassage};
use crate::infrastructure::llm::HttpClientTrait;

/// Retrieval source backed by an HTTP search endpoint (usually a vector index)
#[derive(Debug)]
pub struct HttpSearchSource<C: HttpClientTrait> {
    client: C,
    name: String,
    endpoint: String,
    origin: RetrievalOrigin,
    auth_header: Option<String>,
}

impl<C: HttpClientTrait> HttpSearchSource<C> {
    pub fn new(client: C, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            name: "semantic".to_string(),
            endpoint: endpoint.into(),
            origin: RetrievalOrigin::Semantic,
            auth_header: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_origin(mut self, origin: RetrievalOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_api_key(mut self, api_key: impl AsRef<str>) -> Self {
        self.auth_header = Some(format!("Bearer {}", api_key.as_ref()));
        self
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        let mut headers = vec![("Content-Type", "application/json")];
        if let Some(ref auth) = self.auth_header {
            headers.push(("Authorization", auth.as_str()));
        }
        headers
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    content: String,
    source_id: String,
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    offset: Option<u64>,
}

impl From<SearchHit> for RetrievedPassage {
    fn from(hit: SearchHit) -> Self {
        let passage = RetrievedPassage::new(hit.content, hit.source_id);
        if hit.page.is_none() && hit.offset.is_none() {
            return passage;
        }
        passage.with_location(PassageLocation {
            page: hit.page,
            offset: hit.offset,
        })
    }
}

#[async_trait]
impl<C: HttpClientTrait> RetrievalSource for HttpSearchSource<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn origin(&self) -> RetrievalOrigin {
        self.origin
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>, DomainError> {
        let body = serde_json::json!({ "query": query, "k": k });

        let response = self.client.post_json(&self.endpoint, self.headers(), &body).await?;

        let parsed: SearchResponse = serde_json::from_value(response).map_err(|e| {
            DomainError::provider(self.name.clone(), format!("Invalid search response: {}", e))
        })?;

        debug!(source = %self.name, hits = parsed.results.len(), "Remote search complete");

        Ok(parsed.results.into_iter().take(k).map(RetrievedPassage::from).collect())
    }
}
