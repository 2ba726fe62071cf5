//! Full-text search index client.
//!
//! Indexing is best effort: services log failures and carry on, so the
//! index can lag the primary store.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CloudError;

const SERVICE: &str = "search";

/// Document shape sent to the search service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: String,
    pub owner_id: String,
    /// Entity kind, e.g. `"track"`.
    pub kind: String,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub visibility: String,
    pub created_at: DateTime<Utc>,
}

/// Result of a bulk indexing call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkIndexOutcome {
    pub indexed: usize,
    #[serde(default)]
    pub failed: Vec<String>,
}

#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn index(&self, doc: &SearchDocument) -> Result<(), CloudError>;

    async fn delete(&self, id: &str) -> Result<(), CloudError>;

    async fn bulk_index(&self, docs: &[SearchDocument]) -> Result<BulkIndexOutcome, CloudError>;
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// JSON-over-HTTP client for the search service.
pub struct HttpSearchClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSearchClient {
    /// * `base_url` - e.g. `http://localhost:8081`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Reuse an existing [`reqwest::Client`] (shared connection pool).
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, CloudError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(CloudError::Api {
            service: SERVICE,
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl SearchIndex for HttpSearchClient {
    async fn index(&self, doc: &SearchDocument) -> Result<(), CloudError> {
        let response = self
            .client
            .put(format!("{}/documents/{}", self.base_url, doc.id))
            .json(doc)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), CloudError> {
        let response = self
            .client
            .delete(format!("{}/documents/{id}", self.base_url))
            .send()
            .await?;
        // Deleting a document the index never saw is not an error.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check(response).await?;
        Ok(())
    }

    async fn bulk_index(&self, docs: &[SearchDocument]) -> Result<BulkIndexOutcome, CloudError> {
        if docs.is_empty() {
            return Ok(BulkIndexOutcome::default());
        }
        let response = self
            .client
            .post(format!("{}/documents/_bulk", self.base_url))
            .json(&serde_json::json!({ "documents": docs }))
            .send()
            .await?;
        let outcome = Self::check(response).await?.json().await?;
        Ok(outcome)
    }
}

// ---------------------------------------------------------------------------
// In-memory double
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct SearchState {
    docs: BTreeMap<String, SearchDocument>,
    failing: bool,
}

#[derive(Debug, Default)]
pub struct MemorySearchIndex {
    state: Mutex<SearchState>,
}

impl MemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail, simulating an unavailable service.
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    pub fn document(&self, id: &str) -> Option<SearchDocument> {
        self.lock().docs.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().docs.is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SearchState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn unavailable() -> CloudError {
        CloudError::Api {
            service: SERVICE,
            status: 503,
            body: "search unavailable".into(),
        }
    }
}

#[async_trait]
impl SearchIndex for MemorySearchIndex {
    async fn index(&self, doc: &SearchDocument) -> Result<(), CloudError> {
        let mut state = self.lock();
        if state.failing {
            return Err(Self::unavailable());
        }
        state.docs.insert(doc.id.clone(), doc.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), CloudError> {
        let mut state = self.lock();
        if state.failing {
            return Err(Self::unavailable());
        }
        state.docs.remove(id);
        Ok(())
    }

    async fn bulk_index(&self, docs: &[SearchDocument]) -> Result<BulkIndexOutcome, CloudError> {
        let mut state = self.lock();
        if state.failing {
            return Err(Self::unavailable());
        }
        for doc in docs {
            state.docs.insert(doc.id.clone(), doc.clone());
        }
        Ok(BulkIndexOutcome {
            indexed: docs.len(),
            failed: Vec::new(),
        })
    }
}
