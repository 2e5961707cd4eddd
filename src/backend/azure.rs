/// Azure AI Search REST client.
///
/// Implements the `Retriever` and `Indexer` seams over the service's JSON
/// API, plus the index-management calls used by the CLI. The pipeline never
/// sees this type directly, only the traits.
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::{BackendError, Indexer, Retriever, SearchHit};
use crate::config::SearchConfig;
use crate::documents::IndexedChunk;

const API_VERSION: &str = "2023-11-01";

pub struct AzureSearchClient {
    endpoint: String,
    api_key: String,
    index_name: String,
    client: reqwest::Client,
}

impl AzureSearchClient {
    #[must_use]
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            index_name: config.index_name.clone(),
            client: reqwest::Client::new(),
        }
    }

    #[must_use]
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}?api-version={API_VERSION}", self.endpoint)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, BackendError> {
        request
            .header("api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))
    }

    /// Map a non-success response to the backend error taxonomy.
    async fn fail_status(response: reqwest::Response) -> BackendError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status.as_u16() == 429 {
            BackendError::RateLimited(format!("search backend throttled: {body}"))
        } else {
            BackendError::Unavailable(format!("HTTP {status}: {body}"))
        }
    }

    /// Create or update the search index schema. Idempotent.
    pub async fn create_index(&self) -> Result<(), BackendError> {
        let schema = json!({
            "name": self.index_name,
            "fields": [
                {"name": "id", "type": "Edm.String", "key": true, "filterable": true},
                {"name": "content", "type": "Edm.String", "searchable": true, "analyzer": "en.microsoft"},
                {"name": "source", "type": "Edm.String", "filterable": true, "facetable": true},
                {"name": "chunk_ordinal", "type": "Edm.Int32", "filterable": true},
                {"name": "upload_date", "type": "Edm.DateTimeOffset", "filterable": true, "sortable": true},
                {"name": "file_type", "type": "Edm.String", "filterable": true, "facetable": true},
            ],
        });

        let url = self.url(&format!("indexes/{}", self.index_name));
        let response = self.send(self.client.put(url).json(&schema)).await?;

        if !response.status().is_success() {
            return Err(Self::fail_status(response).await);
        }

        info!("Index '{}' created/updated successfully", self.index_name);
        Ok(())
    }

    pub async fn index_exists(&self) -> Result<bool, BackendError> {
        let url = self.url(&format!("indexes/{}", self.index_name));
        let response = self.send(self.client.get(url)).await?;

        if response.status().as_u16() == 404 {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(Self::fail_status(response).await);
        }
        Ok(true)
    }

    /// Total number of documents in the index.
    pub async fn document_count(&self) -> Result<u64, BackendError> {
        let url = self.url(&format!("indexes/{}/docs/$count", self.index_name));
        let response = self.send(self.client.get(url)).await?;

        if !response.status().is_success() {
            return Err(Self::fail_status(response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))?;

        // The count endpoint returns plain text, possibly BOM-prefixed
        body.trim_start_matches('\u{feff}')
            .trim()
            .parse::<u64>()
            .map_err(|e| BackendError::Malformed(format!("unparseable count '{body}': {e}")))
    }

    /// Delete a single document from the index by id.
    pub async fn delete_document(&self, doc_id: &str) -> Result<(), BackendError> {
        let body = json!({
            "value": [{"@search.action": "delete", "id": doc_id}],
        });

        let url = self.url(&format!("indexes/{}/docs/index", self.index_name));
        let response = self.send(self.client.post(url).json(&body)).await?;

        if !response.status().is_success() {
            return Err(Self::fail_status(response).await);
        }

        info!("Deleted document: {doc_id}");
        Ok(())
    }
}

#[async_trait]
impl Retriever for AzureSearchClient {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>, BackendError> {
        debug!("Searching for: '{query}' (top {top_k})");

        let body = json!({
            "search": query,
            "top": top_k,
            "select": "content,source,chunk_ordinal,file_type",
        });

        let url = self.url(&format!("indexes/{}/docs/search", self.index_name));
        let response = self.send(self.client.post(url).json(&body)).await?;

        if !response.status().is_success() {
            return Err(Self::fail_status(response).await);
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))?;

        let values = payload
            .get("value")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                BackendError::Malformed("missing 'value' array in search response".to_string())
            })?;

        let hits: Vec<SearchHit> = values
            .iter()
            .map(|v| SearchHit {
                content: v
                    .get("content")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                source: v
                    .get("source")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
                chunk_ordinal: v
                    .get("chunk_ordinal")
                    .and_then(Value::as_u64)
                    .unwrap_or(0) as usize,
                file_type: v
                    .get("file_type")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
                score: v
                    .get("@search.score")
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0),
            })
            .collect();

        info!("Found {} relevant documents", hits.len());
        Ok(hits)
    }
}

#[async_trait]
impl Indexer for AzureSearchClient {
    async fn upload(&self, chunks: &[IndexedChunk]) -> Result<usize, BackendError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let mut actions = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let mut value = serde_json::to_value(chunk)
                .map_err(|e| BackendError::Malformed(e.to_string()))?;
            value["@search.action"] = json!("mergeOrUpload");
            actions.push(value);
        }

        let url = self.url(&format!("indexes/{}/docs/index", self.index_name));
        let response = self
            .send(self.client.post(url).json(&json!({"value": actions})))
            .await?;

        if !response.status().is_success() {
            return Err(Self::fail_status(response).await);
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))?;

        let accepted = payload
            .get("value")
            .and_then(Value::as_array)
            .map(|rows| {
                rows.iter()
                    .filter(|r| r.get("status").and_then(Value::as_bool).unwrap_or(false))
                    .count()
            })
            .ok_or_else(|| {
                BackendError::Malformed("missing 'value' array in upload response".to_string())
            })?;

        info!("Uploaded {accepted}/{} chunks", chunks.len());
        Ok(accepted)
    }
}
