/// Backend collaborator interfaces.
///
/// The pipeline core has zero direct dependency on any vendor transport;
/// the search index and the completion service are reached only through
/// these traits. This is the seam where test doubles are substituted.
pub mod azure;
pub mod mock;
pub mod openai;

use async_trait::async_trait;
use thiserror::Error;

use crate::documents::IndexedChunk;

/// Errors from the external search and generation services.
///
/// Never propagated to the pipeline caller as-is; the orchestrator folds
/// them into a degraded `AnswerResult`.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// A stored chunk returned by the retriever, highest score first.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub content: String,
    pub source: String,
    pub chunk_ordinal: usize,
    pub file_type: String,
    pub score: f64,
}

/// Generated text plus the backend's token accounting.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub tokens_used: u32,
}

/// Keyword search over the managed index.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return up to `top_k` hits ordered by descending relevance score.
    /// Zero matches is an empty vec, not an error.
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>, BackendError>;
}

/// Text completion service.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<Completion, BackendError>;
}

/// Chunk upload into the managed index.
#[async_trait]
pub trait Indexer: Send + Sync {
    /// Returns the number of accepted chunks; partial acceptance is
    /// surfaced as a count, not all-or-nothing.
    async fn upload(&self, chunks: &[IndexedChunk]) -> Result<usize, BackendError>;
}
