/// Mock backends for testing.
///
/// Deterministic in-memory doubles with call counters, so tests can assert
/// that rejected questions never reach a backend.
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{BackendError, Completion, Generator, Indexer, Retriever, SearchHit};
use crate::documents::IndexedChunk;

/// Retriever double returning a fixed hit list (or a fixed failure).
#[derive(Default)]
pub struct MockRetriever {
    hits: Vec<SearchHit>,
    fail: Option<String>,
    calls: AtomicUsize,
}

impl MockRetriever {
    #[must_use]
    pub fn with_hits(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            fail: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Number of `search` invocations observed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Retriever for MockRetriever {
    async fn search(&self, _query: &str, top_k: usize) -> Result<Vec<SearchHit>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.fail {
            return Err(BackendError::Unavailable(message.clone()));
        }
        Ok(self.hits.iter().take(top_k).cloned().collect())
    }
}

/// Generator double returning a canned completion (or a fixed failure).
pub struct MockGenerator {
    response: String,
    tokens_used: u32,
    fail: Option<String>,
    calls: AtomicUsize,
}

impl MockGenerator {
    #[must_use]
    pub fn replying(response: &str) -> Self {
        Self {
            response: response.to_string(),
            tokens_used: 42,
            fail: None,
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            response: String::new(),
            tokens_used: 0,
            fail: Some(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `complete` invocations observed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn complete(
        &self,
        _prompt: &str,
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<Completion, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.fail {
            return Err(BackendError::Unavailable(message.clone()));
        }
        Ok(Completion {
            text: self.response.clone(),
            tokens_used: self.tokens_used,
        })
    }
}

/// Indexer double accepting at most `accept_limit` chunks per upload.
#[derive(Default)]
pub struct MockIndexer {
    accept_limit: Option<usize>,
    calls: AtomicUsize,
}

impl MockIndexer {
    /// Simulate partial acceptance by the backend.
    #[must_use]
    pub fn accepting_at_most(limit: usize) -> Self {
        Self {
            accept_limit: Some(limit),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Indexer for MockIndexer {
    async fn upload(&self, chunks: &[IndexedChunk]) -> Result<usize, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let accepted = match self.accept_limit {
            Some(limit) => limit.min(chunks.len()),
            None => chunks.len(),
        };
        Ok(accepted)
    }
}
