/// Pipeline orchestrator.
///
/// Composes the safety gate, retriever, prompt builder, generator, and
/// post-processing into one request/response cycle. Request-scoped and
/// stateless between requests; concurrent `ask` calls need no coordination.
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::audit::{AuditSink, TracingAudit};
use crate::backend::{Generator, Retriever};
use crate::config::Config;
use crate::prompt;
use crate::safety::SafetyGate;

/// Fixed answer when retrieval produces no hits. A normal outcome, not a failure.
pub const NOT_FOUND_ANSWER: &str =
    "I could not find any relevant information in the documents to answer your question.";

/// Fixed answer when a backend call fails.
pub const FAILURE_ANSWER: &str =
    "I encountered an error while processing your question. Please try again.";

/// The unit returned for every question, including all failure paths.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AnswerResult {
    pub answer: String,
    pub safe: bool,
    pub grounded: bool,
    pub error: Option<String>,
    pub tokens_used: Option<u32>,
    /// Distinct source filenames of the retrieved chunks, in rank order.
    pub sources: Vec<String>,
}

impl AnswerResult {
    fn rejected(reason: String) -> Self {
        Self {
            answer: format!("I cannot process this question: {reason}"),
            safe: false,
            grounded: false,
            error: Some(reason),
            tokens_used: None,
            sources: Vec::new(),
        }
    }

    fn not_found() -> Self {
        Self {
            answer: NOT_FOUND_ANSWER.to_string(),
            safe: true,
            grounded: false,
            error: None,
            tokens_used: None,
            sources: Vec::new(),
        }
    }

    fn degraded(detail: String) -> Self {
        Self {
            answer: FAILURE_ANSWER.to_string(),
            safe: true,
            grounded: false,
            error: Some(detail),
            tokens_used: None,
            sources: Vec::new(),
        }
    }
}

pub struct Pipeline {
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn Generator>,
    gate: SafetyGate,
    audit: Arc<dyn AuditSink>,
    top_k: usize,
    temperature: f32,
    max_tokens: u32,
}

impl Pipeline {
    pub fn new(
        config: &Config,
        retriever: Arc<dyn Retriever>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self::with_audit(config, retriever, generator, Arc::new(TracingAudit))
    }

    pub fn with_audit(
        config: &Config,
        retriever: Arc<dyn Retriever>,
        generator: Arc<dyn Generator>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            retriever,
            generator,
            gate: SafetyGate::new(&config.safety),
            audit,
            top_k: config.search.top_k,
            temperature: config.ai.temperature,
            max_tokens: config.ai.max_tokens,
        }
    }

    /// Answer a question strictly from indexed documents.
    ///
    /// Never fails: every input and backend outcome maps to an
    /// `AnswerResult`. Rejected questions incur zero backend calls.
    pub async fn ask(&self, question: &str) -> AnswerResult {
        let result = self.answer(question).await;
        self.audit.record(question, &result.answer, &result.sources);
        result
    }

    async fn answer(&self, question: &str) -> AnswerResult {
        // 1. Safety gate: rejected questions never reach a backend
        let verdict = self.gate.check_question(question);
        if !verdict.safe {
            warn!("Unsafe question blocked: {}", verdict.reason);
            return AnswerResult::rejected(verdict.reason);
        }

        // 2. Retrieve
        let hits = match self.retriever.search(question, self.top_k).await {
            Ok(hits) => hits,
            Err(e) => {
                error!("Error searching documents: {e}");
                return AnswerResult::degraded(e.to_string());
            }
        };

        if hits.is_empty() {
            info!("No relevant documents found");
            return AnswerResult::not_found();
        }

        // 3. Context in rank order; distinct sources for citation
        let context = hits
            .iter()
            .map(|h| h.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut sources: Vec<String> = Vec::new();
        for hit in &hits {
            if !sources.contains(&hit.source) {
                sources.push(hit.source.clone());
            }
        }

        // 4-5. Prompt + generation
        let prompt = prompt::build_prompt(&context, question);

        debug!("Generating answer for question: {question:.50}...");
        let completion = match self
            .generator
            .complete(&prompt, self.max_tokens, self.temperature)
            .await
        {
            Ok(completion) => completion,
            Err(e) => {
                error!("Error generating answer: {e}");
                let mut result = AnswerResult::degraded(e.to_string());
                result.sources = sources;
                return result;
            }
        };

        // 6-7. Post-process
        let answer = self.gate.sanitize_answer(&completion.text);
        let grounded = self.gate.is_grounded(&answer);
        info!("Answer generated successfully (grounded: {grounded})");

        AnswerResult {
            answer,
            safe: true,
            grounded,
            error: None,
            tokens_used: Some(completion.tokens_used),
            sources,
        }
    }
}
