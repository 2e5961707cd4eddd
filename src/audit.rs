/// Audit trail for Q&A interactions.
use tracing::info;

/// Receives every completed Q&A interaction.
///
/// The pipeline invokes this after producing a result; where the log goes
/// (tracing, file, external sink) is the implementation's concern.
pub trait AuditSink: Send + Sync {
    fn record(&self, question: &str, answer: &str, sources: &[String]);
}

/// Default sink: writes audit lines to the `audit` tracing target.
pub struct TracingAudit;

impl AuditSink for TracingAudit {
    fn record(&self, question: &str, answer: &str, sources: &[String]) {
        let q: String = question.chars().take(100).collect();
        let a: String = answer.chars().take(100).collect();

        if sources.is_empty() {
            info!(target: "audit", "QA_LOG - Q: {q}... | A: {a}...");
        } else {
            info!(target: "audit", "QA_LOG - Q: {q}... | A: {a}... | Sources: {sources:?}");
        }
    }
}

/// Sink that drops everything, for callers that opt out of auditing.
pub struct NullAudit;

impl AuditSink for NullAudit {
    fn record(&self, _question: &str, _answer: &str, _sources: &[String]) {}
}
