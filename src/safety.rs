/// Content safety gate.
///
/// Classifies incoming questions before any retrieval or generation happens,
/// sanitizes generated answers, and applies the groundedness heuristic.
use tracing::warn;

use crate::config::SafetyConfig;

/// Hedging phrases that suggest the model is guessing instead of quoting
/// the retrieved context. A stylistic proxy, not an entailment check.
const HEDGING_PHRASES: &[&str] = &[
    "i think",
    "probably",
    "maybe",
    "i'm not sure",
    "in my opinion",
    "generally speaking",
];

/// Ellipsis marker appended when an answer is truncated.
const TRUNCATION_MARKER: &str = "...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionVerdict {
    pub safe: bool,
    pub reason: String,
}

impl QuestionVerdict {
    fn safe(reason: &str) -> Self {
        Self {
            safe: true,
            reason: reason.to_string(),
        }
    }

    fn unsafe_because(reason: &str) -> Self {
        Self {
            safe: false,
            reason: reason.to_string(),
        }
    }
}

/// Pluggable content classification strategy.
///
/// The default is a case-insensitive substring scan; a stronger classifier
/// can be swapped in without touching the pipeline contract.
pub trait QuestionClassifier: Send + Sync {
    /// Returns the rejection reason when the question must be blocked.
    fn classify(&self, question: &str) -> Option<String>;
}

/// Substring scan over configured keyword and phrase-pattern lists.
pub struct KeywordClassifier {
    keywords: Vec<String>,
    patterns: Vec<String>,
}

impl KeywordClassifier {
    pub fn new(keywords: &[String], patterns: &[String]) -> Self {
        // Lowercase once at construction; matching is case-insensitive
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            patterns: patterns.iter().map(|p| p.to_lowercase()).collect(),
        }
    }
}

impl QuestionClassifier for KeywordClassifier {
    fn classify(&self, question: &str) -> Option<String> {
        let question_lower = question.to_lowercase();

        for keyword in &self.keywords {
            if question_lower.contains(keyword.as_str()) {
                warn!("Blocked keyword detected: {keyword}");
                return Some("Question contains inappropriate content".to_string());
            }
        }

        for pattern in &self.patterns {
            if question_lower.contains(pattern.as_str()) {
                warn!("Blocked pattern detected: {pattern}");
                return Some("Question contains inappropriate pattern".to_string());
            }
        }

        None
    }
}

/// Pre-retrieval question gate and post-generation answer sanitizer.
pub struct SafetyGate {
    enabled: bool,
    max_question_length: usize,
    max_answer_length: usize,
    classifier: Box<dyn QuestionClassifier>,
}

impl SafetyGate {
    pub fn new(config: &SafetyConfig) -> Self {
        let classifier = Box::new(KeywordClassifier::new(
            &config.blocked_keywords,
            &config.blocked_patterns,
        ));
        Self::with_classifier(config, classifier)
    }

    pub fn with_classifier(config: &SafetyConfig, classifier: Box<dyn QuestionClassifier>) -> Self {
        Self {
            enabled: config.content_filter,
            max_question_length: config.max_question_length,
            max_answer_length: config.max_answer_length,
            classifier,
        }
    }

    /// Check whether a question is safe to process.
    ///
    /// Policy is evaluated in order, first match wins. Total: every input
    /// produces exactly one verdict.
    pub fn check_question(&self, question: &str) -> QuestionVerdict {
        if !self.enabled {
            return QuestionVerdict::safe("Filter disabled");
        }

        if question.chars().count() > self.max_question_length {
            warn!("Question too long: {} chars", question.chars().count());
            return QuestionVerdict::unsafe_because("Question exceeds maximum length");
        }

        if question.trim().is_empty() {
            return QuestionVerdict::unsafe_because("Question is empty");
        }

        if let Some(reason) = self.classifier.classify(question) {
            return QuestionVerdict::unsafe_because(&reason);
        }

        QuestionVerdict::safe("Safe")
    }

    /// Clean up a generated answer before showing it to the user.
    ///
    /// Strips code-fence markers that could leak prompt formatting, bounds
    /// the length, and trims surrounding whitespace. Idempotent.
    pub fn sanitize_answer(&self, answer: &str) -> String {
        let answer = answer.replace("```", "");
        let answer = answer.trim();

        if answer.chars().count() > self.max_answer_length {
            let truncated: String = answer.chars().take(self.max_answer_length).collect();
            return truncated + TRUNCATION_MARKER;
        }

        answer.to_string()
    }

    /// Heuristic check that the answer quotes the documents rather than
    /// hedging a guess. False positives/negatives are expected.
    pub fn is_grounded(&self, answer: &str) -> bool {
        let answer_lower = answer.to_lowercase();

        for phrase in HEDGING_PHRASES {
            if answer_lower.contains(phrase) {
                warn!("Potential hallucination detected: {phrase}");
                return false;
            }
        }

        true
    }
}
