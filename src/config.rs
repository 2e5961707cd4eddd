/// Configuration module for DocQA.
///
/// Handles loading, validating, and providing default configuration values.
/// Secrets and endpoints can be overridden from the environment so that a
/// committed config file never has to carry credentials.
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::chunker::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};

// ── Default value functions ──────────────────────────────────────────

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

fn default_index_name() -> String {
    "enterprise-documents".to_string()
}

fn default_top_k() -> usize {
    3
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    500
}

fn default_true() -> bool {
    true
}

fn default_max_question_length() -> usize {
    500
}

fn default_max_answer_length() -> usize {
    2000
}

fn default_blocked_keywords() -> Vec<String> {
    ["hack", "exploit", "bypass", "jailbreak", "bomb", "weapon", "illegal"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

fn default_blocked_patterns() -> Vec<String> {
    ["how to hack", "ways to bypass", "create fake"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

fn default_max_file_size_mb() -> u64 {
    10
}

fn default_allowed_file_types() -> Vec<String> {
    vec!["txt".to_string(), "pdf".to_string()]
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Words per chunk when splitting documents for indexing.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Words shared between consecutive chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub ai: AiConfig,

    #[serde(default)]
    pub safety: SafetyConfig,

    #[serde(default)]
    pub upload: UploadConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SearchConfig {
    /// Search service endpoint, e.g. `https://<name>.search.windows.net`.
    #[serde(default)]
    pub endpoint: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_index_name")]
    pub index_name: String,

    /// Number of highest-scoring hits requested per query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AiConfig {
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// OpenAI-compatible API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Low randomness favors extractive answers over creative completion.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SafetyConfig {
    /// Disabling the filter makes every question pass the gate.
    #[serde(default = "default_true")]
    pub content_filter: bool,

    #[serde(default = "default_max_question_length")]
    pub max_question_length: usize,

    #[serde(default = "default_max_answer_length")]
    pub max_answer_length: usize,

    #[serde(default = "default_blocked_keywords")]
    pub blocked_keywords: Vec<String>,

    #[serde(default = "default_blocked_patterns")]
    pub blocked_patterns: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UploadConfig {
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,

    #[serde(default = "default_allowed_file_types")]
    pub allowed_file_types: Vec<String>,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            search: SearchConfig::default(),
            ai: AiConfig::default(),
            safety: SafetyConfig::default(),
            upload: UploadConfig::default(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            index_name: default_index_name(),
            top_k: default_top_k(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            base_url: default_base_url(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            content_filter: default_true(),
            max_question_length: default_max_question_length(),
            max_answer_length: default_max_answer_length(),
            blocked_keywords: default_blocked_keywords(),
            blocked_patterns: default_blocked_patterns(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: default_max_file_size_mb(),
            allowed_file_types: default_allowed_file_types(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// If `config_path` is empty, defaults to `"config.json"`.
    /// If the file does not exist, returns a default config and optionally
    /// generates a template file.
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            "config.json"
        } else {
            config_path
        };

        if !Path::new(path).exists() {
            info!("{path} not found, using defaults");
            let cfg = Self::default();

            // Generate template only for the default path
            if path == "config.json" {
                match cfg.save(path) {
                    Ok(()) => info!("Generated config template: {path}"),
                    Err(e) => warn!("Failed to generate config template: {e}"),
                }
            }

            return Ok(cfg);
        }

        let data = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config {path}: {e}"))?;

        let cfg: Config = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid JSON in {path}: {e}");
                warn!("Using default configuration");
                return Ok(Self::default());
            }
        };

        info!("Loaded configuration from {path}");
        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)
            .map_err(|e| anyhow::anyhow!("failed to write config {path}: {e}"))?;
        Ok(())
    }

    /// Pull secrets and endpoints from the environment, overriding the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("AZURE_SEARCH_ENDPOINT") {
            self.search.endpoint = v;
        }
        if let Ok(v) = std::env::var("AZURE_SEARCH_API_KEY") {
            self.search.api_key = v;
        }
        if let Ok(v) = std::env::var("AZURE_SEARCH_INDEX_NAME") {
            self.search.index_name = v;
        }
        if let Ok(v) = std::env::var("OPENAI_API_KEY") {
            self.ai.api_key = v;
        }
        if let Ok(v) = std::env::var("OPENAI_MODEL") {
            self.ai.model = v;
        }
        if let Ok(v) = std::env::var("OPENAI_BASE_URL") {
            self.ai.base_url = v;
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.chunk_size > 0, "chunk_size must be positive");
        anyhow::ensure!(
            self.chunk_overlap < self.chunk_size,
            "chunk_overlap ({}) must be smaller than chunk_size ({})",
            self.chunk_overlap,
            self.chunk_size
        );
        anyhow::ensure!(self.search.top_k > 0, "search.top_k must be positive");
        anyhow::ensure!(self.ai.max_tokens > 0, "ai.max_tokens must be positive");
        anyhow::ensure!(
            self.safety.max_question_length > 0,
            "safety.max_question_length must be positive"
        );
        anyhow::ensure!(
            !self.upload.allowed_file_types.is_empty(),
            "at least one allowed file type must be specified"
        );
        Ok(())
    }

    /// Verify that every backend credential is present.
    ///
    /// Called once at startup by backend-facing commands; missing settings
    /// are fatal here rather than surfacing per-request.
    pub fn require_credentials(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.ai.api_key.is_empty() {
            errors.push("OPENAI_API_KEY is not set");
        }
        if self.search.endpoint.is_empty() {
            errors.push("AZURE_SEARCH_ENDPOINT is not set");
        }
        if self.search.api_key.is_empty() {
            errors.push("AZURE_SEARCH_API_KEY is not set");
        }

        anyhow::ensure!(
            errors.is_empty(),
            "Configuration errors: {}",
            errors.join(", ")
        );
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.search.top_k, 3);
        assert_eq!(config.search.index_name, "enterprise-documents");
        assert_eq!(config.ai.model, "gpt-4o-mini");
        assert_eq!(config.ai.max_tokens, 500);
        assert_eq!(config.safety.max_question_length, 500);
        assert!(config.safety.content_filter);
        assert!(config.safety.blocked_keywords.contains(&"hack".to_string()));
        assert_eq!(config.upload.allowed_file_types, vec!["txt", "pdf"]);
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"{"chunk_size": 400, "search": {"top_k": 5}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.chunk_size, 400);
        assert_eq!(config.search.top_k, 5);
        // Other fields should have defaults
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.ai.model, "gpt-4o-mini");
    }

    #[test]
    fn test_validate_ok() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_overlap_not_smaller_than_size() {
        let mut config = Config::default();
        config.chunk_overlap = config.chunk_size;
        assert!(config.validate().is_err());

        config.chunk_overlap = config.chunk_size + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_chunk_size() {
        let mut config = Config::default();
        config.chunk_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_file_types() {
        let mut config = Config::default();
        config.upload.allowed_file_types.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_require_credentials_reports_all_missing() {
        let config = Config::default();
        let err = config.require_credentials().unwrap_err().to_string();
        assert!(err.contains("OPENAI_API_KEY"));
        assert!(err.contains("AZURE_SEARCH_ENDPOINT"));
        assert!(err.contains("AZURE_SEARCH_API_KEY"));
    }

    #[test]
    fn test_require_credentials_ok_when_set() {
        let mut config = Config::default();
        config.ai.api_key = "sk-test".to_string();
        config.search.endpoint = "https://example.search.windows.net".to_string();
        config.search.api_key = "key".to_string();
        assert!(config.require_credentials().is_ok());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.chunk_size, config.chunk_size);
        assert_eq!(parsed.search.index_name, config.search.index_name);
        assert_eq!(
            parsed.safety.blocked_keywords,
            config.safety.blocked_keywords
        );
    }
}
