/// OpenAI-compatible chat completion client.
///
/// Different hosts are distinguished only by base URL and API key, so the
/// same client works against any OpenAI-compatible completion endpoint.
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{error, info};

use super::{BackendError, Completion, Generator};
use crate::config::AiConfig;
use crate::prompt;

pub struct OpenAiGenerator {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiGenerator {
    #[must_use]
    pub fn new(config: &AiConfig) -> Self {
        info!("AI service initialized with model: {}", config.model);
        Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Quick round trip to verify credentials and endpoint.
    pub async fn test_connection(&self) -> bool {
        match self.complete("Hello", 10, 0.0).await {
            Ok(_) => {
                info!("AI service connection test successful");
                true
            }
            Err(e) => {
                error!("AI service connection test failed: {e}");
                false
            }
        }
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn complete(
        &self,
        prompt_text: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<Completion, BackendError> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": prompt::SYSTEM_MESSAGE},
                {"role": "user", "content": prompt_text},
            ],
            "max_tokens": max_tokens,
            "temperature": temperature,
            "top_p": 0.9,
            "frequency_penalty": 0.0,
            "presence_penalty": 0.0,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            let detail = response.text().await.unwrap_or_default();
            return Err(BackendError::RateLimited(format!(
                "completion backend throttled: {detail}"
            )));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(BackendError::Unavailable(format!(
                "HTTP {status}: {detail}"
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))?;

        let text = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                BackendError::Malformed("response missing message content".to_string())
            })?
            .trim()
            .to_string();

        let tokens_used = payload["usage"]["total_tokens"].as_u64().unwrap_or(0) as u32;

        Ok(Completion { text, tokens_used })
    }
}
