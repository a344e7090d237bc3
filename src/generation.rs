use async_trait::async_trait;
use serde_json::Value;

use crate::error::GenerationError;

/// Pure text-generation call. Prompt in, text out; no state, no retries.
/// A failed or empty result is fatal for the request that made it.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Environment variable the Gemini client reads its credential from.
pub const GEMINI_API_KEY_VAR: &str = "GOOGLE_API_KEY_SUMMARY";

/// Gemini client via the `generateContent` endpoint.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: "https://generativelanguage.googleapis.com".into(),
            model: "gemini-2.5-flash-lite".into(),
        }
    }

    /// Read the credential from the environment. Absence is a configuration
    /// failure surfaced here rather than on first use.
    pub fn from_env() -> Result<Self, GenerationError> {
        let api_key = std::env::var(GEMINI_API_KEY_VAR)
            .map_err(|_| GenerationError::Configuration(GEMINI_API_KEY_VAR.into()))?;
        Ok(Self::new(api_key))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        if self.api_key.is_empty() {
            return Err(GenerationError::Configuration(GEMINI_API_KEY_VAR.into()));
        }

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });

        let resp = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        if status != 200 {
            return Err(GenerationError::ApiError { status, body: text });
        }

        let parsed: Value =
            serde_json::from_str(&text).map_err(|e| GenerationError::Parse(e.to_string()))?;

        let parts = parsed["candidates"][0]["content"]["parts"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        let answer: String = parts
            .iter()
            .filter_map(|p| p["text"].as_str())
            .collect::<Vec<_>>()
            .join("");

        let answer = answer.trim().to_string();
        if answer.is_empty() {
            return Err(GenerationError::Empty);
        }

        Ok(answer)
    }
}
