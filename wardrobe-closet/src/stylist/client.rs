//! Generative language service client
//!
//! Each call is a single stateless turn; no conversation history is kept
//! between requests.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::StylistError;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const USER_AGENT: &str = concat!("wardrobe-closet/", env!("CARGO_PKG_VERSION"));

/// A service that turns a prompt into a text reply
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    /// Send one prompt and return the reply text
    async fn generate(&self, prompt: &str) -> Result<String, StylistError>;

    /// Whether replies are constrained to the outfit JSON schema
    fn structured_output(&self) -> bool {
        false
    }
}

/// Sampling settings sent with every request
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 8192,
            response_mime_type: None,
            response_schema: None,
        }
    }
}

impl GenerationConfig {
    /// Ask for JSON shaped as a list of outfits, each a list of paths
    pub fn with_outfit_schema(mut self) -> Self {
        self.response_mime_type = Some("application/json".to_string());
        self.response_schema = Some(json!({
            "type": "ARRAY",
            "items": {
                "type": "ARRAY",
                "items": { "type": "STRING" }
            }
        }));
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// `generateContent` request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// `generateContent` response body (fields used here only)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<Value>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    pub fn text(&self) -> Result<String, StylistError> {
        let Some(candidate) = self.candidates.first() else {
            let reason = self
                .prompt_feedback
                .as_ref()
                .map(|f| format!(" (prompt feedback: {})", f))
                .unwrap_or_default();
            return Err(StylistError::RequestFailed(format!(
                "reply contained no candidates{}",
                reason
            )));
        };

        let text: String = candidate
            .content
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect();

        if text.trim().is_empty() {
            return Err(StylistError::RequestFailed(format!(
                "reply contained no text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }
        Ok(text)
    }
}

/// Gemini `generateContent` client
pub struct GeminiClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    generation_config: GenerationConfig,
}

impl GeminiClient {
    pub fn new(
        api_key: String,
        model: String,
        timeout: Duration,
        structured_output: bool,
    ) -> Result<Self, StylistError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| StylistError::RequestFailed(e.to_string()))?;

        let generation_config = if structured_output {
            GenerationConfig::default().with_outfit_schema()
        } else {
            GenerationConfig::default()
        };

        Ok(Self {
            http_client,
            base_url: GEMINI_BASE_URL.to_string(),
            api_key,
            model,
            generation_config,
        })
    }

    /// Point the client at another endpoint (proxies, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Single-turn request body for `prompt`
    pub fn build_request(&self, prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: self.generation_config.clone(),
        }
    }
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, StylistError> {
        let body = self.build_request(prompt);

        tracing::debug!(
            model = %self.model,
            prompt_chars = prompt.len(),
            "Querying generative service"
        );

        let response = self
            .http_client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    StylistError::RequestFailed("request timed out".to_string())
                } else {
                    StylistError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(StylistError::RequestFailed(format!(
                "service returned {}: {}",
                status.as_u16(),
                error_text
            )));
        }

        let reply: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| StylistError::RequestFailed(format!("unreadable reply: {}", e)))?;

        let text = reply.text()?;
        tracing::debug!(reply_chars = text.len(), "Generative service replied");
        Ok(text)
    }

    fn structured_output(&self) -> bool {
        self.generation_config.response_schema.is_some()
    }
}
