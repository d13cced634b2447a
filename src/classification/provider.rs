//! Client for OpenAI-compatible vision chat-completion providers

use crate::classification::error::{ClassificationError, ClassifyResult};
use crate::config::ProviderConfig;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chat-completion request body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: Vec<ContentPart>,
}

/// One part of a multimodal message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageUrl {
    pub url: String,
}

impl ChatCompletionRequest {
    /// Single user message carrying the prompt and the image
    pub fn vision(
        model: impl Into<String>,
        prompt: impl Into<String>,
        image_url: impl Into<String>,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: prompt.into(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image_url.into(),
                        },
                    },
                ],
            }],
            max_tokens,
            temperature,
        }
    }
}

/// Chat-completion response envelope; only the first choice is consumed
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// Parse a raw response body
    pub fn from_body(body: &str) -> ClassifyResult<Self> {
        serde_json::from_str(body).map_err(|e| {
            ClassificationError::UpstreamResponseMalformed(format!("invalid JSON envelope: {}", e))
        })
    }

    /// Trimmed `choices[0].message.content`, required to be non-empty
    pub fn into_content(self) -> ClassifyResult<String> {
        let content = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| {
                ClassificationError::UpstreamResponseMalformed("response has no choices".to_string())
            })?
            .message
            .and_then(|message| message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                ClassificationError::UpstreamResponseMalformed(
                    "choices[0].message.content is missing or empty".to_string(),
                )
            })?;

        Ok(content)
    }
}

/// A provider able to answer a vision chat-completion request
#[async_trait]
pub trait ChatCompletionProvider: Send + Sync + 'static {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Perform one attempt and return the validated message content
    async fn complete(&self, request: &ChatCompletionRequest) -> ClassifyResult<String>;
}

/// OpenRouter (or any OpenAI-compatible) provider over HTTPS
#[derive(Clone)]
pub struct OpenRouterProvider {
    pub(crate) client: Client,
    pub(crate) endpoint: String,
    api_key: String,
    site_url: String,
    site_name: String,
    pub(crate) timeout_secs: u64,
}

impl std::fmt::Debug for OpenRouterProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterProvider")
            .field("endpoint", &self.endpoint)
            .field("site_url", &self.site_url)
            .field("site_name", &self.site_name)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl OpenRouterProvider {
    /// Create a provider with a client bounded by `config.timeout_secs`
    pub fn new(config: &ProviderConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.completions_url(),
            api_key,
            site_url: config.resolve_site_url(),
            site_name: config.resolve_site_name(),
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatCompletionProvider for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn complete(&self, request: &ChatCompletionRequest) -> ClassifyResult<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", &self.site_url)
            .header("X-Title", &self.site_name)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClassificationError::UpstreamTimeout(self.timeout_secs)
                } else if e.is_connect() {
                    ClassificationError::UpstreamRequestFailed(format!(
                        "Failed to connect to provider: {}",
                        e
                    ))
                } else {
                    ClassificationError::UpstreamRequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ClassificationError::UpstreamTimeout(self.timeout_secs)
            } else {
                ClassificationError::UpstreamRequestFailed(format!(
                    "Failed to read provider response: {}",
                    e
                ))
            }
        })?;

        if !status.is_success() {
            return Err(ClassificationError::UpstreamStatus {
                status: status.as_u16(),
                message: if body.is_empty() {
                    "No response body".to_string()
                } else {
                    body.chars().take(200).collect()
                },
            });
        }

        ChatCompletionResponse::from_body(&body)?.into_content()
    }
}
