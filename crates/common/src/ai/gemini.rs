//! Gemini `generateContent` client with structured JSON output

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use super::{LlmClient, PromptRequest};
use crate::config::AiConfig;
use crate::errors::{AppError, Result};

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: &AiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| AppError::Configuration {
                message: "ai.api_key is required for the gemini provider".to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn build_body(request: &PromptRequest) -> Value {
        let mut parts = vec![json!({ "text": request.prompt })];
        if let Some(media) = &request.media {
            parts.push(json!({
                "inlineData": {
                    "mimeType": media.mime_type,
                    "data": media.data,
                }
            }));
        }

        json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": request.response_schema,
            }
        })
    }

    /// First text part of the first candidate, if any
    fn candidate_text(body: &Value) -> Option<&str> {
        body["candidates"]
            .as_array()
            .and_then(|candidates| candidates.first())
            .and_then(|c| c["content"]["parts"].as_array())
            .and_then(|parts| parts.iter().find_map(|p| p["text"].as_str()))
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, request: PromptRequest) -> Result<Value> {
        let url = format!("{}/models/{}:generateContent", self.api_base, self.model);
        let body = Self::build_body(&request);

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::AiService {
                message: format!("Request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::AiService {
                message: format!("API error {status}: {text}"),
            });
        }

        let body: Value = response.json().await.map_err(|e| AppError::AiService {
            message: format!("Failed to parse response: {e}"),
        })?;

        if let Some(reason) = body["promptFeedback"]["blockReason"].as_str() {
            return Err(request.flow.failed(format!("prompt blocked: {reason}")));
        }

        let Some(text) = Self::candidate_text(&body) else {
            tracing::debug!(flow = request.flow.name(), "Model returned no candidates");
            return Ok(Value::Null);
        };

        serde_json::from_str(text)
            .map_err(|e| request.flow.failed(format!("output is not valid JSON: {e}")))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
