//! Model service boundary
//!
//! Flows talk to the model through [`LlmClient`]. Production uses the Gemini
//! `generateContent` API; tests use [`ScriptedLlm`].

mod gemini;
mod scripted;

pub use gemini::GeminiClient;
pub use scripted::ScriptedLlm;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::config::AiConfig;
use crate::errors::{AppError, Result};

/// Every prompt the application sends, with its user-facing failure message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flow {
    ExtractFile,
    ClassifyOutline,
    ExpandOutline,
    StudyGuide,
    Assessment,
    Evaluation,
    Chat,
}

impl Flow {
    pub fn name(&self) -> &'static str {
        match self {
            Flow::ExtractFile => "extract_file",
            Flow::ClassifyOutline => "classify_outline",
            Flow::ExpandOutline => "expand_outline",
            Flow::StudyGuide => "study_guide",
            Flow::Assessment => "assessment",
            Flow::Evaluation => "evaluation",
            Flow::Chat => "chat",
        }
    }

    pub fn failure_message(&self) -> &'static str {
        match self {
            Flow::ExtractFile => "Failed to extract content from file.",
            Flow::ClassifyOutline => "Failed to classify content.",
            Flow::ExpandOutline => "Failed to generate notes from the outline.",
            Flow::StudyGuide => "Failed to generate study guide.",
            Flow::Assessment => "Failed to generate AI assessment.",
            Flow::Evaluation => "Failed to evaluate AI assessment.",
            Flow::Chat => "Failed to get a response from the AI.",
        }
    }

    /// The generic error for this flow, keeping `detail` for the logs
    pub fn failed(&self, detail: impl Into<String>) -> AppError {
        AppError::FlowFailed {
            flow: self.name(),
            message: self.failure_message().to_string(),
            detail: detail.into(),
        }
    }
}

/// Binary input attached to a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineMedia {
    pub mime_type: String,
    /// Base64 payload
    pub data: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromptRequest {
    pub flow: Flow,
    pub prompt: String,
    pub media: Option<InlineMedia>,
    /// JSON schema the structured output must follow
    pub response_schema: Value,
}

impl PromptRequest {
    pub fn new(flow: Flow, prompt: String, response_schema: Value) -> Self {
        Self {
            flow,
            prompt,
            media: None,
            response_schema,
        }
    }

    pub fn with_media(mut self, media: InlineMedia) -> Self {
        self.media = Some(media);
        self
    }
}

/// Trait for structured generation
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a prompt and return the model's JSON output.
    ///
    /// `Value::Null` means the model produced no output.
    async fn generate(&self, request: PromptRequest) -> Result<Value>;

    fn model_name(&self) -> &str;
}

/// Create a client based on configuration
pub fn create_llm_client(config: &AiConfig) -> Result<Arc<dyn LlmClient>> {
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiClient::new(config)?)),
        other => Err(AppError::Configuration {
            message: format!("Unknown AI provider: {other}"),
        }),
    }
}
