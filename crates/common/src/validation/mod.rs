//! Input validation for user-submitted forms and AI flow outputs
//!
//! Forms use the `validator` derive. A failing form surfaces as a single
//! [`AppError::Validation`] carrying the message of the first failing field,
//! with fields checked in declaration order.

pub mod output;

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::domain::{ChatMessage, QuestionType};
use crate::errors::{AppError, Result};

pub use output::SchemaViolations;

pub const MIN_QUESTION_COUNT: u32 = 1;
pub const MAX_QUESTION_COUNT: u32 = 20;
pub const DEFAULT_QUESTION_COUNT: u32 = 5;
pub const MAX_TIMER_MINUTES: u32 = 120;
pub const DEFAULT_TIMER_MINUTES: u32 = 10;

/// A validated form. `FIELDS` lists field names in declaration order.
pub trait FormInput: Validate {
    const FIELDS: &'static [&'static str];

    fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|errors| first_failure(&errors, Self::FIELDS))
    }
}

fn first_failure(errors: &ValidationErrors, fields: &[&str]) -> AppError {
    let field_errors = errors.field_errors();
    for field in fields {
        let Some(first) = field_errors.get(*field).and_then(|errs| errs.first()) else {
            continue;
        };
        let message = first
            .message
            .as_ref()
            .map(|m| m.to_string())
            .unwrap_or_else(|| format!("Invalid {field}."));
        return AppError::validation(*field, message);
    }
    AppError::Validation {
        message: "Invalid input.".to_string(),
        field: None,
    }
}

fn rejection(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct TextMaterialInput {
    #[validate(length(min = 3, message = "Title must be at least 3 characters."))]
    pub title: String,

    #[validate(length(min = 50, message = "Text content must be at least 50 characters."))]
    pub content: String,
}

impl FormInput for TextMaterialInput {
    const FIELDS: &'static [&'static str] = &["title", "content"];
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct UrlMaterialInput {
    #[validate(length(min = 3, message = "Title must be at least 3 characters."))]
    pub title: String,

    #[validate(url(message = "Please enter a valid URL."))]
    pub url: String,
}

impl FormInput for UrlMaterialInput {
    const FIELDS: &'static [&'static str] = &["title", "url"];
}

/// An uploaded file, as received from a multipart form
#[derive(Debug, Clone, Validate)]
pub struct FileUpload {
    #[validate(length(min = 1, message = "Please upload a file."))]
    pub file_name: String,

    pub mime_type: String,

    #[validate(length(min = 1, message = "Please upload a file."))]
    pub bytes: Vec<u8>,
}

impl FormInput for FileUpload {
    const FIELDS: &'static [&'static str] = &["file_name", "bytes"];
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Form rules plus the configured size ceiling
    pub fn check_with_limit(&self, max_bytes: usize) -> Result<()> {
        self.check()?;
        if self.bytes.len() > max_bytes {
            return Err(AppError::PayloadTooLarge {
                size: self.bytes.len(),
                limit: max_bytes,
            });
        }
        Ok(())
    }
}

/// Options for generating an assessment
#[derive(Debug, Clone, Deserialize, Serialize, Validate, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentConfig {
    #[validate(range(
        min = 1,
        max = 20,
        message = "Number of questions must be between 1 and 20."
    ))]
    #[serde(default = "default_question_count")]
    pub question_count: u32,

    #[validate(custom(function = "validate_question_types"))]
    pub question_types: Vec<QuestionType>,

    /// Minutes; 0 or absent means no limit
    #[validate(range(max = 120, message = "Timer must be between 0 and 120 minutes."))]
    #[serde(default)]
    pub timer: Option<u32>,
}

impl FormInput for AssessmentConfig {
    const FIELDS: &'static [&'static str] = &["question_count", "question_types", "timer"];
}

fn default_question_count() -> u32 {
    DEFAULT_QUESTION_COUNT
}

fn validate_question_types(types: &[QuestionType]) -> std::result::Result<(), ValidationError> {
    if types.is_empty() {
        return Err(rejection(
            "question_types",
            "Please select at least one question type.",
        ));
    }
    Ok(())
}

impl AssessmentConfig {
    pub fn new(question_count: u32, question_types: Vec<QuestionType>, timer: Option<u32>) -> Self {
        Self {
            question_count,
            question_types,
            timer,
        }
    }

    /// Requested types with duplicates removed, first occurrence kept
    pub fn distinct_types(&self) -> Vec<QuestionType> {
        let mut seen = Vec::with_capacity(self.question_types.len());
        for ty in &self.question_types {
            if !seen.contains(ty) {
                seen.push(*ty);
            }
        }
        seen
    }

    pub fn time_limit_minutes(&self) -> Option<u32> {
        self.timer.filter(|minutes| *minutes > 0)
    }
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            question_count: DEFAULT_QUESTION_COUNT,
            question_types: vec![QuestionType::MultipleChoice],
            timer: Some(DEFAULT_TIMER_MINUTES),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyGuideRequest {
    #[serde(default)]
    pub use_online_sources: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ChatRequest {
    #[validate(custom(function = "validate_query"))]
    pub query: String,

    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

impl FormInput for ChatRequest {
    const FIELDS: &'static [&'static str] = &["query"];
}

fn validate_query(query: &str) -> std::result::Result<(), ValidationError> {
    if query.trim().is_empty() {
        return Err(rejection("query", "Please enter a question."));
    }
    Ok(())
}
