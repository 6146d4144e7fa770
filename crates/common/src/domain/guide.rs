use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Definition {
    pub term: String,
    pub definition: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Concept {
    pub concept: String,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Example {
    pub concept: String,
    pub example: String,
}

/// The sections of a study guide, as produced by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StudyGuideContent {
    pub summary: String,
    pub key_points: Vec<String>,
    pub definitions: Vec<Definition>,
    pub concepts: Vec<Concept>,
    pub examples: Vec<Example>,
    pub mnemonics: Vec<String>,
}

/// A generated guide. Every generation gets a fresh id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudyGuide {
    pub id: Uuid,
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub content: StudyGuideContent,
}

impl StudyGuide {
    pub fn stamp(content: StudyGuideContent) -> Self {
        Self {
            id: Uuid::new_v4(),
            generated_at: Utc::now(),
            content,
        }
    }
}
