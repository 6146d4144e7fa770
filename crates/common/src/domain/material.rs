use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::StudyGuide;

/// How a material's text was obtained
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Text,
    Url,
    File,
    Outline,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Text => "text",
            SourceType::Url => "url",
            SourceType::File => "file",
            SourceType::Outline => "outline",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(SourceType::Text),
            "url" => Some(SourceType::Url),
            "file" => Some(SourceType::File),
            "outline" => Some(SourceType::Outline),
            _ => None,
        }
    }
}

/// A user's study source. `extracted_text` never changes after creation;
/// only `study_guide` is merged in later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudyMaterial {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub source_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub extracted_text: String,
    pub upload_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_guide: Option<StudyGuide>,
}

impl StudyMaterial {
    pub fn new(
        user_id: impl Into<String>,
        title: impl Into<String>,
        source_type: SourceType,
        source_url: Option<String>,
        extracted_text: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            title: title.into(),
            source_type,
            source_url,
            extracted_text: extracted_text.into(),
            upload_date: Utc::now(),
            study_guide: None,
        }
    }
}
