use serde::{Deserialize, Serialize};

use super::QuestionId;

/// Relevance colour of an essay segment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Highlight {
    Green,
    Orange,
    Grey,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HighlightedSegment {
    pub text: String,
    pub highlight: Highlight,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlternativeAnswer {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EssayEvaluation {
    pub highlighted_text: Vec<HighlightedSegment>,
    pub corrections: Vec<String>,
    /// At most three model answers
    pub alternative_answers: Vec<AlternativeAnswer>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub question_id: QuestionId,
    pub is_correct: bool,
    pub feedback: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub essay_evaluation: Option<EssayEvaluation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentEvaluation {
    /// Percentage in 0..=100
    pub overall_score: u8,
    pub strength_summary: String,
    pub weakness_analysis: String,
    pub results: Vec<EvaluationResult>,
}

impl AssessmentEvaluation {
    pub fn result_for(&self, id: &QuestionId) -> Option<&EvaluationResult> {
        self.results.iter().find(|r| &r.question_id == id)
    }
}
