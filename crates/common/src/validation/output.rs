//! Structural checks on model output
//!
//! Each parser takes the raw JSON a flow received and either returns a typed
//! value or the full list of rules it broke. Nothing is repaired.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

use crate::domain::{EssayEvaluation, QuestionType, StudyGuideContent};

use super::AssessmentConfig;

pub const MAX_ALTERNATIVE_ANSWERS: usize = 3;
pub const TRUE_FALSE_ANSWERS: [&str; 2] = ["True", "False"];

/// Every rule a model response broke
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolations(pub Vec<String>);

impl SchemaViolations {
    fn single(message: impl Into<String>) -> Self {
        Self(vec![message.into()])
    }
}

impl fmt::Display for SchemaViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("; "))
    }
}

impl std::error::Error for SchemaViolations {}

type Checked<T> = std::result::Result<T, SchemaViolations>;

fn decode<T: DeserializeOwned>(value: Value) -> Checked<T> {
    if value.is_null() {
        return Err(SchemaViolations::single("response was empty"));
    }
    serde_json::from_value(value).map_err(|e| SchemaViolations::single(e.to_string()))
}

fn finish<T>(value: T, violations: Vec<String>) -> Checked<T> {
    if violations.is_empty() {
        Ok(value)
    } else {
        Err(SchemaViolations(violations))
    }
}

/// Reads a single non-empty string field such as `content` or `notes`
pub fn parse_text_field(value: Value, field: &str) -> Checked<String> {
    if value.is_null() {
        return Err(SchemaViolations::single("response was empty"));
    }
    match value.get(field) {
        Some(Value::String(text)) if !text.trim().is_empty() => Ok(text.clone()),
        Some(Value::String(_)) => Err(SchemaViolations::single(format!("`{field}` is empty"))),
        Some(_) => Err(SchemaViolations::single(format!("`{field}` is not a string"))),
        None => Err(SchemaViolations::single(format!("missing `{field}`"))),
    }
}

pub fn parse_outline_flag(value: Value) -> Checked<bool> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct OutlineCheck {
        is_outline: bool,
    }
    decode::<OutlineCheck>(value).map(|check| check.is_outline)
}

pub fn parse_study_guide(value: Value) -> Checked<StudyGuideContent> {
    let guide: StudyGuideContent = decode(value)?;
    let mut violations = Vec::new();
    if guide.summary.trim().is_empty() {
        violations.push("summary is empty".to_string());
    }
    if guide.key_points.is_empty() {
        violations.push("no key points".to_string());
    }
    finish(guide, violations)
}

/// A question as the model emits it, before an id is assigned
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestion {
    pub question_text: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    pub correct_answer: String,
    pub explanation: String,
}

#[derive(Deserialize)]
struct GeneratedAssessment {
    questions: Vec<GeneratedQuestion>,
}

pub fn parse_generated_questions(
    value: Value,
    config: &AssessmentConfig,
    enforce_count: bool,
) -> Checked<Vec<GeneratedQuestion>> {
    let GeneratedAssessment { questions } = decode(value)?;
    let requested = config.distinct_types();
    let mut violations = Vec::new();

    if questions.is_empty() {
        violations.push("no questions generated".to_string());
    }
    if enforce_count && questions.len() != config.question_count as usize {
        violations.push(format!(
            "expected {} questions, got {}",
            config.question_count,
            questions.len()
        ));
    }

    for (index, question) in questions.iter().enumerate() {
        let number = index + 1;
        if question.question_text.trim().is_empty() {
            violations.push(format!("question {number}: empty question text"));
        }
        if question.correct_answer.trim().is_empty() {
            violations.push(format!("question {number}: empty correct answer"));
        }
        if enforce_count && !requested.contains(&question.question_type) {
            violations.push(format!(
                "question {number}: type {} was not requested",
                question.question_type
            ));
        }
        match question.question_type {
            QuestionType::MultipleChoice => match &question.options {
                Some(options) if options.len() >= 2 => {
                    if !options.iter().any(|o| o == &question.correct_answer) {
                        violations.push(format!(
                            "question {number}: correct answer is not one of the options"
                        ));
                    }
                }
                _ => violations.push(format!(
                    "question {number}: multiple choice needs at least 2 options"
                )),
            },
            QuestionType::TrueFalse => {
                if !TRUE_FALSE_ANSWERS.contains(&question.correct_answer.as_str()) {
                    violations.push(format!(
                        "question {number}: true/false answer must be \"True\" or \"False\""
                    ));
                }
            }
            QuestionType::Flashcard => {
                if question.options.as_ref().is_some_and(|o| !o.is_empty()) {
                    violations.push(format!("question {number}: flashcards carry no options"));
                }
            }
            QuestionType::ShortAnswer | QuestionType::Essay => {}
        }
    }

    finish(questions, violations)
}

/// Per-question verdict keyed by 1-based question number
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NumberedResult {
    pub question_number: usize,
    pub is_correct: bool,
    pub feedback: String,
    #[serde(default)]
    pub essay_evaluation: Option<EssayEvaluation>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NumberedEvaluation {
    pub overall_score: i64,
    pub strength_summary: String,
    pub weakness_analysis: String,
    pub results: Vec<NumberedResult>,
}

/// `question_types` lists the assessment's questions in prompt order
pub fn parse_evaluation(value: Value, question_types: &[QuestionType]) -> Checked<NumberedEvaluation> {
    let mut evaluation: NumberedEvaluation = decode(value)?;
    let mut violations = Vec::new();

    if !(0..=100).contains(&evaluation.overall_score) {
        violations.push(format!(
            "overall score {} is outside 0..=100",
            evaluation.overall_score
        ));
    }

    let mut seen = vec![false; question_types.len()];
    for result in &evaluation.results {
        let number = result.question_number;
        let Some(ty) = number.checked_sub(1).and_then(|i| question_types.get(i)) else {
            violations.push(format!("result for unknown question {number}"));
            continue;
        };
        if std::mem::replace(&mut seen[number - 1], true) {
            violations.push(format!("duplicate result for question {number}"));
        }
        if let Some(essay) = &result.essay_evaluation {
            if *ty != QuestionType::Essay {
                violations.push(format!(
                    "question {number}: essay breakdown on a {ty} question"
                ));
            }
            if essay.alternative_answers.len() > MAX_ALTERNATIVE_ANSWERS {
                violations.push(format!(
                    "question {number}: more than {MAX_ALTERNATIVE_ANSWERS} alternative answers"
                ));
            }
        }
    }
    for (index, covered) in seen.iter().enumerate() {
        if !covered {
            violations.push(format!("no result for question {}", index + 1));
        }
    }

    evaluation.results.sort_by_key(|r| r.question_number);
    finish(evaluation, violations)
}
