use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Assessment, AssessmentEvaluation, UserAnswer};

pub const PASSING_SCORE: u8 = 70;
pub const MIXED_TEST_TYPE: &str = "Mixed";
pub const DEFAULT_RECOMMENDATIONS: &str = "Review the feedback provided for incorrect answers.";

/// One taken test: the assessment and the answers given to it, stored together
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestRecord {
    pub id: Uuid,
    pub user_id: String,
    pub study_material_id: Uuid,
    pub test_type: String,
    pub question_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer: Option<u32>,
    pub passing_score: u8,
    pub creation_date: DateTime<Utc>,
    pub assessment: Assessment,
    pub user_answers: Vec<UserAnswer>,
}

impl TestRecord {
    pub fn new(
        user_id: impl Into<String>,
        study_material_id: Uuid,
        assessment: Assessment,
        user_answers: Vec<UserAnswer>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            study_material_id,
            test_type: MIXED_TEST_TYPE.to_string(),
            question_count: assessment.questions.len() as u32,
            timer: assessment.time_limit_minutes(),
            passing_score: PASSING_SCORE,
            creation_date: Utc::now(),
            assessment,
            user_answers,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestResultRecord {
    pub id: Uuid,
    pub test_id: Uuid,
    pub user_id: String,
    pub study_material_id: Uuid,
    pub score: u8,
    pub completion_date: DateTime<Utc>,
    pub performance_summary: String,
    pub recommendations: String,
    pub evaluation: AssessmentEvaluation,
}

impl TestResultRecord {
    pub fn for_test(test: &TestRecord, evaluation: AssessmentEvaluation) -> Self {
        Self {
            id: Uuid::new_v4(),
            test_id: test.id,
            user_id: test.user_id.clone(),
            study_material_id: test.study_material_id,
            score: evaluation.overall_score,
            completion_date: Utc::now(),
            performance_summary: performance_summary(&evaluation),
            recommendations: DEFAULT_RECOMMENDATIONS.to_string(),
            evaluation,
        }
    }

    pub fn passed(&self, passing_score: u8) -> bool {
        self.score >= passing_score
    }
}

pub fn performance_summary(evaluation: &AssessmentEvaluation) -> String {
    format!(
        "Strengths: {}. Weaknesses: {}",
        evaluation.strength_summary, evaluation.weakness_analysis
    )
}

/// A test joined with its result, used to replay a past attempt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PastTest {
    pub test: TestRecord,
    pub result: TestResultRecord,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Question, QuestionId, QuestionType};

    fn evaluation(score: u8) -> AssessmentEvaluation {
        AssessmentEvaluation {
            overall_score: score,
            strength_summary: "Solid recall of definitions".into(),
            weakness_analysis: "Struggles with dates".into(),
            results: vec![],
        }
    }

    #[test]
    fn test_record_carries_fixed_metadata() {
        let assessment = Assessment {
            questions: vec![Question {
                id: QuestionId::new(),
                question_text: "2+2?".into(),
                question_type: QuestionType::ShortAnswer,
                options: None,
                correct_answer: "4".into(),
                explanation: "Arithmetic".into(),
            }],
            timer: Some(0),
        };
        let record = TestRecord::new("u1", Uuid::new_v4(), assessment, vec![]);
        assert_eq!(record.test_type, "Mixed");
        assert_eq!(record.passing_score, 70);
        assert_eq!(record.question_count, 1);
        assert_eq!(record.timer, None);
    }

    #[test]
    fn test_result_summary_format() {
        let record = TestRecord::new(
            "u1",
            Uuid::new_v4(),
            Assessment {
                questions: vec![],
                timer: None,
            },
            vec![],
        );
        let result = TestResultRecord::for_test(&record, evaluation(80));
        assert_eq!(
            result.performance_summary,
            "Strengths: Solid recall of definitions. Weaknesses: Struggles with dates"
        );
        assert_eq!(result.recommendations, DEFAULT_RECOMMENDATIONS);
        assert_eq!(result.test_id, record.id);
        assert!(result.passed(PASSING_SCORE));
    }
}
