//! Domain types shared by the flows, the store and the HTTP API
//!
//! All wire types serialise as camelCase JSON.

mod assessment;
mod chat;
mod evaluation;
mod guide;
mod material;
mod records;

pub use assessment::{Assessment, Question, QuestionId, QuestionType, UserAnswer};
pub use chat::{ChatMessage, ChatReply, ChatRole};
pub use evaluation::{
    AlternativeAnswer, AssessmentEvaluation, EssayEvaluation, EvaluationResult, Highlight,
    HighlightedSegment,
};
pub use guide::{Concept, Definition, Example, StudyGuide, StudyGuideContent};
pub use material::{SourceType, StudyMaterial};
pub use records::{
    performance_summary, PastTest, TestRecord, TestResultRecord, DEFAULT_RECOMMENDATIONS,
    MIXED_TEST_TYPE, PASSING_SCORE,
};
