//! AI flows: prompt in, validated structure out
//!
//! Every flow renders its template, calls the model once and validates the
//! output. A transport error, an empty response or a schema violation all
//! surface as the flow's generic failure; there is no retry and no partial
//! recovery. The outline classifier is the exception and fails open.

mod schemas;

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::ai::{Flow, InlineMedia, LlmClient, PromptRequest};
use crate::domain::{
    Assessment, AssessmentEvaluation, ChatMessage, ChatReply, EvaluationResult, Question,
    QuestionId, QuestionType, StudyGuide, UserAnswer,
};
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::prompts::{self, TemplateVars};
use crate::validation::output::{self, SchemaViolations};
use crate::validation::{AssessmentConfig, FormInput};

/// Placeholder sent to the examiner for unanswered questions
pub const NOT_ANSWERED: &str = "Not Answered";

#[derive(Clone)]
pub struct AiFlows {
    llm: Arc<dyn LlmClient>,
    enforce_question_count: bool,
}

impl AiFlows {
    pub fn new(llm: Arc<dyn LlmClient>, enforce_question_count: bool) -> Self {
        Self {
            llm,
            enforce_question_count,
        }
    }

    async fn invoke<T>(
        &self,
        request: PromptRequest,
        parse: impl FnOnce(Value) -> std::result::Result<T, SchemaViolations>,
    ) -> Result<T> {
        let flow = request.flow;
        let start = Instant::now();

        let outcome = match self.llm.generate(request).await {
            Ok(value) => parse(value).map_err(|violations| flow.failed(violations.to_string())),
            Err(AppError::FlowFailed { detail, .. }) => Err(flow.failed(detail)),
            Err(err) => Err(flow.failed(err.to_string())),
        };

        metrics::record_ai_call(flow.name(), start.elapsed().as_secs_f64(), outcome.is_ok());
        if let Err(AppError::FlowFailed { detail, .. }) = &outcome {
            tracing::warn!(flow = flow.name(), detail = %detail, "AI flow failed");
        }
        outcome
    }

    /// OCR over an uploaded file
    pub async fn extract_content_from_file(&self, media: InlineMedia) -> Result<String> {
        let prompt = prompts::render(prompts::OCR_PROMPT, &TemplateVars::new())?;
        let request = PromptRequest::new(Flow::ExtractFile, prompt, schemas::extracted_content())
            .with_media(media);
        self.invoke(request, |v| output::parse_text_field(v, "content"))
            .await
    }

    /// Whether `content` reads like a syllabus or outline. Never fails.
    pub async fn is_content_outline(&self, content: &str) -> bool {
        let vars = TemplateVars::new().text("content", content);
        let prompt = match prompts::render(prompts::OUTLINE_CHECK_PROMPT, &vars) {
            Ok(prompt) => prompt,
            Err(e) => {
                tracing::warn!(error = %e, "Outline check prompt failed to render");
                return false;
            }
        };
        let request = PromptRequest::new(Flow::ClassifyOutline, prompt, schemas::outline_check());

        match self.invoke(request, output::parse_outline_flag).await {
            Ok(is_outline) => is_outline,
            Err(e) => {
                tracing::warn!(error = %e, "Outline check failed, treating content as regular text");
                false
            }
        }
    }

    pub async fn generate_notes_from_outline(&self, outline: &str) -> Result<String> {
        let vars = TemplateVars::new().text("outline", outline);
        let prompt = prompts::render(prompts::NOTES_FROM_OUTLINE_PROMPT, &vars)?;
        let request = PromptRequest::new(Flow::ExpandOutline, prompt, schemas::outline_notes());
        self.invoke(request, |v| output::parse_text_field(v, "notes"))
            .await
    }

    /// Build a guide; each call stamps a new guide id
    pub async fn generate_study_guide(
        &self,
        content: &str,
        use_online_sources: bool,
    ) -> Result<StudyGuide> {
        let vars = TemplateVars::new()
            .text("content", content)
            .flag("use_online_sources", use_online_sources);
        let prompt = prompts::render(prompts::STUDY_GUIDE_PROMPT, &vars)?;
        let request = PromptRequest::new(Flow::StudyGuide, prompt, schemas::study_guide());
        let content = self.invoke(request, output::parse_study_guide).await?;
        Ok(StudyGuide::stamp(content))
    }

    pub async fn generate_assessment(
        &self,
        content: &str,
        config: &AssessmentConfig,
    ) -> Result<Assessment> {
        config.check()?;

        let types = config.distinct_types();
        let type_names: Vec<&str> = types.iter().map(QuestionType::as_str).collect();
        let vars = TemplateVars::new()
            .text("content", content)
            .text("question_count", config.question_count.to_string())
            .text("question_types", type_names.join(", "));
        let prompt = prompts::render(prompts::ASSESSMENT_PROMPT, &vars)?;
        let request = PromptRequest::new(Flow::Assessment, prompt, schemas::assessment(&type_names));

        let enforce = self.enforce_question_count;
        let generated = self
            .invoke(request, |v| output::parse_generated_questions(v, config, enforce))
            .await?;

        let questions = generated
            .into_iter()
            .map(|q| Question {
                id: QuestionId::new(),
                options: match q.question_type {
                    QuestionType::MultipleChoice => q.options,
                    _ => None,
                },
                question_text: q.question_text,
                question_type: q.question_type,
                correct_answer: q.correct_answer,
                explanation: q.explanation,
            })
            .collect();

        Ok(Assessment {
            questions,
            timer: config.time_limit_minutes(),
        })
    }

    /// Grade `answers` against `assessment`.
    ///
    /// Answers are matched by question id. Missing or blank answers are sent
    /// as "Not Answered"; an answer naming a question outside the assessment
    /// is rejected before the model is called.
    pub async fn evaluate_assessment(
        &self,
        assessment: &Assessment,
        answers: &[UserAnswer],
    ) -> Result<AssessmentEvaluation> {
        let answer_map = answer_map(assessment, answers)?;

        let items = assessment
            .questions
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let options = question.options.as_deref().unwrap_or_default();
                TemplateVars::new()
                    .text("number", (index + 1).to_string())
                    .text("question_type", question.question_type.as_str())
                    .text("question_text", question.question_text.as_str())
                    .flag("has_options", !options.is_empty())
                    .text("options", options.join(", "))
                    .text("correct_answer", question.correct_answer.as_str())
                    .text(
                        "user_answer",
                        answer_map.get(&question.id).copied().unwrap_or(NOT_ANSWERED),
                    )
            });
        let questions = prompts::render_each(prompts::EVALUATION_ITEM, items, "\n")?;
        let prompt = prompts::render(
            prompts::EVALUATION_PROMPT,
            &TemplateVars::new().text("questions", questions),
        )?;
        let request = PromptRequest::new(Flow::Evaluation, prompt, schemas::evaluation());

        let types: Vec<QuestionType> = assessment.questions.iter().map(|q| q.question_type).collect();
        let numbered = self
            .invoke(request, |v| output::parse_evaluation(v, &types))
            .await?;

        let results = numbered
            .results
            .into_iter()
            .map(|r| EvaluationResult {
                question_id: assessment.questions[r.question_number - 1].id,
                is_correct: r.is_correct,
                feedback: r.feedback,
                essay_evaluation: r.essay_evaluation,
            })
            .collect();

        Ok(AssessmentEvaluation {
            overall_score: numbered.overall_score as u8,
            strength_summary: numbered.strength_summary,
            weakness_analysis: numbered.weakness_analysis,
            results,
        })
    }

    /// Stateless chat turn; the caller sends the whole history every time
    pub async fn ask(&self, query: &str, history: &[ChatMessage]) -> Result<ChatReply> {
        let turns = history.iter().map(|message| {
            TemplateVars::new()
                .text("role", message.role.as_str())
                .text("content", message.content.as_str())
        });
        let history = prompts::render_each(prompts::CHAT_TURN, turns, "\n")?;
        let vars = TemplateVars::new()
            .text("history", history)
            .text("query", query);
        let prompt = prompts::render(prompts::CHAT_PROMPT, &vars)?;
        let request = PromptRequest::new(Flow::Chat, prompt, schemas::chat_reply());

        let response = self
            .invoke(request, |v| output::parse_text_field(v, "response"))
            .await?;
        Ok(ChatReply { response })
    }
}

/// Non-blank answers by question id; a later answer to the same question wins
fn answer_map<'a>(
    assessment: &Assessment,
    answers: &'a [UserAnswer],
) -> Result<HashMap<QuestionId, &'a str>> {
    let mut map = HashMap::with_capacity(answers.len());
    for answer in answers {
        if !assessment.contains(&answer.question_id) {
            return Err(AppError::validation(
                "userAnswers",
                format!(
                    "Answer refers to question {} which is not part of this assessment.",
                    answer.question_id
                ),
            ));
        }
        let text = answer.answer.trim();
        if text.is_empty() {
            map.remove(&answer.question_id);
        } else {
            map.insert(answer.question_id, text);
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ScriptedLlm;
    use serde_json::json;

    fn flows(llm: &Arc<ScriptedLlm>) -> AiFlows {
        AiFlows::new(llm.clone(), true)
    }

    fn question(text: &str, ty: QuestionType, answer: &str) -> Question {
        Question {
            id: QuestionId::new(),
            question_text: text.into(),
            question_type: ty,
            options: None,
            correct_answer: answer.into(),
            explanation: "because".into(),
        }
    }

    fn graded(numbers: &[usize]) -> Value {
        let results: Vec<Value> = numbers
            .iter()
            .map(|n| json!({"questionNumber": n, "isCorrect": *n == 1, "feedback": format!("f{n}")}))
            .collect();
        json!({
            "overallScore": 50,
            "strengthSummary": "Good recall",
            "weaknessAnalysis": "Weak on dates",
            "results": results
        })
    }

    #[tokio::test]
    async fn test_study_guide_flag_toggles_enrichment_only() {
        let llm = Arc::new(ScriptedLlm::new());
        let guide = json!({
            "summary": "Cells are the unit of life.",
            "keyPoints": ["Cells"],
            "definitions": [],
            "concepts": [],
            "examples": [],
            "mnemonics": []
        });
        llm.reply(Flow::StudyGuide, guide.clone())
            .reply(Flow::StudyGuide, guide);

        let flows = flows(&llm);
        let first = flows.generate_study_guide("Cell biology", true).await.unwrap();
        let second = flows.generate_study_guide("Cell biology", false).await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(first.content.summary, "Cells are the unit of life.");

        let prompts = llm.requests_for(Flow::StudyGuide);
        assert!(prompts[0].prompt.contains("Enrichment"));
        assert!(!prompts[1].prompt.contains("Enrichment"));
        assert!(prompts[1].prompt.contains("Cell biology"));
    }

    #[tokio::test]
    async fn test_null_output_is_generic_failure() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.reply(Flow::ExpandOutline, Value::Null);
        let err = flows(&llm).generate_notes_from_outline("Week 1").await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to generate notes from the outline.");
    }

    #[tokio::test]
    async fn test_transport_failure_is_generic_failure() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.fail(Flow::Chat, "connection reset");
        let err = flows(&llm).ask("why?", &[]).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to get a response from the AI.");
    }

    #[tokio::test]
    async fn test_outline_check_fails_open() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.fail(Flow::ClassifyOutline, "timeout")
            .reply(Flow::ClassifyOutline, Value::Null)
            .reply(Flow::ClassifyOutline, json!({"isOutline": true}));

        let flows = flows(&llm);
        assert!(!flows.is_content_outline("Unit 1").await);
        assert!(!flows.is_content_outline("Unit 1").await);
        assert!(flows.is_content_outline("Unit 1").await);
    }

    #[tokio::test]
    async fn test_assessment_assigns_fresh_ids_and_timer() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.reply(
            Flow::Assessment,
            json!({"questions": [
                {"questionText": "Sky is blue?", "questionType": "true_false",
                 "options": ["True", "False"], "correctAnswer": "True", "explanation": "Rayleigh"},
                {"questionText": "Photosynthesis", "questionType": "flashcard",
                 "correctAnswer": "Light to sugar", "explanation": "Chlorophyll"}
            ]}),
        );

        let config = AssessmentConfig::new(
            2,
            vec![QuestionType::TrueFalse, QuestionType::Flashcard],
            Some(15),
        );
        let assessment = flows(&llm).generate_assessment("notes", &config).await.unwrap();
        assert_eq!(assessment.questions.len(), 2);
        assert_ne!(assessment.questions[0].id, assessment.questions[1].id);
        assert_eq!(assessment.questions[0].options, None);
        assert_eq!(assessment.timer, Some(15));

        let prompt = &llm.requests_for(Flow::Assessment)[0].prompt;
        assert!(prompt.contains("exactly 2 questions"));
        assert!(prompt.contains("true_false, flashcard"));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_model_call() {
        let llm = Arc::new(ScriptedLlm::new());
        let config = AssessmentConfig::new(0, vec![QuestionType::Essay], None);
        let err = flows(&llm).generate_assessment("notes", &config).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_wrong_question_count_is_flow_failure() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.reply(
            Flow::Assessment,
            json!({"questions": [
                {"questionText": "Define osmosis", "questionType": "short_answer",
                 "correctAnswer": "Diffusion of water", "explanation": "Membranes"}
            ]}),
        );
        let config = AssessmentConfig::new(3, vec![QuestionType::ShortAnswer], None);
        let err = flows(&llm).generate_assessment("notes", &config).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to generate AI assessment.");
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_evaluation_fills_unanswered_and_maps_ids() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.reply(Flow::Evaluation, graded(&[2, 1, 3]));

        let assessment = Assessment {
            questions: vec![
                question("Capital of France?", QuestionType::ShortAnswer, "Paris"),
                question("Capital of Peru?", QuestionType::ShortAnswer, "Lima"),
                question("Capital of Chad?", QuestionType::ShortAnswer, "N'Djamena"),
            ],
            timer: None,
        };
        let answers = vec![
            UserAnswer {
                question_id: assessment.questions[0].id,
                answer: "Paris".into(),
            },
            UserAnswer {
                question_id: assessment.questions[2].id,
                answer: "   ".into(),
            },
        ];

        let evaluation = flows(&llm)
            .evaluate_assessment(&assessment, &answers)
            .await
            .unwrap();

        let prompt = &llm.requests_for(Flow::Evaluation)[0].prompt;
        assert!(prompt.contains("Student's answer: Paris"));
        assert_eq!(prompt.matches("Student's answer: Not Answered").count(), 2);

        assert_eq!(evaluation.results.len(), 3);
        for (result, question) in evaluation.results.iter().zip(&assessment.questions) {
            assert_eq!(result.question_id, question.id);
        }
        let first = evaluation.result_for(&assessment.questions[0].id).unwrap();
        assert!(first.is_correct);
        assert_eq!(first.feedback, "f1");
    }

    #[tokio::test]
    async fn test_evaluation_rejects_foreign_answer_without_calling_model() {
        let llm = Arc::new(ScriptedLlm::new());
        let assessment = Assessment {
            questions: vec![question("Q", QuestionType::Essay, "A")],
            timer: None,
        };
        let answers = vec![UserAnswer {
            question_id: QuestionId::new(),
            answer: "stray".into(),
        }];
        let err = flows(&llm)
            .evaluate_assessment(&assessment, &answers)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_evaluation_with_missing_result_fails() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.reply(Flow::Evaluation, graded(&[1]));
        let assessment = Assessment {
            questions: vec![
                question("Q1", QuestionType::ShortAnswer, "A"),
                question("Q2", QuestionType::ShortAnswer, "B"),
            ],
            timer: None,
        };
        let err = flows(&llm)
            .evaluate_assessment(&assessment, &[])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to evaluate AI assessment.");
    }

    #[tokio::test]
    async fn test_chat_history_rendered_in_order() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.reply(Flow::Chat, json!({"response": "Mitochondria make ATP."}));
        let history = vec![
            ChatMessage {
                role: crate::domain::ChatRole::User,
                content: "What is a cell?".into(),
            },
            ChatMessage {
                role: crate::domain::ChatRole::Model,
                content: "The unit of life.".into(),
            },
        ];
        let reply = flows(&llm).ask("And mitochondria?", &history).await.unwrap();
        assert_eq!(reply.response, "Mitochondria make ATP.");

        let prompt = &llm.requests()[0].prompt;
        let user = prompt.find("user: What is a cell?").unwrap();
        let model = prompt.find("model: The unit of life.").unwrap();
        assert!(user < model);
        assert!(prompt.contains("And mitochondria?"));
    }
}
