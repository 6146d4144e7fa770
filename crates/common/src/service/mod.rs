//! Study pipeline for one user at a time
//!
//! Ties acquisition, the AI flows, open attempts and the document store
//! together. Writes come back as [`PendingWrite`] handles so callers can
//! show the optimistic value right away and still learn when it landed.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::acquisition::{process_sequentially, AcquiredContent, BatchOutcome, ContentAcquirer};
use crate::attempt::{AttemptLimits, AttemptRegistry, AttemptStatus, AttemptView, ClosedAttempt};
use crate::config::AcquisitionConfig;
use crate::domain::{
    Assessment, AssessmentEvaluation, ChatReply, PastTest, QuestionId, SourceType, StudyMaterial,
    TestRecord, TestResultRecord, UserAnswer,
};
use crate::errors::{AppError, Result};
use crate::flows::AiFlows;
use crate::metrics;
use crate::progress::ProgressOverview;
use crate::store::{DocumentStore, PendingWrite};
use crate::validation::{
    AssessmentConfig, ChatRequest, FileUpload, FormInput, TextMaterialInput, UrlMaterialInput,
};

/// An evaluation together with the records it was stored under
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedEvaluation {
    pub test_id: Uuid,
    pub result_id: Uuid,
    pub evaluation: AssessmentEvaluation,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct History {
    pub materials: Vec<StudyMaterial>,
    pub results: Vec<TestResultRecord>,
}

struct Inner {
    store: Arc<dyn DocumentStore>,
    flows: AiFlows,
    acquirer: ContentAcquirer,
    attempts: AttemptRegistry,
}

#[derive(Clone)]
pub struct StudyService {
    inner: Arc<Inner>,
}

impl StudyService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        flows: AiFlows,
        acquisition: AcquisitionConfig,
        attempt_limits: AttemptLimits,
    ) -> Result<Self> {
        let acquirer = ContentAcquirer::new(flows.clone(), acquisition)?;
        Ok(Self {
            inner: Arc::new(Inner {
                store,
                flows,
                acquirer,
                attempts: AttemptRegistry::new(attempt_limits),
            }),
        })
    }

    pub async fn ping(&self) -> Result<()> {
        self.inner.store.ping().await
    }

    // ---- materials ----

    pub async fn create_material_from_text(
        &self,
        user_id: &str,
        input: &TextMaterialInput,
    ) -> Result<PendingWrite<StudyMaterial>> {
        let content = self.inner.acquirer.from_text(input).await?;
        Ok(self.persist_material(user_id, content))
    }

    pub async fn create_material_from_url(
        &self,
        user_id: &str,
        input: &UrlMaterialInput,
    ) -> Result<PendingWrite<StudyMaterial>> {
        let content = self.inner.acquirer.from_url(input).await?;
        Ok(self.persist_material(user_id, content))
    }

    pub async fn create_material_from_file(
        &self,
        user_id: &str,
        upload: &FileUpload,
        source: SourceType,
    ) -> Result<PendingWrite<StudyMaterial>> {
        let content = self.inner.acquirer.from_file(upload, source).await?;
        Ok(self.persist_material(user_id, content))
    }

    /// Upload several files one after another. Each material is stored
    /// before the next file starts; failures are collected, not fatal.
    pub async fn create_materials_from_files(
        &self,
        user_id: &str,
        uploads: Vec<FileUpload>,
        source: SourceType,
    ) -> BatchOutcome {
        let outcome = process_sequentially(uploads, |upload| async move {
            self.create_material_from_file(user_id, &upload, source)
                .await?
                .wait()
                .await
        })
        .await;

        tracing::info!(
            user_id = %user_id,
            created = outcome.created.len(),
            failed = outcome.failures.len(),
            "Processed file batch"
        );
        outcome
    }

    fn persist_material(&self, user_id: &str, content: AcquiredContent) -> PendingWrite<StudyMaterial> {
        let material = StudyMaterial::new(
            user_id,
            content.title,
            content.source_type,
            content.source_url,
            content.text,
        );
        metrics::record_material_created(material.source_type.as_str());
        tracing::info!(
            user_id = %user_id,
            material_id = %material.id,
            source = material.source_type.as_str(),
            "Study material created"
        );

        let store = self.inner.store.clone();
        let row = material.clone();
        PendingWrite::spawn(material, async move { store.insert_material(row).await })
    }

    pub async fn material(&self, user_id: &str, material_id: Uuid) -> Result<StudyMaterial> {
        self.inner
            .store
            .get_material(user_id, material_id)
            .await?
            .ok_or_else(|| AppError::MaterialNotFound {
                id: material_id.to_string(),
            })
    }

    pub async fn list_materials(&self, user_id: &str, limit: Option<u64>) -> Result<Vec<StudyMaterial>> {
        self.inner.store.list_materials(user_id, limit).await
    }

    /// Material with usable text, for the flows that read it
    async fn material_with_text(&self, user_id: &str, material_id: Uuid) -> Result<StudyMaterial> {
        let material = self.material(user_id, material_id).await?;
        if material.extracted_text.trim().is_empty() {
            return Err(AppError::validation(
                "extractedText",
                "Could not find content for this material.",
            ));
        }
        Ok(material)
    }

    // ---- study aids ----

    /// Generate a fresh guide and merge it into the material. The returned
    /// value is the material as it will read once the merge lands.
    pub async fn generate_study_guide(
        &self,
        user_id: &str,
        material_id: Uuid,
        use_online_sources: bool,
    ) -> Result<PendingWrite<StudyMaterial>> {
        let mut material = self.material_with_text(user_id, material_id).await?;
        let guide = self
            .inner
            .flows
            .generate_study_guide(&material.extracted_text, use_online_sources)
            .await?;
        tracing::info!(
            user_id = %user_id,
            material_id = %material_id,
            guide_id = %guide.id,
            use_online_sources,
            "Study guide generated"
        );

        let store = self.inner.store.clone();
        let user = user_id.to_string();
        let stored = guide.clone();
        material.study_guide = Some(guide);
        Ok(PendingWrite::spawn(material, async move {
            store.attach_study_guide(&user, material_id, stored).await
        }))
    }

    pub async fn generate_assessment(
        &self,
        user_id: &str,
        material_id: Uuid,
        config: &AssessmentConfig,
    ) -> Result<Assessment> {
        let material = self.material_with_text(user_id, material_id).await?;
        let assessment = self
            .inner
            .flows
            .generate_assessment(&material.extracted_text, config)
            .await?;
        tracing::info!(
            user_id = %user_id,
            material_id = %material_id,
            questions = assessment.questions.len(),
            "Assessment generated"
        );
        Ok(assessment)
    }

    /// Grade the answers and store the test and its result together
    pub async fn evaluate_and_record(
        &self,
        user_id: &str,
        material_id: Uuid,
        assessment: Assessment,
        answers: Vec<UserAnswer>,
    ) -> Result<PendingWrite<RecordedEvaluation>> {
        self.material(user_id, material_id).await?;
        let evaluation = self
            .inner
            .flows
            .evaluate_assessment(&assessment, &answers)
            .await?;

        let test = TestRecord::new(user_id, material_id, assessment, answers);
        let result = TestResultRecord::for_test(&test, evaluation.clone());
        metrics::record_evaluation(result.score);
        tracing::info!(
            user_id = %user_id,
            material_id = %material_id,
            test_id = %test.id,
            score = result.score,
            "Assessment evaluated"
        );

        let recorded = RecordedEvaluation {
            test_id: test.id,
            result_id: result.id,
            evaluation,
        };
        let store = self.inner.store.clone();
        Ok(PendingWrite::spawn(recorded, async move {
            store.record_attempt(test, result).await
        }))
    }

    // ---- attempts ----

    /// Generate an assessment and start collecting answers for it. Timed
    /// attempts submit themselves when the timer runs out.
    pub async fn open_attempt(
        &self,
        user_id: &str,
        material_id: Uuid,
        config: &AssessmentConfig,
    ) -> Result<AttemptView> {
        let assessment = self.generate_assessment(user_id, material_id, config).await?;
        let service = self.clone();
        let view = self
            .inner
            .attempts
            .open(user_id, material_id, assessment, move |closed| async move {
                service
                    .record_closed_attempt(closed)
                    .await
                    .map(|recorded| recorded.test_id)
            })
            .await;

        tracing::info!(
            user_id = %user_id,
            attempt_id = %view.attempt_id,
            timed = view.deadline.is_some(),
            "Assessment attempt opened"
        );
        Ok(view)
    }

    pub async fn record_answer(
        &self,
        user_id: &str,
        attempt_id: Uuid,
        question_id: QuestionId,
        answer: String,
    ) -> Result<()> {
        self.inner
            .attempts
            .record_answer(user_id, attempt_id, question_id, answer)
            .await
    }

    /// Manual submit. Loses to an auto-submit that already closed the attempt.
    pub async fn submit_attempt(&self, user_id: &str, attempt_id: Uuid) -> Result<RecordedEvaluation> {
        let closed = self.inner.attempts.close(user_id, attempt_id).await?;
        let outcome = self.record_closed_attempt(closed).await;
        self.inner
            .attempts
            .complete(attempt_id, &outcome.as_ref().map(|r| r.test_id))
            .await;
        outcome
    }

    pub async fn attempt_status(&self, user_id: &str, attempt_id: Uuid) -> Result<AttemptStatus> {
        self.inner.attempts.status(user_id, attempt_id).await
    }

    async fn record_closed_attempt(&self, closed: ClosedAttempt) -> Result<RecordedEvaluation> {
        let outcome = async {
            self.evaluate_and_record(
                &closed.user_id,
                closed.study_material_id,
                closed.assessment,
                closed.answers,
            )
            .await?
            .wait()
            .await
        }
        .await;

        if let Err(err) = &outcome {
            tracing::warn!(
                attempt_id = %closed.attempt_id,
                error = %err,
                "Attempt submission failed"
            );
        }
        outcome
    }

    // ---- history ----

    /// Past tests of one material with their results, newest completion
    /// first. Tests without a stored result are left out.
    pub async fn past_tests(&self, user_id: &str, material_id: Uuid) -> Result<Vec<PastTest>> {
        let tests = self
            .inner
            .store
            .list_tests_for_material(user_id, material_id)
            .await?;
        let mut results: HashMap<Uuid, TestResultRecord> = self
            .inner
            .store
            .list_results(user_id, Some(material_id))
            .await?
            .into_iter()
            .map(|r| (r.test_id, r))
            .collect();

        let mut past: Vec<PastTest> = tests
            .into_iter()
            .filter_map(|test| results.remove(&test.id).map(|result| PastTest { test, result }))
            .collect();
        past.sort_by(|a, b| b.result.completion_date.cmp(&a.result.completion_date));
        Ok(past)
    }

    /// One stored test with its result, for replaying a single review
    pub async fn past_test(&self, user_id: &str, test_id: Uuid) -> Result<PastTest> {
        let not_found = || AppError::TestNotFound {
            id: test_id.to_string(),
        };
        let test = self
            .inner
            .store
            .get_test(user_id, test_id)
            .await?
            .ok_or_else(not_found)?;
        let result = self
            .inner
            .store
            .list_results(user_id, Some(test.study_material_id))
            .await?
            .into_iter()
            .find(|r| r.test_id == test.id)
            .ok_or_else(not_found)?;
        Ok(PastTest { test, result })
    }

    pub async fn history(&self, user_id: &str) -> Result<History> {
        let materials = self.inner.store.list_materials(user_id, None).await?;
        let results = self.inner.store.list_results(user_id, None).await?;
        Ok(History { materials, results })
    }

    pub async fn progress(&self, user_id: &str, today: NaiveDate) -> Result<ProgressOverview> {
        let total_materials = self.inner.store.count_materials(user_id).await?;
        let results = self.inner.store.list_results(user_id, None).await?;
        Ok(ProgressOverview::build(total_materials, &results, today))
    }

    // ---- chat ----

    pub async fn ask(&self, request: &ChatRequest) -> Result<ChatReply> {
        request.check()?;
        self.inner.flows.ask(&request.query, &request.history).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{Flow, ScriptedLlm};
    use crate::domain::{QuestionType, MIXED_TEST_TYPE};
    use crate::store::MemoryStore;
    use chrono::Utc;
    use serde_json::json;
    use std::time::Duration;

    const NOTES: &str = "Photosynthesis converts light energy into chemical energy in chloroplasts.";

    fn service(llm: &Arc<ScriptedLlm>, store: &Arc<MemoryStore>) -> StudyService {
        StudyService::new(
            store.clone(),
            AiFlows::new(llm.clone(), true),
            AcquisitionConfig::default(),
            AttemptLimits::default(),
        )
        .unwrap()
    }

    fn text_input() -> TextMaterialInput {
        TextMaterialInput {
            title: "Photosynthesis".into(),
            content: NOTES.into(),
        }
    }

    fn one_question() -> serde_json::Value {
        json!({"questions": [{
            "questionText": "Where does photosynthesis happen?",
            "questionType": "short_answer",
            "correctAnswer": "Chloroplasts",
            "explanation": "Chloroplasts hold chlorophyll."
        }]})
    }

    fn evaluation(score: u8) -> serde_json::Value {
        let correct = score > 50;
        json!({
            "overallScore": score,
            "strengthSummary": "Knows the organelle",
            "weaknessAnalysis": "Vague on pigments",
            "results": [{"questionNumber": 1, "isCorrect": correct, "feedback": "ok"}]
        })
    }

    fn short_answer_config(timer: Option<u32>) -> AssessmentConfig {
        AssessmentConfig::new(1, vec![QuestionType::ShortAnswer], timer)
    }

    async fn stored_material(service: &StudyService) -> StudyMaterial {
        service
            .create_material_from_text("alice", &text_input())
            .await
            .unwrap()
            .wait()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_text_material_lands_in_store() {
        let llm = Arc::new(ScriptedLlm::new());
        let store = Arc::new(MemoryStore::new());
        let service = service(&llm, &store);

        let pending = service
            .create_material_from_text("alice", &text_input())
            .await
            .unwrap();
        assert_eq!(pending.value().extracted_text, NOTES);
        let material = pending.wait().await.unwrap();

        assert_eq!(service.material("alice", material.id).await.unwrap(), material);
        assert!(matches!(
            service.material("bob", material.id).await,
            Err(AppError::MaterialNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_batch_reports_failures_and_keeps_going() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.reply(Flow::ExtractFile, json!({"content": "Page one text"}))
            .fail(Flow::ExtractFile, "model unavailable")
            .reply(Flow::ExtractFile, json!({"content": "Page three text"}));
        let store = Arc::new(MemoryStore::new());
        let service = service(&llm, &store);

        let uploads = vec![
            FileUpload::new("one.png", "image/png", vec![1]),
            FileUpload::new("two.png", "image/png", vec![2]),
            FileUpload::new("three.png", "image/png", vec![3]),
        ];
        let outcome = service
            .create_materials_from_files("alice", uploads, SourceType::File)
            .await;

        assert_eq!(outcome.created.len(), 2);
        assert_eq!(
            outcome.summary().as_deref(),
            Some("Failed to process 1 file: two.png")
        );
        assert_eq!(store.count_materials("alice").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_study_guide_merges_into_material() {
        let llm = Arc::new(ScriptedLlm::new());
        let store = Arc::new(MemoryStore::new());
        let service = service(&llm, &store);
        let material = stored_material(&service).await;

        llm.reply(
            Flow::StudyGuide,
            json!({
                "summary": "Plants make sugar from light.",
                "keyPoints": ["Chlorophyll absorbs light"],
                "definitions": [], "concepts": [], "examples": [], "mnemonics": []
            }),
        );
        let updated = service
            .generate_study_guide("alice", material.id, false)
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();

        let stored = service.material("alice", material.id).await.unwrap();
        assert_eq!(stored, updated);
        assert_eq!(stored.extracted_text, material.extracted_text);
        assert!(stored.study_guide.is_some());
    }

    #[tokio::test]
    async fn test_evaluate_and_record_links_answers_by_id() {
        let llm = Arc::new(ScriptedLlm::new());
        let store = Arc::new(MemoryStore::new());
        let service = service(&llm, &store);
        let material = stored_material(&service).await;

        llm.reply(Flow::Assessment, one_question())
            .reply(Flow::Evaluation, evaluation(100));
        let assessment = service
            .generate_assessment("alice", material.id, &short_answer_config(None))
            .await
            .unwrap();
        let answers = vec![UserAnswer {
            question_id: assessment.questions[0].id,
            answer: "Chloroplasts".into(),
        }];

        let recorded = service
            .evaluate_and_record("alice", material.id, assessment.clone(), answers.clone())
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();
        assert_eq!(recorded.evaluation.overall_score, 100);
        assert_eq!(
            recorded.evaluation.results[0].question_id,
            assessment.questions[0].id
        );

        let past = service.past_tests("alice", material.id).await.unwrap();
        assert_eq!(past.len(), 1);
        assert_eq!(past[0].test.id, recorded.test_id);
        assert_eq!(past[0].test.test_type, MIXED_TEST_TYPE);
        assert_eq!(past[0].test.user_answers, answers);
        assert_eq!(past[0].result.score, 100);
        assert_eq!(
            past[0].result.performance_summary,
            "Strengths: Knows the organelle. Weaknesses: Vague on pigments"
        );

        let single = service.past_test("alice", recorded.test_id).await.unwrap();
        assert_eq!(single.result.id, recorded.result_id);
        assert!(matches!(
            service.past_test("bob", recorded.test_id).await,
            Err(AppError::TestNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_foreign_material_rejected_before_model() {
        let llm = Arc::new(ScriptedLlm::new());
        let store = Arc::new(MemoryStore::new());
        let service = service(&llm, &store);
        let material = stored_material(&service).await;

        let err = service
            .generate_assessment("bob", material.id, &short_answer_config(None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MaterialNotFound { .. }));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_manual_submit_records_once() {
        let llm = Arc::new(ScriptedLlm::new());
        let store = Arc::new(MemoryStore::new());
        let service = service(&llm, &store);
        let material = stored_material(&service).await;

        llm.reply(Flow::Assessment, one_question())
            .reply(Flow::Evaluation, evaluation(40));
        let view = service
            .open_attempt("alice", material.id, &short_answer_config(None))
            .await
            .unwrap();
        service
            .record_answer("alice", view.attempt_id, view.assessment.questions[0].id, "Leaves".into())
            .await
            .unwrap();

        let recorded = service.submit_attempt("alice", view.attempt_id).await.unwrap();
        assert_eq!(recorded.evaluation.overall_score, 40);
        assert!(matches!(
            service.submit_attempt("alice", view.attempt_id).await,
            Err(AppError::AttemptClosed { .. })
        ));
        assert_eq!(
            service.attempt_status("alice", view.attempt_id).await.unwrap(),
            AttemptStatus::Completed { test_id: recorded.test_id }
        );
        assert_eq!(store.list_results("alice", None).await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_attempt_auto_submits() {
        let llm = Arc::new(ScriptedLlm::new());
        let store = Arc::new(MemoryStore::new());
        let service = service(&llm, &store);
        let material = stored_material(&service).await;

        llm.reply(Flow::Assessment, one_question())
            .reply(Flow::Evaluation, evaluation(0));
        let view = service
            .open_attempt("alice", material.id, &short_answer_config(Some(1)))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(61)).await;
        let mut status = service.attempt_status("alice", view.attempt_id).await.unwrap();
        for _ in 0..100 {
            if matches!(status, AttemptStatus::Completed { .. }) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            status = service.attempt_status("alice", view.attempt_id).await.unwrap();
        }
        assert!(matches!(status, AttemptStatus::Completed { .. }));

        let prompt = &llm.requests_for(Flow::Evaluation)[0].prompt;
        assert!(prompt.contains("Not Answered"));
        // The outcome was read, so the slot is gone
        assert!(matches!(
            service.submit_attempt("alice", view.attempt_id).await,
            Err(AppError::AttemptNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_progress_counts_materials_and_tests() {
        let llm = Arc::new(ScriptedLlm::new());
        let store = Arc::new(MemoryStore::new());
        let service = service(&llm, &store);
        let material = stored_material(&service).await;

        llm.reply(Flow::Assessment, one_question())
            .reply(Flow::Evaluation, evaluation(75));
        let assessment = service
            .generate_assessment("alice", material.id, &short_answer_config(None))
            .await
            .unwrap();
        service
            .evaluate_and_record("alice", material.id, assessment, vec![])
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();

        let overview = service
            .progress("alice", Utc::now().date_naive())
            .await
            .unwrap();
        assert_eq!(overview.total_materials, 1);
        assert_eq!(overview.tests_taken, 1);
        assert_eq!(overview.average_score, 75);
        assert_eq!(overview.chart.last().unwrap().score, 75);

        let history = service.history("alice").await.unwrap();
        assert_eq!(history.materials.len(), 1);
        assert_eq!(history.results.len(), 1);
    }

    #[tokio::test]
    async fn test_blank_chat_query_rejected() {
        let llm = Arc::new(ScriptedLlm::new());
        let store = Arc::new(MemoryStore::new());
        let err = service(&llm, &store)
            .ask(&ChatRequest {
                query: "  ".into(),
                history: vec![],
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Please enter a question.");
        assert_eq!(llm.call_count(), 0);
    }
}
