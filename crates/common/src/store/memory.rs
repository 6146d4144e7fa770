use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{check_attempt_pair, DocumentStore};
use crate::domain::{StudyGuide, StudyMaterial, TestRecord, TestResultRecord};
use crate::errors::{AppError, Result};

#[derive(Default)]
struct UserDocuments {
    materials: HashMap<Uuid, StudyMaterial>,
    tests: HashMap<Uuid, TestRecord>,
    results: Vec<TestResultRecord>,
}

/// In-process store, one document tree per user
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, UserDocuments>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_material(&self, material: StudyMaterial) -> Result<()> {
        let mut users = self.users.write().await;
        users
            .entry(material.user_id.clone())
            .or_default()
            .materials
            .insert(material.id, material);
        Ok(())
    }

    async fn get_material(&self, user_id: &str, id: Uuid) -> Result<Option<StudyMaterial>> {
        let users = self.users.read().await;
        Ok(users
            .get(user_id)
            .and_then(|docs| docs.materials.get(&id))
            .cloned())
    }

    async fn list_materials(&self, user_id: &str, limit: Option<u64>) -> Result<Vec<StudyMaterial>> {
        let users = self.users.read().await;
        let mut materials: Vec<StudyMaterial> = users
            .get(user_id)
            .map(|docs| docs.materials.values().cloned().collect())
            .unwrap_or_default();
        materials.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
        if let Some(limit) = limit {
            materials.truncate(limit as usize);
        }
        Ok(materials)
    }

    async fn count_materials(&self, user_id: &str) -> Result<u64> {
        let users = self.users.read().await;
        Ok(users.get(user_id).map_or(0, |docs| docs.materials.len() as u64))
    }

    async fn attach_study_guide(&self, user_id: &str, material_id: Uuid, guide: StudyGuide) -> Result<()> {
        let mut users = self.users.write().await;
        let material = users
            .get_mut(user_id)
            .and_then(|docs| docs.materials.get_mut(&material_id))
            .ok_or_else(|| AppError::MaterialNotFound {
                id: material_id.to_string(),
            })?;
        material.study_guide = Some(guide);
        Ok(())
    }

    async fn record_attempt(&self, test: TestRecord, result: TestResultRecord) -> Result<()> {
        check_attempt_pair(&test, &result)?;
        let mut users = self.users.write().await;
        let docs = users.entry(test.user_id.clone()).or_default();
        docs.tests.insert(test.id, test);
        docs.results.push(result);
        Ok(())
    }

    async fn list_tests_for_material(&self, user_id: &str, material_id: Uuid) -> Result<Vec<TestRecord>> {
        let users = self.users.read().await;
        let mut tests: Vec<TestRecord> = users
            .get(user_id)
            .map(|docs| {
                docs.tests
                    .values()
                    .filter(|t| t.study_material_id == material_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        tests.sort_by(|a, b| b.creation_date.cmp(&a.creation_date));
        Ok(tests)
    }

    async fn get_test(&self, user_id: &str, test_id: Uuid) -> Result<Option<TestRecord>> {
        let users = self.users.read().await;
        Ok(users
            .get(user_id)
            .and_then(|docs| docs.tests.get(&test_id))
            .cloned())
    }

    async fn list_results(&self, user_id: &str, material_id: Option<Uuid>) -> Result<Vec<TestResultRecord>> {
        let users = self.users.read().await;
        let mut results: Vec<TestResultRecord> = users
            .get(user_id)
            .map(|docs| {
                docs.results
                    .iter()
                    .filter(|r| material_id.map_or(true, |id| r.study_material_id == id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        results.sort_by(|a, b| b.completion_date.cmp(&a.completion_date));
        Ok(results)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Assessment, AssessmentEvaluation, Question, QuestionId, QuestionType, SourceType,
        StudyGuideContent, UserAnswer,
    };
    use chrono::{Duration, Utc};

    fn material(user: &str, title: &str) -> StudyMaterial {
        StudyMaterial::new(user, title, SourceType::Text, None, "x".repeat(60))
    }

    fn guide() -> StudyGuide {
        StudyGuide::stamp(StudyGuideContent {
            summary: "s".into(),
            key_points: vec!["k".into()],
            definitions: vec![],
            concepts: vec![],
            examples: vec![],
            mnemonics: vec![],
        })
    }

    fn attempt(user: &str, material_id: Uuid, score: u8) -> (TestRecord, TestResultRecord) {
        let question = Question {
            id: QuestionId::new(),
            question_text: "2+2".into(),
            question_type: QuestionType::ShortAnswer,
            options: None,
            correct_answer: "4".into(),
            explanation: "sum".into(),
        };
        let answers = vec![UserAnswer {
            question_id: question.id,
            answer: "4".into(),
        }];
        let test = TestRecord::new(
            user,
            material_id,
            Assessment {
                questions: vec![question],
                timer: None,
            },
            answers,
        );
        let result = TestResultRecord::for_test(
            &test,
            AssessmentEvaluation {
                overall_score: score,
                strength_summary: "s".into(),
                weakness_analysis: "w".into(),
                results: vec![],
            },
        );
        (test, result)
    }

    #[tokio::test]
    async fn test_materials_scoped_by_user_and_sorted() {
        let store = MemoryStore::new();
        let mut older = material("alice", "Older");
        older.upload_date = Utc::now() - Duration::hours(1);
        let newer = material("alice", "Newer");
        let foreign = material("bob", "Bob's");

        store.insert_material(older.clone()).await.unwrap();
        store.insert_material(newer.clone()).await.unwrap();
        store.insert_material(foreign.clone()).await.unwrap();

        let listed = store.list_materials("alice", None).await.unwrap();
        assert_eq!(listed.iter().map(|m| m.title.as_str()).collect::<Vec<_>>(), ["Newer", "Older"]);
        assert_eq!(store.list_materials("alice", Some(1)).await.unwrap().len(), 1);
        assert_eq!(store.count_materials("alice").await.unwrap(), 2);
        assert!(store.get_material("alice", foreign.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_attach_guide_merges_only_guide() {
        let store = MemoryStore::new();
        let original = material("alice", "Cells");
        store.insert_material(original.clone()).await.unwrap();

        let guide = guide();
        store
            .attach_study_guide("alice", original.id, guide.clone())
            .await
            .unwrap();

        let stored = store.get_material("alice", original.id).await.unwrap().unwrap();
        assert_eq!(stored.study_guide, Some(guide));
        assert_eq!(stored.extracted_text, original.extracted_text);
        assert_eq!(stored.upload_date, original.upload_date);
    }

    #[tokio::test]
    async fn test_attach_guide_to_foreign_material_fails() {
        let store = MemoryStore::new();
        let original = material("alice", "Cells");
        store.insert_material(original.clone()).await.unwrap();

        let err = store
            .attach_study_guide("bob", original.id, guide())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MaterialNotFound { .. }));
    }

    #[tokio::test]
    async fn test_attempt_round_trip_keeps_answer_links() {
        let store = MemoryStore::new();
        let material_id = Uuid::new_v4();
        let (test, result) = attempt("alice", material_id, 80);
        store.record_attempt(test.clone(), result.clone()).await.unwrap();

        let reloaded = store.get_test("alice", test.id).await.unwrap().unwrap();
        assert_eq!(reloaded, test);
        let answer = &reloaded.user_answers[0];
        assert!(reloaded.assessment.contains(&answer.question_id));

        assert_eq!(store.list_tests_for_material("alice", material_id).await.unwrap().len(), 1);
        assert_eq!(store.list_results("alice", Some(material_id)).await.unwrap(), vec![result]);
        assert!(store.list_results("alice", Some(Uuid::new_v4())).await.unwrap().is_empty());
        assert!(store.get_test("bob", test.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mismatched_pair_rejected() {
        let store = MemoryStore::new();
        let (test, _) = attempt("alice", Uuid::new_v4(), 80);
        let (_, other_result) = attempt("alice", Uuid::new_v4(), 40);
        assert!(store.record_attempt(test, other_result).await.is_err());
        assert!(store.list_results("alice", None).await.unwrap().is_empty());
    }
}
