//! Per-user document store
//!
//! Materials, tests and results are always read and written in the scope of
//! one user. Nothing is deleted; the only update is merging a study guide
//! into its material.

mod memory;
mod pending;

pub use memory::MemoryStore;
pub use pending::PendingWrite;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{StudyGuide, StudyMaterial, TestRecord, TestResultRecord};
use crate::errors::{AppError, Result};

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_material(&self, material: StudyMaterial) -> Result<()>;

    async fn get_material(&self, user_id: &str, id: Uuid) -> Result<Option<StudyMaterial>>;

    /// Newest upload first
    async fn list_materials(&self, user_id: &str, limit: Option<u64>) -> Result<Vec<StudyMaterial>>;

    async fn count_materials(&self, user_id: &str) -> Result<u64>;

    /// Merge `guide` into the material, leaving every other field untouched.
    /// Fails with `MaterialNotFound` if the user does not own the material.
    async fn attach_study_guide(&self, user_id: &str, material_id: Uuid, guide: StudyGuide) -> Result<()>;

    /// Append a test and its result together
    async fn record_attempt(&self, test: TestRecord, result: TestResultRecord) -> Result<()>;

    /// Newest first
    async fn list_tests_for_material(&self, user_id: &str, material_id: Uuid) -> Result<Vec<TestRecord>>;

    async fn get_test(&self, user_id: &str, test_id: Uuid) -> Result<Option<TestRecord>>;

    /// Newest completion first, optionally limited to one material
    async fn list_results(&self, user_id: &str, material_id: Option<Uuid>) -> Result<Vec<TestResultRecord>>;

    async fn ping(&self) -> Result<()>;
}

/// Checks shared by every backend before a test and result are appended
pub(crate) fn check_attempt_pair(test: &TestRecord, result: &TestResultRecord) -> Result<()> {
    if result.test_id != test.id
        || result.user_id != test.user_id
        || result.study_material_id != test.study_material_id
    {
        return Err(AppError::Internal {
            message: format!(
                "Test result {} does not belong to test {}",
                result.id, test.id
            ),
        });
    }
    Ok(())
}
