//! Repository pattern for database operations

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use super::models::*;
use super::DbPool;
use crate::domain::{SourceType, StudyGuide, StudyMaterial, TestRecord, TestResultRecord};
use crate::errors::{AppError, Result};
use crate::store::{check_attempt_pair, DocumentStore};

/// Postgres-backed document store
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }
}

#[async_trait]
impl DocumentStore for Repository {
    async fn insert_material(&self, material: StudyMaterial) -> Result<()> {
        material_to_active(&material)?
            .insert(self.write_conn())
            .await?;
        Ok(())
    }

    async fn get_material(&self, user_id: &str, id: Uuid) -> Result<Option<StudyMaterial>> {
        StudyMaterialEntity::find_by_id(id)
            .filter(StudyMaterialColumn::UserId.eq(user_id))
            .one(self.read_conn())
            .await?
            .map(material_from_row)
            .transpose()
    }

    async fn list_materials(&self, user_id: &str, limit: Option<u64>) -> Result<Vec<StudyMaterial>> {
        let mut query = StudyMaterialEntity::find()
            .filter(StudyMaterialColumn::UserId.eq(user_id))
            .order_by_desc(StudyMaterialColumn::UploadDate);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        query
            .all(self.read_conn())
            .await?
            .into_iter()
            .map(material_from_row)
            .collect()
    }

    async fn count_materials(&self, user_id: &str) -> Result<u64> {
        StudyMaterialEntity::find()
            .filter(StudyMaterialColumn::UserId.eq(user_id))
            .count(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn attach_study_guide(&self, user_id: &str, material_id: Uuid, guide: StudyGuide) -> Result<()> {
        let guide = serde_json::to_value(&guide)?;
        let updated = StudyMaterialEntity::update_many()
            .col_expr(StudyMaterialColumn::StudyGuide, Expr::value(guide))
            .filter(StudyMaterialColumn::Id.eq(material_id))
            .filter(StudyMaterialColumn::UserId.eq(user_id))
            .exec(self.write_conn())
            .await?;

        if updated.rows_affected == 0 {
            return Err(AppError::MaterialNotFound {
                id: material_id.to_string(),
            });
        }
        Ok(())
    }

    async fn record_attempt(&self, test: TestRecord, result: TestResultRecord) -> Result<()> {
        check_attempt_pair(&test, &result)?;
        let test_row = test_to_active(&test)?;
        let result_row = result_to_active(&result)?;

        let txn = self.write_conn().begin().await?;
        test_row.insert(&txn).await?;
        result_row.insert(&txn).await?;
        txn.commit().await?;
        Ok(())
    }

    async fn list_tests_for_material(&self, user_id: &str, material_id: Uuid) -> Result<Vec<TestRecord>> {
        TestEntity::find()
            .filter(TestColumn::UserId.eq(user_id))
            .filter(TestColumn::StudyMaterialId.eq(material_id))
            .order_by_desc(TestColumn::CreationDate)
            .all(self.read_conn())
            .await?
            .into_iter()
            .map(test_from_row)
            .collect()
    }

    async fn get_test(&self, user_id: &str, test_id: Uuid) -> Result<Option<TestRecord>> {
        TestEntity::find_by_id(test_id)
            .filter(TestColumn::UserId.eq(user_id))
            .one(self.read_conn())
            .await?
            .map(test_from_row)
            .transpose()
    }

    async fn list_results(&self, user_id: &str, material_id: Option<Uuid>) -> Result<Vec<TestResultRecord>> {
        let mut query = TestResultEntity::find().filter(TestResultColumn::UserId.eq(user_id));
        if let Some(material_id) = material_id {
            query = query.filter(TestResultColumn::StudyMaterialId.eq(material_id));
        }

        query
            .order_by_desc(TestResultColumn::CompletionDate)
            .all(self.read_conn())
            .await?
            .into_iter()
            .map(result_from_row)
            .collect()
    }

    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }
}

fn narrow<T: TryFrom<i64>>(value: i64, column: &str) -> Result<T> {
    T::try_from(value).map_err(|_| AppError::Internal {
        message: format!("Stored {column} out of range: {value}"),
    })
}

fn material_to_active(material: &StudyMaterial) -> Result<StudyMaterialActiveModel> {
    let study_guide = material
        .study_guide
        .as_ref()
        .map(serde_json::to_value)
        .transpose()?;

    Ok(StudyMaterialActiveModel {
        id: Set(material.id),
        user_id: Set(material.user_id.clone()),
        title: Set(material.title.clone()),
        source_type: Set(material.source_type.as_str().to_string()),
        source_url: Set(material.source_url.clone()),
        extracted_text: Set(material.extracted_text.clone()),
        upload_date: Set(material.upload_date.into()),
        study_guide: Set(study_guide),
    })
}

fn material_from_row(row: StudyMaterialRow) -> Result<StudyMaterial> {
    let source_type = SourceType::parse(&row.source_type).ok_or_else(|| AppError::Internal {
        message: format!("Unknown source type stored: {}", row.source_type),
    })?;
    let study_guide = row.study_guide.map(serde_json::from_value).transpose()?;

    Ok(StudyMaterial {
        id: row.id,
        user_id: row.user_id,
        title: row.title,
        source_type,
        source_url: row.source_url,
        extracted_text: row.extracted_text,
        upload_date: row.upload_date.with_timezone(&Utc),
        study_guide,
    })
}

fn test_to_active(test: &TestRecord) -> Result<TestActiveModel> {
    Ok(TestActiveModel {
        id: Set(test.id),
        user_id: Set(test.user_id.clone()),
        study_material_id: Set(test.study_material_id),
        test_type: Set(test.test_type.clone()),
        question_count: Set(narrow(i64::from(test.question_count), "question_count")?),
        timer: Set(test
            .timer
            .map(|minutes| narrow(i64::from(minutes), "timer"))
            .transpose()?),
        passing_score: Set(i32::from(test.passing_score)),
        creation_date: Set(test.creation_date.into()),
        assessment: Set(serde_json::to_value(&test.assessment)?),
        user_answers: Set(serde_json::to_value(&test.user_answers)?),
    })
}

fn test_from_row(row: TestRow) -> Result<TestRecord> {
    Ok(TestRecord {
        id: row.id,
        user_id: row.user_id,
        study_material_id: row.study_material_id,
        test_type: row.test_type,
        question_count: narrow(i64::from(row.question_count), "question_count")?,
        timer: row
            .timer
            .map(|minutes| narrow(i64::from(minutes), "timer"))
            .transpose()?,
        passing_score: narrow(i64::from(row.passing_score), "passing_score")?,
        creation_date: row.creation_date.with_timezone(&Utc),
        assessment: serde_json::from_value(row.assessment)?,
        user_answers: serde_json::from_value(row.user_answers)?,
    })
}

fn result_to_active(result: &TestResultRecord) -> Result<TestResultActiveModel> {
    Ok(TestResultActiveModel {
        id: Set(result.id),
        test_id: Set(result.test_id),
        user_id: Set(result.user_id.clone()),
        study_material_id: Set(result.study_material_id),
        score: Set(i32::from(result.score)),
        completion_date: Set(result.completion_date.into()),
        performance_summary: Set(result.performance_summary.clone()),
        recommendations: Set(result.recommendations.clone()),
        evaluation: Set(serde_json::to_value(&result.evaluation)?),
    })
}

fn result_from_row(row: TestResultRow) -> Result<TestResultRecord> {
    Ok(TestResultRecord {
        id: row.id,
        test_id: row.test_id,
        user_id: row.user_id,
        study_material_id: row.study_material_id,
        score: narrow(i64::from(row.score), "score")?,
        completion_date: row.completion_date.with_timezone(&Utc),
        performance_summary: row.performance_summary,
        recommendations: row.recommendations,
        evaluation: serde_json::from_value(row.evaluation)?,
    })
}
