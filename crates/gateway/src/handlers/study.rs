//! Study guide, assessment and evaluation handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use cognify_common::{
    auth::AuthContext,
    domain::{Assessment, StudyMaterial, UserAnswer},
    errors::Result,
    service::RecordedEvaluation,
    validation::{AssessmentConfig, StudyGuideRequest},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRequest {
    pub assessment: Assessment,
    #[serde(default)]
    pub user_answers: Vec<UserAnswer>,
}

/// Generate a study guide and merge it into the material
pub async fn generate_study_guide(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(material_id): Path<Uuid>,
    request: Option<Json<StudyGuideRequest>>,
) -> Result<Json<StudyMaterial>> {
    let Json(request) = request.unwrap_or_default();
    let material = state
        .service
        .generate_study_guide(&auth.user_id, material_id, request.use_online_sources)
        .await?
        .wait()
        .await?;
    Ok(Json(material))
}

/// Generate an assessment without opening an attempt
pub async fn generate_assessment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(material_id): Path<Uuid>,
    Json(config): Json<AssessmentConfig>,
) -> Result<Json<Assessment>> {
    let assessment = state
        .service
        .generate_assessment(&auth.user_id, material_id, &config)
        .await?;
    Ok(Json(assessment))
}

/// Grade a completed assessment and store it with its result
pub async fn evaluate(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(material_id): Path<Uuid>,
    Json(request): Json<EvaluationRequest>,
) -> Result<(StatusCode, Json<RecordedEvaluation>)> {
    let recorded = state
        .service
        .evaluate_and_record(
            &auth.user_id,
            material_id,
            request.assessment,
            request.user_answers,
        )
        .await?
        .wait()
        .await
        .inspect_err(|e| {
            tracing::error!(
                request_id = %auth.request_id,
                material_id = %material_id,
                error = %e,
                "Evaluation could not be stored"
            )
        })?;
    Ok((StatusCode::CREATED, Json(recorded)))
}
