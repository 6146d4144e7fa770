//! Assessment attempt handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use cognify_common::{
    attempt::{AttemptStatus, AttemptView},
    auth::AuthContext,
    domain::QuestionId,
    errors::Result,
    service::RecordedEvaluation,
    validation::AssessmentConfig,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    pub question_id: QuestionId,
    pub answer: String,
}

/// Generate an assessment and open an attempt on it
pub async fn open_attempt(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(material_id): Path<Uuid>,
    Json(config): Json<AssessmentConfig>,
) -> Result<(StatusCode, Json<AttemptView>)> {
    let view = state
        .service
        .open_attempt(&auth.user_id, material_id, &config)
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn attempt_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(attempt_id): Path<Uuid>,
) -> Result<Json<AttemptStatus>> {
    let status = state
        .service
        .attempt_status(&auth.user_id, attempt_id)
        .await?;
    Ok(Json(status))
}

pub async fn record_answer(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(attempt_id): Path<Uuid>,
    Json(request): Json<AnswerRequest>,
) -> Result<StatusCode> {
    state
        .service
        .record_answer(&auth.user_id, attempt_id, request.question_id, request.answer)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Submit now; 409 if the timer already submitted it
pub async fn submit_attempt(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(attempt_id): Path<Uuid>,
) -> Result<Json<RecordedEvaluation>> {
    let recorded = state
        .service
        .submit_attempt(&auth.user_id, attempt_id)
        .await
        .inspect_err(|e| {
            tracing::warn!(
                request_id = %auth.request_id,
                attempt_id = %attempt_id,
                error = %e,
                "Attempt submit failed"
            )
        })?;
    Ok(Json(recorded))
}
