//! Past tests, history and dashboard progress

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::AppState;
use cognify_common::{
    auth::AuthContext,
    domain::PastTest,
    errors::Result,
    progress::ProgressOverview,
    service::History,
};

/// Tests taken on one material with their results, for review
pub async fn past_tests(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(material_id): Path<Uuid>,
) -> Result<Json<Vec<PastTest>>> {
    let tests = state.service.past_tests(&auth.user_id, material_id).await?;
    Ok(Json(tests))
}

pub async fn past_test(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(test_id): Path<Uuid>,
) -> Result<Json<PastTest>> {
    Ok(Json(state.service.past_test(&auth.user_id, test_id).await?))
}

pub async fn history(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<History>> {
    Ok(Json(state.service.history(&auth.user_id).await?))
}

pub async fn progress(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ProgressOverview>> {
    let today = Utc::now().date_naive();
    Ok(Json(state.service.progress(&auth.user_id, today).await?))
}
