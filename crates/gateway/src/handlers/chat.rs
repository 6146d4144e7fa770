use axum::{extract::State, Json};

use crate::AppState;
use cognify_common::{
    auth::AuthContext,
    domain::ChatReply,
    errors::Result,
    validation::ChatRequest,
};

/// One chat turn. The client resends the full history each time.
pub async fn ask(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>> {
    tracing::debug!(
        request_id = %auth.request_id,
        user_id = %auth.user_id,
        turns = request.history.len(),
        "Chat query"
    );
    Ok(Json(state.service.ask(&request).await?))
}
