//! Study material handlers

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use cognify_common::{
    acquisition::BatchOutcome,
    auth::AuthContext,
    domain::{SourceType, StudyMaterial},
    errors::{AppError, Result},
    validation::{FileUpload, TextMaterialInput, UrlMaterialInput},
};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    /// `file` (default) or `outline`
    pub source: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    #[serde(flatten)]
    pub outcome: BatchOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Create a material from pasted text
pub async fn create_from_text(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(input): Json<TextMaterialInput>,
) -> Result<(StatusCode, Json<StudyMaterial>)> {
    let material = state
        .service
        .create_material_from_text(&auth.user_id, &input)
        .await?
        .wait()
        .await?;
    Ok((StatusCode::CREATED, Json(material)))
}

/// Create a material from the article text of a web page
pub async fn create_from_url(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(input): Json<UrlMaterialInput>,
) -> Result<(StatusCode, Json<StudyMaterial>)> {
    let material = state
        .service
        .create_material_from_url(&auth.user_id, &input)
        .await?
        .wait()
        .await?;
    Ok((StatusCode::CREATED, Json(material)))
}

/// Upload one or more files (multipart, any field name). Files are OCR'd
/// one at a time; failures are reported per file. Fields without a file
/// name are ignored.
///
/// This route is not under the request timeout; each file is bounded by
/// `acquisition.file_timeout_secs` instead.
pub async fn upload_files(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    let source = match query.source.as_deref() {
        None => SourceType::File,
        Some(raw) => match SourceType::parse(raw) {
            Some(source @ (SourceType::File | SourceType::Outline)) => source,
            _ => {
                return Err(AppError::validation(
                    "source",
                    "Source must be either file or outline.",
                ))
            }
        },
    };

    let mut uploads = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation("files", e.body_text()))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::validation("files", e.body_text()))?;
        uploads.push(FileUpload::new(file_name, mime_type, bytes.to_vec()));
    }

    if uploads.is_empty() {
        return Err(AppError::validation("files", "Please upload a file."));
    }

    let outcome = state
        .service
        .create_materials_from_files(&auth.user_id, uploads, source)
        .await;

    let status = if outcome.is_complete() {
        StatusCode::CREATED
    } else if outcome.created.is_empty() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::MULTI_STATUS
    };
    let message = outcome.summary();
    if let Some(summary) = &message {
        tracing::warn!(
            request_id = %auth.request_id,
            user_id = %auth.user_id,
            summary = %summary,
            "File batch finished with failures"
        );
    }
    Ok((status, Json(UploadResponse { outcome, message })))
}

/// List the caller's materials, newest first
pub async fn list_materials(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<StudyMaterial>>> {
    let materials = state
        .service
        .list_materials(&auth.user_id, query.limit)
        .await?;
    Ok(Json(materials))
}

pub async fn get_material(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(material_id): Path<Uuid>,
) -> Result<Json<StudyMaterial>> {
    let material = state.service.material(&auth.user_id, material_id).await?;
    Ok(Json(material))
}
