use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{SortOrder, Sticker},
    services::{
        auth::Claims,
        stickers::{StickersService, UploadFile, UploadOutcome},
    },
    AppState,
};

use super::super::{
    extract::{AppJson, AppPath},
    middleware::{get_optional_user_id, get_user_id},
};

const FILE_FIELDS: &[&str] = &["files", "files[]"];

pub async fn list_stickers(
    State(state): State<AppState>,
    AppPath(album_id): AppPath<Uuid>,
    claims: Option<Extension<Claims>>,
) -> AppResult<Json<Vec<Sticker>>> {
    let user_id = get_optional_user_id(claims.as_deref())?;

    let stickers_service = StickersService::new(state.store, state.objects);
    let stickers = stickers_service.list(album_id, user_id).await?;

    Ok(Json(stickers))
}

pub async fn upload_stickers(
    State(state): State<AppState>,
    AppPath(album_id): AppPath<Uuid>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<UploadOutcome>)> {
    let user_id = get_user_id(&claims)?;

    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(format!("Failed to read multipart field: {}", e))
    })? {
        let name = field.name().unwrap_or("").to_string();
        if !FILE_FIELDS.contains(&name.as_str()) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read file: {}", e)))?;

        files.push(UploadFile {
            file_name,
            content_type,
            data,
        });
    }

    if files.is_empty() {
        return Err(AppError::invalid("files", "No files provided"));
    }

    let stickers_service = StickersService::new(state.store, state.objects);
    let outcome = stickers_service
        .upload(album_id, user_id, files, state.config.upload.max_file_bytes)
        .await?;

    let status = if outcome.uploaded.is_empty() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::CREATED
    };

    Ok((status, Json(outcome)))
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub orders: Vec<SortOrder>,
}

pub async fn reorder_stickers(
    State(state): State<AppState>,
    AppPath(album_id): AppPath<Uuid>,
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<ReorderRequest>,
) -> AppResult<Json<Vec<Sticker>>> {
    let user_id = get_user_id(&claims)?;

    let stickers_service = StickersService::new(state.store, state.objects);
    let stickers = stickers_service
        .reorder(album_id, user_id, req.orders)
        .await?;

    Ok(Json(stickers))
}

#[derive(Debug, Deserialize)]
pub struct DeleteStickersRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct DeleteStickersResponse {
    pub deleted: usize,
}

pub async fn delete_stickers(
    State(state): State<AppState>,
    AppPath(album_id): AppPath<Uuid>,
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<DeleteStickersRequest>,
) -> AppResult<Json<DeleteStickersResponse>> {
    let user_id = get_user_id(&claims)?;

    let stickers_service = StickersService::new(state.store, state.objects);
    let deleted = stickers_service.delete(album_id, user_id, req.ids).await?;

    Ok(Json(DeleteStickersResponse { deleted }))
}
