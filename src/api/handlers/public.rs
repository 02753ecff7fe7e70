use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    error::{AppError, AppResult},
    services::albums::{AlbumWithStickers, AlbumsService},
    AppState,
};

use super::super::extract::AppPath;

/// Album page for anyone holding the link. Private albums are not found.
pub async fn get_public_album(
    State(state): State<AppState>,
    AppPath(slug): AppPath<String>,
) -> AppResult<Json<AlbumWithStickers>> {
    let albums_service = AlbumsService::new(state.store, state.objects);
    let page = albums_service.public_page(&slug).await?;

    Ok(Json(page))
}

/// Serves objects held by the in-memory object store in mock mode.
pub async fn get_object(
    State(state): State<AppState>,
    AppPath(key): AppPath<String>,
) -> AppResult<Response> {
    let (data, content_type) = state
        .objects
        .get(&key)
        .await?
        .ok_or(AppError::ObjectNotFound)?;

    Ok(([(header::CONTENT_TYPE, content_type)], data).into_response())
}
