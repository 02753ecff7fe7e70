use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Album, Visibility},
    services::{
        albums::{AlbumChanges, AlbumsService},
        auth::Claims,
    },
    AppState,
};

use super::super::{
    extract::{AppJson, AppPath},
    middleware::{get_optional_user_id, get_user_id},
};

pub async fn list_albums(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<Album>>> {
    let user_id = get_user_id(&claims)?;

    let albums_service = AlbumsService::new(state.store, state.objects);
    let albums = albums_service.list(user_id).await?;

    Ok(Json(albums))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlbumRequest {
    pub name: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default, alias = "cover_url")]
    pub cover_url: Option<String>,
}

pub async fn create_album(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<CreateAlbumRequest>,
) -> AppResult<(StatusCode, Json<Album>)> {
    let user_id = get_user_id(&claims)?;

    let albums_service = AlbumsService::new(state.store, state.objects);
    let album = albums_service
        .create(user_id, &req.name, req.visibility, req.cover_url)
        .await?;

    Ok((StatusCode::CREATED, Json(album)))
}

pub async fn get_album(
    State(state): State<AppState>,
    AppPath(album_id): AppPath<Uuid>,
    claims: Option<Extension<Claims>>,
) -> AppResult<Json<Album>> {
    let user_id = get_optional_user_id(claims.as_deref())?;

    let albums_service = AlbumsService::new(state.store, state.objects);
    let album = albums_service.get(album_id, user_id).await?;

    Ok(Json(album))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAlbumRequest {
    pub name: Option<String>,
    pub visibility: Option<Visibility>,
    #[serde(default, alias = "cover_url")]
    pub cover_url: Option<String>,
}

pub async fn update_album(
    State(state): State<AppState>,
    AppPath(album_id): AppPath<Uuid>,
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<UpdateAlbumRequest>,
) -> AppResult<Json<Album>> {
    let user_id = get_user_id(&claims)?;

    let albums_service = AlbumsService::new(state.store, state.objects);
    let album = albums_service
        .update(
            album_id,
            user_id,
            AlbumChanges {
                name: req.name,
                visibility: req.visibility,
                cover_url: req.cover_url,
            },
        )
        .await?;

    Ok(Json(album))
}

pub async fn delete_album(
    State(state): State<AppState>,
    AppPath(album_id): AppPath<Uuid>,
    Extension(claims): Extension<Claims>,
) -> AppResult<StatusCode> {
    let user_id = get_user_id(&claims)?;

    let albums_service = AlbumsService::new(state.store, state.objects);
    albums_service.delete(album_id, user_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
