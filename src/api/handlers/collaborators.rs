use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::Collaborator,
    services::{albums::AlbumsService, auth::Claims},
    AppState,
};

use super::super::{
    extract::{AppJson, AppPath},
    middleware::get_user_id,
};

pub async fn list_collaborators(
    State(state): State<AppState>,
    AppPath(album_id): AppPath<Uuid>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<Collaborator>>> {
    let user_id = get_user_id(&claims)?;

    let albums_service = AlbumsService::new(state.store, state.objects);
    let collaborators = albums_service.list_collaborators(album_id, user_id).await?;

    Ok(Json(collaborators))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCollaboratorRequest {
    #[serde(alias = "user_id")]
    pub user_id: Uuid,
}

pub async fn add_collaborator(
    State(state): State<AppState>,
    AppPath(album_id): AppPath<Uuid>,
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<AddCollaboratorRequest>,
) -> AppResult<(StatusCode, Json<Collaborator>)> {
    let user_id = get_user_id(&claims)?;

    let albums_service = AlbumsService::new(state.store, state.objects);
    let collaborator = albums_service
        .add_collaborator(album_id, user_id, req.user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(collaborator)))
}

pub async fn remove_collaborator(
    State(state): State<AppState>,
    AppPath((album_id, collaborator_id)): AppPath<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> AppResult<StatusCode> {
    let user_id = get_user_id(&claims)?;

    let albums_service = AlbumsService::new(state.store, state.objects);
    albums_service
        .remove_collaborator(album_id, user_id, collaborator_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
