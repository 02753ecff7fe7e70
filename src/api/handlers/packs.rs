use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::PackWithStickers,
    services::{
        auth::Claims,
        packs::{PacksService, Published},
    },
    AppState,
};

use super::super::{
    extract::{AppJson, AppPath},
    middleware::{get_optional_user_id, get_user_id},
};

fn packs_service(state: &AppState) -> PacksService {
    PacksService::new(
        state.store.clone(),
        state.objects.clone(),
        state.fetcher.clone(),
        state.config.archive.fetch_concurrency,
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePackRequest {
    #[serde(alias = "album_id")]
    pub album_id: Uuid,
    pub name: String,
    pub author: Option<String>,
    #[serde(alias = "sticker_ids")]
    pub sticker_ids: Vec<Uuid>,
}

pub async fn create_pack(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<CreatePackRequest>,
) -> AppResult<(StatusCode, Json<PackWithStickers>)> {
    let user_id = get_user_id(&claims)?;

    let pack = packs_service(&state)
        .create(
            user_id,
            req.album_id,
            &req.name,
            req.author.as_deref(),
            req.sticker_ids,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(pack)))
}

pub async fn get_pack(
    State(state): State<AppState>,
    AppPath(pack_id): AppPath<Uuid>,
    claims: Option<Extension<Claims>>,
) -> AppResult<Json<PackWithStickers>> {
    let user_id = get_optional_user_id(claims.as_deref())?;

    let pack = packs_service(&state).get(pack_id, user_id).await?;

    Ok(Json(pack))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    #[serde(default, alias = "make_public")]
    pub make_public: bool,
    pub phone: Option<String>,
}

pub async fn publish_pack(
    State(state): State<AppState>,
    AppPath(pack_id): AppPath<Uuid>,
    Extension(claims): Extension<Claims>,
    req: Option<AppJson<PublishRequest>>,
) -> AppResult<Json<Published>> {
    let user_id = get_user_id(&claims)?;
    let req = req.map(|AppJson(r)| r).unwrap_or_default();

    let published = packs_service(&state)
        .publish(
            pack_id,
            user_id,
            req.make_public,
            req.phone.as_deref(),
            &state.config.server.app_url,
        )
        .await?;

    Ok(Json(published))
}
