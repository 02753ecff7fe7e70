use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    services::{
        auth::Claims,
        packs::{share_links, PacksService, ShareLinks},
        qr::qr_data_url,
    },
    AppState,
};

use super::super::{extract::AppJson, middleware::get_user_id};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppShareRequest {
    #[serde(alias = "album_name")]
    pub album_name: String,
    pub url: String,
    pub phone: Option<String>,
}

pub async fn share_whatsapp(
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<WhatsAppShareRequest>,
) -> AppResult<Json<ShareLinks>> {
    get_user_id(&claims)?;

    if req.url.trim().is_empty() {
        return Err(AppError::invalid("url", "URL is required"));
    }
    let links = share_links(req.album_name.trim(), req.url.trim(), req.phone.as_deref())?;

    Ok(Json(links))
}

#[derive(Debug, Deserialize)]
pub struct QrRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrResponse {
    pub data_url: String,
}

pub async fn generate_qr(
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<QrRequest>,
) -> AppResult<Json<QrResponse>> {
    get_user_id(&claims)?;

    if req.text.is_empty() {
        return Err(AppError::invalid("text", "Text is required"));
    }
    let data_url = qr_data_url(&req.text)?;

    Ok(Json(QrResponse { data_url }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZipRequest {
    #[serde(alias = "sticker_ids")]
    pub sticker_ids: Vec<Uuid>,
    #[serde(alias = "pack_name")]
    pub pack_name: String,
    pub author: Option<String>,
}

/// Streams an archive of the selected stickers without saving a pack.
pub async fn download_zip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<ZipRequest>,
) -> AppResult<Response> {
    let user_id = get_user_id(&claims)?;

    let packs_service = PacksService::new(
        state.store,
        state.objects,
        state.fetcher,
        state.config.archive.fetch_concurrency,
    );
    let (file_name, archive) = packs_service
        .build_zip(user_id, req.sticker_ids, &req.pack_name, req.author.as_deref())
        .await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        archive,
    )
        .into_response())
}
