use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::Message,
    services::{auth::Claims, messages::MessagesService},
    AppState,
};

use super::super::{
    extract::{AppJson, AppPath, AppQuery},
    middleware::{get_optional_user_id, get_user_id},
};

/// Display name the client shows for its own profile.
const PROFILE_NAME_HEADER: &str = "x-profile-name";

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub limit: Option<i64>,
}

pub async fn get_messages(
    State(state): State<AppState>,
    AppPath(album_id): AppPath<Uuid>,
    claims: Option<Extension<Claims>>,
    AppQuery(query): AppQuery<MessagesQuery>,
) -> AppResult<Json<Vec<Message>>> {
    let user_id = get_optional_user_id(claims.as_deref())?;

    let messages_service = MessagesService::new(state.store);
    let messages = messages_service
        .list(album_id, user_id, query.limit)
        .await?;

    Ok(Json(messages))
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub body: String,
}

pub async fn send_message(
    State(state): State<AppState>,
    AppPath(album_id): AppPath<Uuid>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    AppJson(req): AppJson<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<Message>)> {
    let user_id = get_user_id(&claims)?;

    let display_name = headers
        .get(PROFILE_NAME_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|n| !n.trim().is_empty())
        .or_else(|| claims.display_name());

    let messages_service = MessagesService::new(state.store.clone());
    let message = messages_service
        .post(album_id, user_id, display_name, &req.body)
        .await?;

    state.ws_hub.publish(&message).await;

    Ok((StatusCode::CREATED, Json(message)))
}
