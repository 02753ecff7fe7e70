use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::Album,
    storage::Store,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlbumRole {
    Owner,
    Collaborator,
}

/// Resolves the caller's role on an album. Checked on every request.
pub async fn role(store: &dyn Store, album: &Album, user_id: Uuid) -> AppResult<Option<AlbumRole>> {
    if album.is_owned_by(user_id) {
        return Ok(Some(AlbumRole::Owner));
    }

    if store.is_collaborator(album.id, user_id).await? {
        return Ok(Some(AlbumRole::Collaborator));
    }

    Ok(None)
}

async fn load(store: &dyn Store, album_id: Uuid) -> AppResult<Album> {
    store
        .get_album(album_id)
        .await?
        .ok_or(AppError::AlbumNotFound)
}

/// Public and unlisted albums are readable by anyone; private ones only by
/// the owner and collaborators. Denied reads look like a missing album.
pub async fn require_read(
    store: &dyn Store,
    album_id: Uuid,
    user_id: Option<Uuid>,
) -> AppResult<Album> {
    let album = load(store, album_id).await?;
    check_read(store, album, user_id).await
}

pub async fn check_read(store: &dyn Store, album: Album, user_id: Option<Uuid>) -> AppResult<Album> {
    if album.visibility.is_world_readable() {
        return Ok(album);
    }

    match user_id {
        Some(user_id) if role(store, &album, user_id).await?.is_some() => Ok(album),
        _ => Err(AppError::AlbumNotFound),
    }
}

/// Owner or collaborator.
pub async fn require_write(store: &dyn Store, album_id: Uuid, user_id: Uuid) -> AppResult<Album> {
    let album = load(store, album_id).await?;
    match role(store, &album, user_id).await? {
        Some(_) => Ok(album),
        None => Err(AppError::Forbidden),
    }
}

pub async fn require_owner(store: &dyn Store, album_id: Uuid, user_id: Uuid) -> AppResult<Album> {
    let album = load(store, album_id).await?;
    if album.is_owned_by(user_id) {
        Ok(album)
    } else {
        Err(AppError::Forbidden)
    }
}
