use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use super::{access, slug::unique_slug};
use crate::{
    error::{AppError, AppResult},
    models::{Album, AlbumUpdate, Collaborator, NewAlbum, Sticker, Visibility},
    storage::{ObjectStore, Store},
};

pub const MAX_NAME_CHARS: usize = 80;
const SLUG_ATTEMPTS: usize = 3;

#[derive(Debug, Serialize)]
pub struct AlbumWithStickers {
    #[serde(flatten)]
    pub album: Album,
    pub stickers: Vec<Sticker>,
}

#[derive(Debug, Default)]
pub struct AlbumChanges {
    pub name: Option<String>,
    pub visibility: Option<Visibility>,
    pub cover_url: Option<String>,
}

pub fn validate_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::invalid("name", "Name is required"));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(AppError::invalid(
            "name",
            format!("Name must be at most {} characters", MAX_NAME_CHARS),
        ));
    }
    Ok(name.to_string())
}

pub struct AlbumsService {
    store: Arc<dyn Store>,
    objects: Arc<dyn ObjectStore>,
}

impl AlbumsService {
    pub fn new(store: Arc<dyn Store>, objects: Arc<dyn ObjectStore>) -> Self {
        Self { store, objects }
    }

    /// Albums owned by the user, newest first
    pub async fn list(&self, owner_id: Uuid) -> AppResult<Vec<Album>> {
        self.store.list_albums(owner_id).await
    }

    /// Create an album with a slug no other album uses
    pub async fn create(
        &self,
        owner_id: Uuid,
        name: &str,
        visibility: Visibility,
        cover_url: Option<String>,
    ) -> AppResult<Album> {
        let name = validate_name(name)?;

        // A concurrent create can claim the slug between the check and the insert.
        let mut attempt = 0;
        loop {
            attempt += 1;
            let slug = unique_slug(self.store.as_ref(), &name, None).await?;
            let result = self
                .store
                .create_album(NewAlbum {
                    owner_id,
                    name: name.clone(),
                    slug,
                    visibility,
                    cover_url: cover_url.clone(),
                })
                .await;

            match result {
                Err(AppError::SlugConflict) if attempt < SLUG_ATTEMPTS => continue,
                result => {
                    if let Ok(album) = &result {
                        tracing::info!("Album {} created as {}", album.id, album.slug);
                    }
                    return result;
                }
            }
        }
    }

    pub async fn get(&self, album_id: Uuid, user_id: Option<Uuid>) -> AppResult<Album> {
        access::require_read(self.store.as_ref(), album_id, user_id).await
    }

    /// Rename (regenerating the slug), change visibility or cover
    pub async fn update(
        &self,
        album_id: Uuid,
        user_id: Uuid,
        changes: AlbumChanges,
    ) -> AppResult<Album> {
        let album = access::require_write(self.store.as_ref(), album_id, user_id).await?;

        if changes.visibility.is_some_and(|v| v != album.visibility) && !album.is_owned_by(user_id)
        {
            return Err(AppError::Forbidden);
        }

        let mut update = AlbumUpdate {
            visibility: changes.visibility,
            cover_url: changes.cover_url,
            ..AlbumUpdate::default()
        };

        if let Some(name) = changes.name {
            let name = validate_name(&name)?;
            if name != album.name {
                update.slug = Some(unique_slug(self.store.as_ref(), &name, Some(album.id)).await?);
                update.name = Some(name);
            }
        }

        self.store.update_album(album.id, update).await
    }

    /// Delete an album with everything it owns
    pub async fn delete(&self, album_id: Uuid, user_id: Uuid) -> AppResult<()> {
        let album = access::require_owner(self.store.as_ref(), album_id, user_id).await?;
        let stickers = self.store.list_stickers(album.id).await?;

        self.store.delete_album(album.id).await?;
        remove_sticker_objects(self.objects.as_ref(), &stickers).await;

        tracing::info!("Album {} deleted with {} stickers", album.id, stickers.len());
        Ok(())
    }

    /// Read-only public page data, looked up by slug
    pub async fn public_page(&self, slug: &str) -> AppResult<AlbumWithStickers> {
        let album = self
            .store
            .get_album_by_slug(slug)
            .await?
            .filter(|a| a.visibility.is_world_readable())
            .ok_or(AppError::AlbumNotFound)?;
        let stickers = self.store.list_stickers(album.id).await?;

        Ok(AlbumWithStickers { album, stickers })
    }

    pub async fn list_collaborators(
        &self,
        album_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Vec<Collaborator>> {
        let album = access::require_owner(self.store.as_ref(), album_id, user_id).await?;
        self.store.list_collaborators(album.id).await
    }

    pub async fn add_collaborator(
        &self,
        album_id: Uuid,
        user_id: Uuid,
        collaborator_id: Uuid,
    ) -> AppResult<Collaborator> {
        let album = access::require_owner(self.store.as_ref(), album_id, user_id).await?;
        if album.is_owned_by(collaborator_id) {
            return Err(AppError::BadRequest(
                "Owner cannot be added as a collaborator".to_string(),
            ));
        }
        self.store.add_collaborator(album.id, collaborator_id).await
    }

    pub async fn remove_collaborator(
        &self,
        album_id: Uuid,
        user_id: Uuid,
        collaborator_id: Uuid,
    ) -> AppResult<()> {
        let album = access::require_owner(self.store.as_ref(), album_id, user_id).await?;
        if !self.store.remove_collaborator(album.id, collaborator_id).await? {
            return Err(AppError::BadRequest("Not a collaborator".to_string()));
        }
        Ok(())
    }
}

/// Best-effort removal of sticker images; failures are only logged.
pub async fn remove_sticker_objects(objects: &dyn ObjectStore, stickers: &[Sticker]) {
    for sticker in stickers {
        for url in [&sticker.file_url, &sticker.thumb_url] {
            let Some(key) = objects.key_for_url(url) else {
                continue;
            };
            if let Err(e) = objects.delete(&key).await {
                tracing::warn!("Failed to remove object {}: {}", key, e);
            }
        }
    }
}
