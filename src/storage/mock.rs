use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Store;
use crate::{
    error::{AppError, AppResult},
    models::{
        Album, AlbumUpdate, Collaborator, Message, NewAlbum, NewMessage, NewPack, NewSticker,
        Pack, Share, SortOrder, Sticker, Visibility,
    },
};

/// Identity every unauthenticated request assumes while running on mock data.
pub const DEMO_USER_ID: Uuid = Uuid::from_u128(0xde00);

#[derive(Default)]
struct MockData {
    albums: Vec<Album>,
    collaborators: Vec<Collaborator>,
    stickers: Vec<Sticker>,
    packs: Vec<Pack>,
    pack_stickers: HashMap<Uuid, Vec<Uuid>>,
    shares: Vec<Share>,
    messages: Vec<Message>,
}

/// In-memory stand-in for the database, used when `DATABASE_URL` is unset.
#[derive(Default)]
pub struct MockStore {
    data: RwLock<MockData>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock store pre-populated with a public demo album.
    pub fn with_demo_data() -> Self {
        let now = Utc::now();
        let album = Album {
            id: Uuid::new_v4(),
            owner_id: DEMO_USER_ID,
            name: "Demo Stickers".to_string(),
            slug: "demo-stickers".to_string(),
            visibility: Visibility::Public,
            cover_url: None,
            created_at: now,
            updated_at: now,
        };

        Self {
            data: RwLock::new(MockData {
                albums: vec![album],
                ..MockData::default()
            }),
        }
    }

    #[cfg(test)]
    pub async fn pack_count(&self) -> usize {
        self.data.read().await.packs.len()
    }
}

#[async_trait]
impl Store for MockStore {
    async fn list_albums(&self, owner_id: Uuid) -> AppResult<Vec<Album>> {
        let data = self.data.read().await;
        let mut albums: Vec<Album> = data
            .albums
            .iter()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect();
        albums.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(albums)
    }

    async fn get_album(&self, album_id: Uuid) -> AppResult<Option<Album>> {
        let data = self.data.read().await;
        Ok(data.albums.iter().find(|a| a.id == album_id).cloned())
    }

    async fn get_album_by_slug(&self, slug: &str) -> AppResult<Option<Album>> {
        let data = self.data.read().await;
        Ok(data.albums.iter().find(|a| a.slug == slug).cloned())
    }

    async fn slug_taken(&self, slug: &str, except: Option<Uuid>) -> AppResult<bool> {
        let data = self.data.read().await;
        Ok(data
            .albums
            .iter()
            .any(|a| a.slug == slug && Some(a.id) != except))
    }

    async fn create_album(&self, album: NewAlbum) -> AppResult<Album> {
        let mut data = self.data.write().await;
        if data.albums.iter().any(|a| a.slug == album.slug) {
            return Err(AppError::SlugConflict);
        }

        let now = Utc::now();
        let created = Album {
            id: Uuid::new_v4(),
            owner_id: album.owner_id,
            name: album.name,
            slug: album.slug,
            visibility: album.visibility,
            cover_url: album.cover_url,
            created_at: now,
            updated_at: now,
        };
        data.albums.push(created.clone());
        Ok(created)
    }

    async fn update_album(&self, album_id: Uuid, update: AlbumUpdate) -> AppResult<Album> {
        let mut data = self.data.write().await;
        if let Some(slug) = &update.slug {
            if data.albums.iter().any(|a| &a.slug == slug && a.id != album_id) {
                return Err(AppError::SlugConflict);
            }
        }

        let album = data
            .albums
            .iter_mut()
            .find(|a| a.id == album_id)
            .ok_or(AppError::AlbumNotFound)?;

        if let Some(name) = update.name {
            album.name = name;
        }
        if let Some(slug) = update.slug {
            album.slug = slug;
        }
        if let Some(visibility) = update.visibility {
            album.visibility = visibility;
        }
        if let Some(cover_url) = update.cover_url {
            album.cover_url = Some(cover_url);
        }
        album.updated_at = Utc::now();

        Ok(album.clone())
    }

    async fn delete_album(&self, album_id: Uuid) -> AppResult<()> {
        let mut data = self.data.write().await;
        let before = data.albums.len();
        data.albums.retain(|a| a.id != album_id);
        if data.albums.len() == before {
            return Err(AppError::AlbumNotFound);
        }

        data.collaborators.retain(|c| c.album_id != album_id);
        data.stickers.retain(|s| s.album_id != album_id);
        data.messages.retain(|m| m.album_id != album_id);
        data.shares.retain(|s| s.album_id != album_id);

        let removed_packs: Vec<Uuid> = data
            .packs
            .iter()
            .filter(|p| p.album_id == album_id)
            .map(|p| p.id)
            .collect();
        data.packs.retain(|p| p.album_id != album_id);
        for pack_id in removed_packs {
            data.pack_stickers.remove(&pack_id);
        }

        Ok(())
    }

    async fn is_collaborator(&self, album_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let data = self.data.read().await;
        Ok(data
            .collaborators
            .iter()
            .any(|c| c.album_id == album_id && c.user_id == user_id))
    }

    async fn list_collaborators(&self, album_id: Uuid) -> AppResult<Vec<Collaborator>> {
        let data = self.data.read().await;
        Ok(data
            .collaborators
            .iter()
            .filter(|c| c.album_id == album_id)
            .cloned()
            .collect())
    }

    async fn add_collaborator(&self, album_id: Uuid, user_id: Uuid) -> AppResult<Collaborator> {
        let mut data = self.data.write().await;
        if let Some(existing) = data
            .collaborators
            .iter()
            .find(|c| c.album_id == album_id && c.user_id == user_id)
        {
            return Ok(existing.clone());
        }

        let collaborator = Collaborator {
            album_id,
            user_id,
            created_at: Utc::now(),
        };
        data.collaborators.push(collaborator.clone());
        Ok(collaborator)
    }

    async fn remove_collaborator(&self, album_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let mut data = self.data.write().await;
        let before = data.collaborators.len();
        data.collaborators
            .retain(|c| !(c.album_id == album_id && c.user_id == user_id));
        Ok(data.collaborators.len() < before)
    }

    async fn list_stickers(&self, album_id: Uuid) -> AppResult<Vec<Sticker>> {
        let data = self.data.read().await;
        let mut stickers: Vec<Sticker> = data
            .stickers
            .iter()
            .filter(|s| s.album_id == album_id)
            .cloned()
            .collect();
        stickers.sort_by(|a, b| {
            a.sort_index
                .cmp(&b.sort_index)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(stickers)
    }

    async fn get_stickers(&self, ids: &[Uuid]) -> AppResult<Vec<Sticker>> {
        let data = self.data.read().await;
        Ok(data
            .stickers
            .iter()
            .filter(|s| ids.contains(&s.id))
            .cloned()
            .collect())
    }

    async fn insert_sticker(&self, sticker: NewSticker) -> AppResult<Sticker> {
        let mut data = self.data.write().await;
        let sort_index = data
            .stickers
            .iter()
            .filter(|s| s.album_id == sticker.album_id)
            .map(|s| s.sort_index)
            .max()
            .map(|i| i + 1)
            .unwrap_or(0);
        let created = Sticker {
            id: sticker.id,
            album_id: sticker.album_id,
            file_url: sticker.file_url,
            thumb_url: sticker.thumb_url,
            title: sticker.title,
            size_kb: sticker.size_kb,
            sort_index,
            created_at: Utc::now(),
        };
        data.stickers.push(created.clone());
        Ok(created)
    }

    async fn reorder_stickers(&self, album_id: Uuid, orders: &[SortOrder]) -> AppResult<()> {
        let mut data = self.data.write().await;
        for order in orders {
            if let Some(sticker) = data
                .stickers
                .iter_mut()
                .find(|s| s.id == order.id && s.album_id == album_id)
            {
                sticker.sort_index = order.sort_index;
            }
        }
        Ok(())
    }

    async fn delete_stickers(&self, album_id: Uuid, ids: &[Uuid]) -> AppResult<Vec<Sticker>> {
        let mut data = self.data.write().await;
        let (deleted, kept): (Vec<Sticker>, Vec<Sticker>) = data
            .stickers
            .drain(..)
            .partition(|s| s.album_id == album_id && ids.contains(&s.id));
        data.stickers = kept;
        Ok(deleted)
    }

    async fn create_pack(&self, pack: NewPack) -> AppResult<Pack> {
        let mut data = self.data.write().await;
        let created = Pack {
            id: pack.id,
            album_id: pack.album_id,
            name: pack.name,
            author: pack.author,
            exported_zip_url: pack.exported_zip_url,
            public_url: None,
            wa_share_url: None,
            created_at: Utc::now(),
        };
        data.packs.push(created.clone());
        data.pack_stickers.insert(pack.id, pack.sticker_ids);
        Ok(created)
    }

    async fn get_pack(&self, pack_id: Uuid) -> AppResult<Option<Pack>> {
        let data = self.data.read().await;
        Ok(data.packs.iter().find(|p| p.id == pack_id).cloned())
    }

    async fn pack_sticker_ids(&self, pack_id: Uuid) -> AppResult<Vec<Uuid>> {
        let data = self.data.read().await;
        Ok(data.pack_stickers.get(&pack_id).cloned().unwrap_or_default())
    }

    async fn set_pack_share(
        &self,
        pack_id: Uuid,
        public_url: &str,
        wa_url: &str,
    ) -> AppResult<Pack> {
        let mut data = self.data.write().await;
        let pack = data
            .packs
            .iter_mut()
            .find(|p| p.id == pack_id)
            .ok_or(AppError::PackNotFound)?;
        pack.public_url = Some(public_url.to_string());
        pack.wa_share_url = Some(wa_url.to_string());
        Ok(pack.clone())
    }

    async fn insert_share(&self, share: Share) -> AppResult<()> {
        let mut data = self.data.write().await;
        data.shares.push(share);
        Ok(())
    }

    async fn list_messages(&self, album_id: Uuid, limit: i64) -> AppResult<Vec<Message>> {
        let data = self.data.read().await;
        let mut messages: Vec<Message> = data
            .messages
            .iter()
            .filter(|m| m.album_id == album_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let skip = messages.len().saturating_sub(limit.max(0) as usize);
        Ok(messages.split_off(skip))
    }

    async fn insert_message(&self, message: NewMessage) -> AppResult<Message> {
        let mut data = self.data.write().await;
        let created = Message {
            id: Uuid::new_v4(),
            album_id: message.album_id,
            author_id: message.author_id,
            display_name: message.display_name,
            body: message.body,
            created_at: Utc::now(),
        };
        data.messages.push(created.clone());
        Ok(created)
    }
}
