pub mod memory;
pub mod minio;
pub mod mock;
pub mod postgres;
pub mod redis;

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        Album, AlbumUpdate, Collaborator, Message, NewAlbum, NewMessage, NewPack, NewSticker,
        Pack, Share, SortOrder, Sticker,
    },
};

/// Row storage for albums and everything they own.
///
/// Deleting an album removes its stickers, packs, collaborators, messages and
/// share records with it.
#[async_trait]
pub trait Store: Send + Sync {
    // Albums
    async fn list_albums(&self, owner_id: Uuid) -> AppResult<Vec<Album>>;
    async fn get_album(&self, album_id: Uuid) -> AppResult<Option<Album>>;
    async fn get_album_by_slug(&self, slug: &str) -> AppResult<Option<Album>>;
    async fn slug_taken(&self, slug: &str, except: Option<Uuid>) -> AppResult<bool>;
    async fn create_album(&self, album: NewAlbum) -> AppResult<Album>;
    async fn update_album(&self, album_id: Uuid, update: AlbumUpdate) -> AppResult<Album>;
    async fn delete_album(&self, album_id: Uuid) -> AppResult<()>;

    // Collaborators
    async fn is_collaborator(&self, album_id: Uuid, user_id: Uuid) -> AppResult<bool>;
    async fn list_collaborators(&self, album_id: Uuid) -> AppResult<Vec<Collaborator>>;
    async fn add_collaborator(&self, album_id: Uuid, user_id: Uuid) -> AppResult<Collaborator>;
    async fn remove_collaborator(&self, album_id: Uuid, user_id: Uuid) -> AppResult<bool>;

    // Stickers
    async fn list_stickers(&self, album_id: Uuid) -> AppResult<Vec<Sticker>>;
    /// Returns the stickers that exist, in no particular order.
    async fn get_stickers(&self, ids: &[Uuid]) -> AppResult<Vec<Sticker>>;
    /// Appends after the album's current last sticker.
    async fn insert_sticker(&self, sticker: NewSticker) -> AppResult<Sticker>;
    /// Only stickers belonging to `album_id` are touched.
    async fn reorder_stickers(&self, album_id: Uuid, orders: &[SortOrder]) -> AppResult<()>;
    /// Returns the removed rows so their objects can be cleaned up.
    async fn delete_stickers(&self, album_id: Uuid, ids: &[Uuid]) -> AppResult<Vec<Sticker>>;

    // Packs
    async fn create_pack(&self, pack: NewPack) -> AppResult<Pack>;
    async fn get_pack(&self, pack_id: Uuid) -> AppResult<Option<Pack>>;
    async fn pack_sticker_ids(&self, pack_id: Uuid) -> AppResult<Vec<Uuid>>;
    async fn set_pack_share(&self, pack_id: Uuid, public_url: &str, wa_url: &str)
        -> AppResult<Pack>;
    async fn insert_share(&self, share: Share) -> AppResult<()>;

    // Messages
    /// Most recent `limit` messages, oldest first.
    async fn list_messages(&self, album_id: Uuid, limit: i64) -> AppResult<Vec<Message>>;
    async fn insert_message(&self, message: NewMessage) -> AppResult<Message>;
}

/// Object storage for sticker images and pack archives.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores the object and returns its public URL.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> AppResult<String>;
    async fn get(&self, key: &str) -> AppResult<Option<(Bytes, String)>>;
    async fn delete(&self, key: &str) -> AppResult<()>;
    /// Maps a URL handed out by `put` back to its key.
    fn key_for_url(&self, url: &str) -> Option<String>;
}

/// Retrieves sticker bytes by URL for archive assembly.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> AppResult<Bytes>;
}

/// Fetches sources over HTTP; any non-success status is an error.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: std::time::Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> AppResult<Bytes> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to fetch {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "Failed to fetch {}: HTTP {}",
                url, status
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to read {}: {}", url, e)))
    }
}
