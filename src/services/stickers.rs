use std::{collections::HashSet, path::Path, sync::Arc};

use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

use super::{
    access,
    albums::remove_sticker_objects,
    imaging::{self, NormalizedImage},
};
use crate::{
    error::{AppError, AppResult},
    models::{NewSticker, SortOrder, Sticker},
    storage::{ObjectStore, Store},
};

const WEBP: &str = "image/webp";
const MAX_TITLE_CHARS: usize = 80;

/// One file from a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: Option<String>,
    pub content_type: String,
    pub data: Bytes,
}

#[derive(Debug, Serialize)]
pub struct UploadError {
    pub file: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct UploadOutcome {
    pub uploaded: Vec<Sticker>,
    pub errors: Vec<UploadError>,
}

/// Title derived from the uploaded file name, without its extension.
fn title_from_file_name(file_name: Option<&str>) -> Option<String> {
    let stem = Path::new(file_name?).file_stem()?.to_str()?.trim();
    if stem.is_empty() {
        None
    } else {
        Some(stem.chars().take(MAX_TITLE_CHARS).collect())
    }
}

pub struct StickersService {
    store: Arc<dyn Store>,
    objects: Arc<dyn ObjectStore>,
}

impl StickersService {
    pub fn new(store: Arc<dyn Store>, objects: Arc<dyn ObjectStore>) -> Self {
        Self { store, objects }
    }

    /// Stickers of an album in display order
    pub async fn list(&self, album_id: Uuid, user_id: Option<Uuid>) -> AppResult<Vec<Sticker>> {
        let album = access::require_read(self.store.as_ref(), album_id, user_id).await?;
        self.store.list_stickers(album.id).await
    }

    /// Normalize and store each file. A bad file is reported in `errors`
    /// without affecting the rest of the batch.
    pub async fn upload(
        &self,
        album_id: Uuid,
        user_id: Uuid,
        files: Vec<UploadFile>,
        max_file_bytes: usize,
    ) -> AppResult<UploadOutcome> {
        let album = access::require_write(self.store.as_ref(), album_id, user_id).await?;

        let mut outcome = UploadOutcome {
            uploaded: Vec::with_capacity(files.len()),
            errors: Vec::new(),
        };

        for (index, file) in files.into_iter().enumerate() {
            let label = file
                .file_name
                .clone()
                .unwrap_or_else(|| format!("file {}", index + 1));

            match self.upload_one(album.id, user_id, file, max_file_bytes).await {
                Ok(sticker) => outcome.uploaded.push(sticker),
                Err(e) => {
                    tracing::warn!("Upload of {} to album {} failed: {}", label, album.id, e);
                    outcome.errors.push(UploadError {
                        file: label,
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Album {}: {} stickers uploaded, {} rejected",
            album.id,
            outcome.uploaded.len(),
            outcome.errors.len()
        );
        Ok(outcome)
    }

    async fn upload_one(
        &self,
        album_id: Uuid,
        user_id: Uuid,
        file: UploadFile,
        max_file_bytes: usize,
    ) -> AppResult<Sticker> {
        if !imaging::is_accepted_content_type(&file.content_type) {
            return Err(AppError::Validation(format!(
                "Unsupported content type {}; expected one of {}",
                file.content_type,
                imaging::ACCEPTED_CONTENT_TYPES.join(", ")
            )));
        }
        if file.data.len() > max_file_bytes {
            return Err(AppError::Validation(format!(
                "File exceeds {} KB limit",
                max_file_bytes / 1024
            )));
        }

        let data = file.data;
        let NormalizedImage {
            data: primary,
            thumbnail,
            size_kb,
            ..
        } = tokio::task::spawn_blocking(move || imaging::normalize(&data))
            .await
            .map_err(|e| anyhow::anyhow!("Image worker failed: {}", e))??;
        let title = title_from_file_name(file.file_name.as_deref());

        let sticker_id = Uuid::new_v4();
        let key = format!("{}/{}/{}.webp", album_id, user_id, sticker_id);
        let thumb_key = format!("{}/{}/{}_thumb.webp", album_id, user_id, sticker_id);

        let file_url = self
            .objects
            .put(&key, Bytes::from(primary), WEBP)
            .await?;

        let stored = async {
            let thumb_url = self
                .objects
                .put(&thumb_key, Bytes::from(thumbnail), WEBP)
                .await?;
            self.store
                .insert_sticker(NewSticker {
                    id: sticker_id,
                    album_id,
                    file_url,
                    thumb_url,
                    title,
                    size_kb,
                })
                .await
        }
        .await;

        if stored.is_err() {
            for key in [&key, &thumb_key] {
                if let Err(e) = self.objects.delete(key).await {
                    tracing::warn!("Failed to remove orphaned object {}: {}", key, e);
                }
            }
        }
        stored
    }

    /// Apply new sort indexes; returns the album's stickers in the new order
    pub async fn reorder(
        &self,
        album_id: Uuid,
        user_id: Uuid,
        orders: Vec<SortOrder>,
    ) -> AppResult<Vec<Sticker>> {
        if orders.is_empty() {
            return Err(AppError::invalid("orders", "At least one order is required"));
        }
        if orders.iter().any(|o| o.sort_index < 0) {
            return Err(AppError::invalid("orders", "sort_index must not be negative"));
        }

        let album = access::require_write(self.store.as_ref(), album_id, user_id).await?;
        self.store.reorder_stickers(album.id, &orders).await?;
        self.store.list_stickers(album.id).await
    }

    /// Delete stickers by id; returns how many were removed
    pub async fn delete(&self, album_id: Uuid, user_id: Uuid, ids: Vec<Uuid>) -> AppResult<usize> {
        if ids.is_empty() {
            return Err(AppError::invalid("ids", "At least one id is required"));
        }

        let album = access::require_write(self.store.as_ref(), album_id, user_id).await?;
        let unique: Vec<Uuid> = ids
            .into_iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let deleted = self.store.delete_stickers(album.id, &unique).await?;
        remove_sticker_objects(self.objects.as_ref(), &deleted).await;

        Ok(deleted.len())
    }
}
