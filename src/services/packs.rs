use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use super::{
    access,
    archive::{build_pack_archive, ArchiveEntry},
    qr::qr_data_url,
    slug::slugify,
    whatsapp::{build_wa_url, compose_message, normalize_phone},
};
use crate::{
    error::{AppError, AppResult},
    models::{Album, AlbumUpdate, NewPack, PackWithStickers, Share, Sticker, Visibility},
    storage::{ObjectStore, SourceFetcher, Store},
};

pub const MAX_PACK_NAME_CHARS: usize = 100;
pub const MAX_AUTHOR_CHARS: usize = 100;
/// WhatsApp refuses packs with more stickers than this.
pub const MAX_PACK_STICKERS: usize = 30;

const ZIP: &str = "application/zip";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Published {
    pub public_url: String,
    pub wa_url: String,
    pub message: String,
    pub qr_data_url: String,
    pub zip_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareLinks {
    pub message: String,
    pub wa_url: String,
    pub qr_data_url: String,
}

/// Message, deep link and QR code for sharing `url`.
pub fn share_links(album_name: &str, url: &str, phone: Option<&str>) -> AppResult<ShareLinks> {
    let message = compose_message(album_name, url);
    let phone = phone.and_then(normalize_phone);
    let wa_url = build_wa_url(&message, phone.as_deref());
    let qr_data_url = qr_data_url(url)?;

    Ok(ShareLinks {
        message,
        wa_url,
        qr_data_url,
    })
}

pub fn public_album_url(app_url: &str, album: &Album) -> String {
    format!("{}/a/{}", app_url.trim_end_matches('/'), album.slug)
}

fn validate_pack_name(name: &str, field: &'static str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::invalid(field, "Pack name is required"));
    }
    if name.chars().count() > MAX_PACK_NAME_CHARS {
        return Err(AppError::invalid(
            field,
            format!("Pack name must be at most {} characters", MAX_PACK_NAME_CHARS),
        ));
    }
    Ok(name.to_string())
}

fn validate_author(author: Option<&str>) -> AppResult<Option<String>> {
    match author.map(str::trim).filter(|a| !a.is_empty()) {
        Some(a) if a.chars().count() > MAX_AUTHOR_CHARS => Err(AppError::invalid(
            "author",
            format!("Author must be at most {} characters", MAX_AUTHOR_CHARS),
        )),
        author => Ok(author.map(str::to_string)),
    }
}

fn validate_selection(ids: &[Uuid]) -> AppResult<()> {
    if ids.is_empty() {
        return Err(AppError::invalid("stickerIds", "Select at least one sticker"));
    }
    if ids.len() > MAX_PACK_STICKERS {
        return Err(AppError::invalid(
            "stickerIds",
            format!("A pack holds at most {} stickers", MAX_PACK_STICKERS),
        ));
    }
    let unique: HashSet<&Uuid> = ids.iter().collect();
    if unique.len() != ids.len() {
        return Err(AppError::invalid("stickerIds", "Duplicate sticker ids"));
    }
    Ok(())
}

/// Puts `stickers` in the order of `ids`. Ids with no sticker are returned
/// as the error value.
fn in_selection_order(ids: &[Uuid], stickers: Vec<Sticker>) -> Result<Vec<Sticker>, Vec<Uuid>> {
    let mut by_id: HashMap<Uuid, Sticker> = stickers.into_iter().map(|s| (s.id, s)).collect();
    let mut ordered = Vec::with_capacity(ids.len());
    let mut missing = Vec::new();

    for id in ids {
        match by_id.remove(id) {
            Some(sticker) => ordered.push(sticker),
            None => missing.push(*id),
        }
    }

    if missing.is_empty() {
        Ok(ordered)
    } else {
        Err(missing)
    }
}

fn archive_entries(stickers: &[Sticker]) -> Vec<ArchiveEntry> {
    stickers
        .iter()
        .map(|s| ArchiveEntry {
            id: s.id,
            title: s.title.clone(),
            source_url: s.file_url.clone(),
        })
        .collect()
}

pub struct PacksService {
    store: Arc<dyn Store>,
    objects: Arc<dyn ObjectStore>,
    fetcher: Arc<dyn SourceFetcher>,
    fetch_concurrency: usize,
}

impl PacksService {
    pub fn new(
        store: Arc<dyn Store>,
        objects: Arc<dyn ObjectStore>,
        fetcher: Arc<dyn SourceFetcher>,
        fetch_concurrency: usize,
    ) -> Self {
        Self {
            store,
            objects,
            fetcher,
            fetch_concurrency,
        }
    }

    /// Snapshot the selected stickers into a pack and export its archive.
    ///
    /// The archive is built and uploaded before the pack row is written, so a
    /// failed fetch leaves nothing behind.
    pub async fn create(
        &self,
        user_id: Uuid,
        album_id: Uuid,
        name: &str,
        author: Option<&str>,
        sticker_ids: Vec<Uuid>,
    ) -> AppResult<PackWithStickers> {
        let name = validate_pack_name(name, "name")?;
        let author = validate_author(author)?;
        validate_selection(&sticker_ids)?;

        let album = access::require_write(self.store.as_ref(), album_id, user_id).await?;

        let found: Vec<Sticker> = self
            .store
            .get_stickers(&sticker_ids)
            .await?
            .into_iter()
            .filter(|s| s.album_id == album.id)
            .collect();
        let stickers = in_selection_order(&sticker_ids, found).map_err(|missing| {
            AppError::invalid(
                "stickerIds",
                format!("{} stickers are not part of this album", missing.len()),
            )
        })?;

        let archive = build_pack_archive(
            self.fetcher.as_ref(),
            &archive_entries(&stickers),
            &name,
            author.as_deref(),
            self.fetch_concurrency,
        )
        .await?;

        let pack_id = Uuid::new_v4();
        let key = format!("packs/{}_{}.zip", pack_id, Utc::now().timestamp_millis());
        let archive_size = archive.len();
        let zip_url = self.objects.put(&key, Bytes::from(archive), ZIP).await?;

        let pack = match self
            .store
            .create_pack(NewPack {
                id: pack_id,
                album_id: album.id,
                name,
                author,
                exported_zip_url: Some(zip_url),
                sticker_ids: sticker_ids.clone(),
            })
            .await
        {
            Ok(pack) => pack,
            Err(e) => {
                if let Err(cleanup) = self.objects.delete(&key).await {
                    tracing::warn!("Failed to remove orphaned archive {}: {}", key, cleanup);
                }
                return Err(e);
            }
        };

        tracing::info!(
            "Pack {} exported with {} stickers ({} bytes)",
            pack.id,
            sticker_ids.len(),
            archive_size
        );

        Ok(PackWithStickers { pack, sticker_ids })
    }

    pub async fn get(&self, pack_id: Uuid, user_id: Option<Uuid>) -> AppResult<PackWithStickers> {
        let pack = self
            .store
            .get_pack(pack_id)
            .await?
            .ok_or(AppError::PackNotFound)?;
        access::require_read(self.store.as_ref(), pack.album_id, user_id)
            .await
            .map_err(|e| match e {
                AppError::AlbumNotFound => AppError::PackNotFound,
                e => e,
            })?;
        let sticker_ids = self.store.pack_sticker_ids(pack.id).await?;

        Ok(PackWithStickers { pack, sticker_ids })
    }

    /// Build share links for a pack, optionally making its album public first
    pub async fn publish(
        &self,
        pack_id: Uuid,
        user_id: Uuid,
        make_public: bool,
        phone: Option<&str>,
        app_url: &str,
    ) -> AppResult<Published> {
        let pack = self
            .store
            .get_pack(pack_id)
            .await?
            .ok_or(AppError::PackNotFound)?;
        let mut album = access::require_write(self.store.as_ref(), pack.album_id, user_id).await?;

        let zip_url = pack
            .exported_zip_url
            .clone()
            .ok_or_else(|| AppError::BadRequest("Pack has not been exported yet".to_string()))?;

        if make_public && album.visibility != Visibility::Public {
            if !album.is_owned_by(user_id) {
                return Err(AppError::Forbidden);
            }
            album = self
                .store
                .update_album(
                    album.id,
                    AlbumUpdate {
                        visibility: Some(Visibility::Public),
                        ..AlbumUpdate::default()
                    },
                )
                .await?;
            tracing::info!("Album {} made public while publishing pack {}", album.id, pack.id);
        }

        // The public page does not serve private albums
        if album.visibility == Visibility::Private {
            return Err(AppError::invalid(
                "makePublic",
                "Album is private; set makePublic to share it",
            ));
        }

        let public_url = public_album_url(app_url, &album);
        let links = share_links(&album.name, &public_url, phone)?;

        self.store
            .set_pack_share(pack.id, &public_url, &links.wa_url)
            .await?;
        self.store
            .insert_share(Share {
                id: Uuid::new_v4(),
                pack_id: pack.id,
                album_id: album.id,
                public_url: public_url.clone(),
                wa_url: links.wa_url.clone(),
                created_at: Utc::now(),
            })
            .await?;

        tracing::info!("Pack {} published at {}", pack.id, public_url);

        Ok(Published {
            public_url,
            wa_url: links.wa_url,
            message: links.message,
            qr_data_url: links.qr_data_url,
            zip_url,
        })
    }

    /// Build an archive from arbitrary readable stickers without saving a pack.
    /// Returns a download file name and the archive bytes.
    pub async fn build_zip(
        &self,
        user_id: Uuid,
        sticker_ids: Vec<Uuid>,
        pack_name: &str,
        author: Option<&str>,
    ) -> AppResult<(String, Vec<u8>)> {
        let pack_name = validate_pack_name(pack_name, "packName")?;
        let author = validate_author(author)?;
        validate_selection(&sticker_ids)?;

        let found = self.store.get_stickers(&sticker_ids).await?;
        let stickers =
            in_selection_order(&sticker_ids, found).map_err(|_| AppError::StickerNotFound)?;

        let album_ids: HashSet<Uuid> = stickers.iter().map(|s| s.album_id).collect();
        for album_id in album_ids {
            access::require_read(self.store.as_ref(), album_id, Some(user_id))
                .await
                .map_err(|e| match e {
                    AppError::AlbumNotFound => AppError::StickerNotFound,
                    e => e,
                })?;
        }

        let archive = build_pack_archive(
            self.fetcher.as_ref(),
            &archive_entries(&stickers),
            &pack_name,
            author.as_deref(),
            self.fetch_concurrency,
        )
        .await?;

        let file_name = match slugify(&pack_name) {
            s if s.is_empty() => "stickers.zip".to_string(),
            s => format!("{}.zip", s),
        };

        Ok((file_name, archive))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sticker(id: Uuid) -> Sticker {
        Sticker {
            id,
            album_id: Uuid::nil(),
            file_url: String::new(),
            thumb_url: String::new(),
            title: None,
            size_kb: 0,
            sort_index: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn selection_order_follows_ids_not_storage() {
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let stored: Vec<Sticker> = ids.iter().rev().map(|id| sticker(*id)).collect();

        let ordered = in_selection_order(&ids, stored).unwrap();
        let got: Vec<Uuid> = ordered.iter().map(|s| s.id).collect();
        assert_eq!(got, ids);
    }

    #[test]
    fn selection_reports_missing_ids() {
        let present = Uuid::new_v4();
        let absent = Uuid::new_v4();

        let missing = in_selection_order(&[present, absent], vec![sticker(present)]).unwrap_err();
        assert_eq!(missing, vec![absent]);
    }

    #[test]
    fn selection_limits() {
        assert!(validate_selection(&[]).is_err());
        let id = Uuid::new_v4();
        assert!(validate_selection(&[id, id]).is_err());
        let many: Vec<Uuid> = (0..=MAX_PACK_STICKERS).map(|_| Uuid::new_v4()).collect();
        assert!(validate_selection(&many).is_err());
        assert!(validate_selection(&many[..MAX_PACK_STICKERS]).is_ok());
    }

    #[test]
    fn blank_author_is_dropped() {
        assert_eq!(validate_author(Some("   ")).unwrap(), None);
        assert_eq!(validate_author(Some(" Ana ")).unwrap().as_deref(), Some("Ana"));
        let long = "a".repeat(MAX_AUTHOR_CHARS + 1);
        assert!(validate_author(Some(long.as_str())).is_err());
    }

    #[test]
    fn share_links_normalize_phone() {
        let links = share_links("My Pack", "https://s.example/a/my-pack", Some("+62 811")).unwrap();

        assert!(links.wa_url.starts_with("https://wa.me/62811?text="));
        assert!(links.wa_url.contains("%20"));
        assert!(links.message.contains("https://s.example/a/my-pack"));
        assert!(links.qr_data_url.starts_with("data:image/png;base64,"));
    }
}
