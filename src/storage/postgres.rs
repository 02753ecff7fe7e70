use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::Store;
use crate::{
    error::{AppError, AppResult},
    models::{
        Album, AlbumUpdate, Collaborator, Message, NewAlbum, NewMessage, NewPack, NewSticker,
        Pack, Share, SortOrder, Sticker,
    },
};

const UNIQUE_VIOLATION: &str = "23505";

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|e| e.code())
        .map(|code| code == UNIQUE_VIOLATION)
        .unwrap_or(false)
}

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn list_albums(&self, owner_id: Uuid) -> AppResult<Vec<Album>> {
        let albums: Vec<Album> = sqlx::query_as(
            "SELECT * FROM albums WHERE owner_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;

        Ok(albums)
    }

    async fn get_album(&self, album_id: Uuid) -> AppResult<Option<Album>> {
        let album: Option<Album> = sqlx::query_as("SELECT * FROM albums WHERE id = $1")
            .bind(album_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(album)
    }

    async fn get_album_by_slug(&self, slug: &str) -> AppResult<Option<Album>> {
        let album: Option<Album> = sqlx::query_as("SELECT * FROM albums WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.db)
            .await?;

        Ok(album)
    }

    async fn slug_taken(&self, slug: &str, except: Option<Uuid>) -> AppResult<bool> {
        let existing: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM albums WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2)",
        )
        .bind(slug)
        .bind(except)
        .fetch_optional(&self.db)
        .await?;

        Ok(existing.is_some())
    }

    async fn create_album(&self, album: NewAlbum) -> AppResult<Album> {
        let result: Result<Album, sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO albums (id, owner_id, name, slug, visibility, cover_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(album.owner_id)
        .bind(&album.name)
        .bind(&album.slug)
        .bind(album.visibility)
        .bind(&album.cover_url)
        .fetch_one(&self.db)
        .await;

        match result {
            Ok(album) => Ok(album),
            Err(e) if is_unique_violation(&e) => Err(AppError::SlugConflict),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_album(&self, album_id: Uuid, update: AlbumUpdate) -> AppResult<Album> {
        let result: Result<Option<Album>, sqlx::Error> = sqlx::query_as(
            r#"
            UPDATE albums
            SET name = COALESCE($1, name),
                slug = COALESCE($2, slug),
                visibility = COALESCE($3, visibility),
                cover_url = COALESCE($4, cover_url),
                updated_at = NOW()
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(&update.name)
        .bind(&update.slug)
        .bind(update.visibility)
        .bind(&update.cover_url)
        .bind(album_id)
        .fetch_optional(&self.db)
        .await;

        match result {
            Ok(album) => album.ok_or(AppError::AlbumNotFound),
            Err(e) if is_unique_violation(&e) => Err(AppError::SlugConflict),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_album(&self, album_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM albums WHERE id = $1")
            .bind(album_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::AlbumNotFound);
        }

        Ok(())
    }

    async fn is_collaborator(&self, album_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            "SELECT user_id FROM album_collaborators WHERE album_id = $1 AND user_id = $2",
        )
        .bind(album_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.is_some())
    }

    async fn list_collaborators(&self, album_id: Uuid) -> AppResult<Vec<Collaborator>> {
        let collaborators: Vec<Collaborator> = sqlx::query_as(
            "SELECT * FROM album_collaborators WHERE album_id = $1 ORDER BY created_at ASC",
        )
        .bind(album_id)
        .fetch_all(&self.db)
        .await?;

        Ok(collaborators)
    }

    async fn add_collaborator(&self, album_id: Uuid, user_id: Uuid) -> AppResult<Collaborator> {
        let collaborator: Collaborator = sqlx::query_as(
            r#"
            INSERT INTO album_collaborators (album_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (album_id, user_id) DO UPDATE SET album_id = EXCLUDED.album_id
            RETURNING *
            "#,
        )
        .bind(album_id)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(collaborator)
    }

    async fn remove_collaborator(&self, album_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let result =
            sqlx::query("DELETE FROM album_collaborators WHERE album_id = $1 AND user_id = $2")
                .bind(album_id)
                .bind(user_id)
                .execute(&self.db)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_stickers(&self, album_id: Uuid) -> AppResult<Vec<Sticker>> {
        let stickers: Vec<Sticker> = sqlx::query_as(
            "SELECT * FROM stickers WHERE album_id = $1 ORDER BY sort_index ASC, created_at ASC",
        )
        .bind(album_id)
        .fetch_all(&self.db)
        .await?;

        Ok(stickers)
    }

    async fn get_stickers(&self, ids: &[Uuid]) -> AppResult<Vec<Sticker>> {
        let stickers: Vec<Sticker> = sqlx::query_as("SELECT * FROM stickers WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.db)
            .await?;

        Ok(stickers)
    }

    async fn insert_sticker(&self, sticker: NewSticker) -> AppResult<Sticker> {
        let mut tx = self.db.begin().await?;

        // Serializes appends to the same album
        sqlx::query("SELECT id FROM albums WHERE id = $1 FOR UPDATE")
            .bind(sticker.album_id)
            .execute(&mut *tx)
            .await?;

        let sticker: Sticker = sqlx::query_as(
            r#"
            INSERT INTO stickers (id, album_id, file_url, thumb_url, title, size_kb, sort_index)
            VALUES (
                $1, $2, $3, $4, $5, $6,
                COALESCE((SELECT MAX(sort_index) + 1 FROM stickers WHERE album_id = $2), 0)
            )
            RETURNING *
            "#,
        )
        .bind(sticker.id)
        .bind(sticker.album_id)
        .bind(&sticker.file_url)
        .bind(&sticker.thumb_url)
        .bind(&sticker.title)
        .bind(sticker.size_kb)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(sticker)
    }

    async fn reorder_stickers(&self, album_id: Uuid, orders: &[SortOrder]) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        for order in orders {
            sqlx::query("UPDATE stickers SET sort_index = $1 WHERE id = $2 AND album_id = $3")
                .bind(order.sort_index)
                .bind(order.id)
                .bind(album_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_stickers(&self, album_id: Uuid, ids: &[Uuid]) -> AppResult<Vec<Sticker>> {
        let deleted: Vec<Sticker> = sqlx::query_as(
            "DELETE FROM stickers WHERE album_id = $1 AND id = ANY($2) RETURNING *",
        )
        .bind(album_id)
        .bind(ids)
        .fetch_all(&self.db)
        .await?;

        Ok(deleted)
    }

    async fn create_pack(&self, pack: NewPack) -> AppResult<Pack> {
        let mut tx = self.db.begin().await?;

        let created: Pack = sqlx::query_as(
            r#"
            INSERT INTO packs (id, album_id, name, author, exported_zip_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(pack.id)
        .bind(pack.album_id)
        .bind(&pack.name)
        .bind(&pack.author)
        .bind(&pack.exported_zip_url)
        .fetch_one(&mut *tx)
        .await?;

        for (order_index, sticker_id) in pack.sticker_ids.iter().enumerate() {
            sqlx::query(
                "INSERT INTO pack_stickers (pack_id, sticker_id, order_index) VALUES ($1, $2, $3)",
            )
            .bind(pack.id)
            .bind(sticker_id)
            .bind(order_index as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn get_pack(&self, pack_id: Uuid) -> AppResult<Option<Pack>> {
        let pack: Option<Pack> = sqlx::query_as("SELECT * FROM packs WHERE id = $1")
            .bind(pack_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(pack)
    }

    async fn pack_sticker_ids(&self, pack_id: Uuid) -> AppResult<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT sticker_id FROM pack_stickers WHERE pack_id = $1 ORDER BY order_index ASC",
        )
        .bind(pack_id)
        .fetch_all(&self.db)
        .await?;

        Ok(ids)
    }

    async fn set_pack_share(
        &self,
        pack_id: Uuid,
        public_url: &str,
        wa_url: &str,
    ) -> AppResult<Pack> {
        let pack: Option<Pack> = sqlx::query_as(
            "UPDATE packs SET public_url = $1, wa_share_url = $2 WHERE id = $3 RETURNING *",
        )
        .bind(public_url)
        .bind(wa_url)
        .bind(pack_id)
        .fetch_optional(&self.db)
        .await?;

        pack.ok_or(AppError::PackNotFound)
    }

    async fn insert_share(&self, share: Share) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO shares (id, pack_id, album_id, public_url, wa_url, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(share.id)
        .bind(share.pack_id)
        .bind(share.album_id)
        .bind(&share.public_url)
        .bind(&share.wa_url)
        .bind(share.created_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn list_messages(&self, album_id: Uuid, limit: i64) -> AppResult<Vec<Message>> {
        let messages: Vec<Message> = sqlx::query_as(
            r#"
            SELECT * FROM (
                SELECT * FROM messages
                WHERE album_id = $1
                ORDER BY created_at DESC
                LIMIT $2
            ) recent
            ORDER BY created_at ASC
            "#,
        )
        .bind(album_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(messages)
    }

    async fn insert_message(&self, message: NewMessage) -> AppResult<Message> {
        let message: Message = sqlx::query_as(
            r#"
            INSERT INTO messages (id, album_id, author_id, display_name, body)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(message.album_id)
        .bind(message.author_id)
        .bind(&message.display_name)
        .bind(&message.body)
        .fetch_one(&self.db)
        .await?;

        Ok(message)
    }
}
