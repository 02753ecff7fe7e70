use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Sticker {
    pub id: Uuid,
    pub album_id: Uuid,
    pub file_url: String,
    pub thumb_url: String,
    pub title: Option<String>,
    pub size_kb: i32,
    pub sort_index: i32,
    pub created_at: DateTime<Utc>,
}

/// Inserted at the end of its album; the store assigns `sort_index`.
#[derive(Debug, Clone)]
pub struct NewSticker {
    pub id: Uuid,
    pub album_id: Uuid,
    pub file_url: String,
    pub thumb_url: String,
    pub title: Option<String>,
    pub size_kb: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SortOrder {
    pub id: Uuid,
    pub sort_index: i32,
}
