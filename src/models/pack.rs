use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Pack {
    pub id: Uuid,
    pub album_id: Uuid,
    pub name: String,
    pub author: Option<String>,
    pub exported_zip_url: Option<String>,
    pub public_url: Option<String>,
    pub wa_share_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackWithStickers {
    #[serde(flatten)]
    pub pack: Pack,
    pub sticker_ids: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewPack {
    pub id: Uuid,
    pub album_id: Uuid,
    pub name: String,
    pub author: Option<String>,
    pub exported_zip_url: Option<String>,
    /// Snapshot of the selection; position in this list is the order index.
    pub sticker_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Share {
    pub id: Uuid,
    pub pack_id: Uuid,
    pub album_id: Uuid,
    pub public_url: String,
    pub wa_url: String,
    pub created_at: DateTime<Utc>,
}
