use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub album_id: Uuid,
    pub author_id: Uuid,
    /// Snapshot taken at send time; later profile renames don't rewrite history.
    pub display_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub album_id: Uuid,
    pub author_id: Uuid,
    pub display_name: String,
    pub body: String,
}
