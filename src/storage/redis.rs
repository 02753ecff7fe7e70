use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use uuid::Uuid;

use crate::error::AppResult;

pub const ALBUM_CHANNEL_PATTERN: &str = "albums:*:messages";

pub fn album_channel(album_id: Uuid) -> String {
    format!("albums:{}:messages", album_id)
}

/// Parses the album id back out of a channel name built by `album_channel`.
pub fn album_from_channel(channel: &str) -> Option<Uuid> {
    channel
        .strip_prefix("albums:")?
        .strip_suffix(":messages")
        .and_then(|id| Uuid::parse_str(id).ok())
}

#[derive(Clone)]
pub struct RedisClient {
    client: Client,
    conn: MultiplexedConnection,
}

impl RedisClient {
    pub async fn new(url: &str) -> AppResult<Self> {
        let client = Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self { client, conn })
    }

    // Pub/Sub for album chat
    pub async fn publish_album_message(&self, album_id: Uuid, message: &str) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.publish(album_channel(album_id), message).await?;
        Ok(())
    }

    pub async fn subscribe_album_messages(&self) -> AppResult<redis::aio::PubSub> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.psubscribe(ALBUM_CHANNEL_PATTERN).await?;
        Ok(pubsub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_names_round_trip_album_id() {
        let album_id = Uuid::new_v4();
        let channel = album_channel(album_id);

        assert!(channel.starts_with("albums:"));
        assert_eq!(album_from_channel(&channel), Some(album_id));
        assert_eq!(album_from_channel("messages:someone"), None);
    }
}
