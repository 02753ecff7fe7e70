use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    extract::{
        ws::{Message as WsFrame, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    Extension,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, RwLock};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::Message,
    services::{access, auth::Claims},
    storage::redis::{album_from_channel, RedisClient},
    AppState,
};

use super::{extract::AppPath, middleware::get_optional_user_id};

const CHANNEL_CAPACITY: usize = 256;
const RELAY_RETRY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsIncomingMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsOutgoingMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub payload: serde_json::Value,
}

impl WsOutgoingMessage {
    fn pong() -> Self {
        Self {
            msg_type: "pong".to_string(),
            payload: serde_json::json!({}),
        }
    }
}

/// Per-album fan-out of chat messages to connected sockets.
///
/// With Redis configured every message goes through `albums:{id}:messages`
/// and comes back via `run_relay`, so all instances deliver it.
pub struct WsHub {
    channels: RwLock<HashMap<Uuid, broadcast::Sender<String>>>,
    redis: Option<RedisClient>,
}

impl WsHub {
    pub fn new(redis: Option<RedisClient>) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            redis,
        }
    }

    pub async fn subscribe(&self, album_id: Uuid) -> broadcast::Receiver<String> {
        let mut channels = self.channels.write().await;
        let sender = channels
            .entry(album_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        tracing::debug!(
            "Socket subscribed to album {} ({} listening)",
            album_id,
            sender.receiver_count() + 1
        );
        sender.subscribe()
    }

    /// Drops the album channel once its last receiver is gone.
    pub async fn release(&self, album_id: Uuid) {
        let mut channels = self.channels.write().await;
        if channels
            .get(&album_id)
            .is_some_and(|sender| sender.receiver_count() == 0)
        {
            channels.remove(&album_id);
            tracing::debug!("Album {} has no listeners left", album_id);
        }
    }

    pub async fn publish(&self, message: &Message) {
        let event = WsOutgoingMessage {
            msg_type: "message".to_string(),
            payload: serde_json::to_value(message).unwrap_or_default(),
        };
        let Ok(text) = serde_json::to_string(&event) else {
            return;
        };

        if let Some(redis) = &self.redis {
            match redis.publish_album_message(message.album_id, &text).await {
                Ok(()) => return,
                Err(e) => tracing::warn!("Redis publish failed, delivering locally: {}", e),
            }
        }

        self.deliver_local(message.album_id, text).await;
    }

    async fn deliver_local(&self, album_id: Uuid, text: String) {
        let channels = self.channels.read().await;
        if let Some(sender) = channels.get(&album_id) {
            // No receivers is not an error.
            let _ = sender.send(text);
        }
    }

    /// Feeds Redis pub/sub traffic back into the local channels. Returns
    /// immediately when Redis is not configured.
    pub async fn run_relay(self: Arc<Self>) {
        let Some(redis) = self.redis.clone() else {
            return;
        };

        loop {
            match redis.subscribe_album_messages().await {
                Ok(mut pubsub) => {
                    tracing::info!("Relaying album messages from Redis");
                    let mut stream = pubsub.on_message();
                    while let Some(msg) = stream.next().await {
                        let Some(album_id) = album_from_channel(msg.get_channel_name()) else {
                            continue;
                        };
                        match msg.get_payload::<String>() {
                            Ok(text) => self.deliver_local(album_id, text).await,
                            Err(e) => tracing::warn!("Bad payload on album channel: {}", e),
                        }
                    }
                    tracing::warn!("Redis subscription closed");
                }
                Err(e) => tracing::error!("Redis subscribe failed: {}", e),
            }
            tokio::time::sleep(RELAY_RETRY).await;
        }
    }
}

pub async fn handle_websocket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    AppPath(album_id): AppPath<Uuid>,
    claims: Option<Extension<Claims>>,
) -> AppResult<Response> {
    let user_id = get_optional_user_id(claims.as_deref())?;
    let album = access::require_read(state.store.as_ref(), album_id, user_id).await?;
    let hub = state.ws_hub.clone();

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, hub, album.id)))
}

async fn handle_socket(socket: WebSocket, hub: Arc<WsHub>, album_id: Uuid) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let mut events = hub.subscribe(album_id).await;

    // Replies addressed to this socket only
    let (tx, mut rx) = mpsc::channel::<WsOutgoingMessage>(16);

    let mut send_task = tokio::spawn(async move {
        loop {
            let text = tokio::select! {
                event = events.recv() => match event {
                    Ok(text) => text,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Socket on album {} lagged by {} messages", album_id, skipped);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                reply = rx.recv() => match reply.and_then(|r| serde_json::to_string(&r).ok()) {
                    Some(text) => text,
                    None => break,
                },
            };
            if ws_sender.send(WsFrame::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(WsFrame::Text(text)) => {
                    if let Ok(msg) = serde_json::from_str::<WsIncomingMessage>(&text) {
                        handle_incoming_message(&tx, msg).await;
                    }
                }
                Ok(WsFrame::Close(_)) | Err(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => {
            send_task.abort();
            // The receiver must be dropped before release.
            let _ = send_task.await;
        }
    }

    hub.release(album_id).await;
}

async fn handle_incoming_message(tx: &mpsc::Sender<WsOutgoingMessage>, msg: WsIncomingMessage) {
    match msg.msg_type.as_str() {
        "ping" => {
            let _ = tx.send(WsOutgoingMessage::pong()).await;
        }
        _ => {
            tracing::debug!("Ignoring socket message of type {}", msg.msg_type);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn message(album_id: Uuid) -> Message {
        Message {
            id: Uuid::new_v4(),
            album_id,
            author_id: Uuid::new_v4(),
            display_name: "Ana".to_string(),
            body: "hello".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn published_message_reaches_album_subscribers_only() {
        let hub = WsHub::new(None);
        let album = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut rx = hub.subscribe(album).await;
        let mut other_rx = hub.subscribe(other).await;

        let sent = message(album);
        hub.publish(&sent).await;

        let event: WsOutgoingMessage = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(event.msg_type, "message");
        assert_eq!(event.payload["id"], sent.id.to_string());
        assert!(other_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn release_drops_idle_channels() {
        let hub = WsHub::new(None);
        let album = Uuid::new_v4();

        let rx = hub.subscribe(album).await;
        hub.release(album).await;
        assert!(hub.channels.read().await.contains_key(&album));

        drop(rx);
        hub.release(album).await;
        assert!(!hub.channels.read().await.contains_key(&album));
    }

    #[tokio::test]
    async fn ping_gets_pong() {
        let (tx, mut rx) = mpsc::channel(1);
        handle_incoming_message(
            &tx,
            WsIncomingMessage {
                msg_type: "ping".to_string(),
                payload: serde_json::Value::Null,
            },
        )
        .await;

        assert_eq!(rx.recv().await.unwrap().msg_type, "pong");
    }

    #[tokio::test]
    async fn publishing_without_listeners_is_fine() {
        let hub = WsHub::new(None);
        hub.publish(&message(Uuid::new_v4())).await;
    }
}
