use std::sync::Arc;

use uuid::Uuid;

use super::access;
use crate::{
    error::{AppError, AppResult},
    models::{Message, NewMessage},
    storage::Store,
};

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 200;
pub const MAX_BODY_CHARS: usize = 500;
pub const ANONYMOUS: &str = "Anonymous";

pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

fn validate_body(body: &str) -> AppResult<String> {
    let body = body.trim();
    if body.is_empty() {
        return Err(AppError::invalid("body", "Message cannot be empty"));
    }
    if body.chars().count() > MAX_BODY_CHARS {
        return Err(AppError::invalid(
            "body",
            format!("Message must be at most {} characters", MAX_BODY_CHARS),
        ));
    }
    Ok(body.to_string())
}

pub struct MessagesService {
    store: Arc<dyn Store>,
}

impl MessagesService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Latest messages of an album, oldest first
    pub async fn list(
        &self,
        album_id: Uuid,
        user_id: Option<Uuid>,
        limit: Option<i64>,
    ) -> AppResult<Vec<Message>> {
        access::require_read(self.store.as_ref(), album_id, user_id).await?;
        self.store.list_messages(album_id, clamp_limit(limit)).await
    }

    /// Store a message. Anyone who can read the album can talk in it.
    pub async fn post(
        &self,
        album_id: Uuid,
        user_id: Uuid,
        display_name: Option<&str>,
        body: &str,
    ) -> AppResult<Message> {
        let body = validate_body(body)?;
        access::require_read(self.store.as_ref(), album_id, Some(user_id)).await?;

        let display_name = display_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(ANONYMOUS)
            .to_string();

        self.store
            .insert_message(NewMessage {
                album_id,
                author_id: user_id,
                display_name,
                body,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{NewAlbum, Visibility},
        storage::mock::MockStore,
    };

    async fn setup(visibility: Visibility) -> (MessagesService, Uuid, Uuid) {
        let store = Arc::new(MockStore::new());
        let owner = Uuid::new_v4();
        let album = store
            .create_album(NewAlbum {
                owner_id: owner,
                name: "Chat".to_string(),
                slug: "chat".to_string(),
                visibility,
                cover_url: None,
            })
            .await
            .unwrap();
        (MessagesService::new(store), album.id, owner)
    }

    #[test]
    fn limit_defaults_and_caps() {
        assert_eq!(clamp_limit(None), DEFAULT_LIMIT);
        assert_eq!(clamp_limit(Some(1000)), MAX_LIMIT);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(10)), 10);
    }

    #[tokio::test]
    async fn post_trims_and_names_anonymous() {
        let (service, album_id, owner) = setup(Visibility::Private).await;

        let message = service.post(album_id, owner, Some("  "), "  hello  ").await.unwrap();
        assert_eq!(message.body, "hello");
        assert_eq!(message.display_name, ANONYMOUS);

        let listed = service.list(album_id, Some(owner), None).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn body_length_is_bounded() {
        let (service, album_id, owner) = setup(Visibility::Public).await;

        assert!(matches!(
            service.post(album_id, owner, None, "   ").await,
            Err(AppError::InvalidField { field: "body", .. })
        ));
        let long = "x".repeat(MAX_BODY_CHARS + 1);
        assert!(service.post(album_id, owner, None, &long).await.is_err());
        let max = "x".repeat(MAX_BODY_CHARS);
        assert!(service.post(album_id, owner, None, &max).await.is_ok());
    }

    #[tokio::test]
    async fn strangers_cannot_see_private_chat() {
        let (service, album_id, _) = setup(Visibility::Private).await;
        let stranger = Uuid::new_v4();

        assert!(matches!(
            service.list(album_id, Some(stranger), None).await,
            Err(AppError::AlbumNotFound)
        ));
        assert!(matches!(
            service.post(album_id, stranger, Some("Eve"), "hi").await,
            Err(AppError::AlbumNotFound)
        ));
    }

    #[tokio::test]
    async fn list_returns_oldest_first() {
        let (service, album_id, owner) = setup(Visibility::Public).await;
        for body in ["one", "two", "three"] {
            service.post(album_id, owner, Some("Ana"), body).await.unwrap();
        }

        let bodies: Vec<String> = service
            .list(album_id, None, Some(2))
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.body)
            .collect();
        assert_eq!(bodies, vec!["two", "three"]);
    }
}
