use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::JwtConfig,
    error::{AppError, AppResult},
    storage::mock::DEMO_USER_ID,
};

/// Claims issued by the identity provider. Only `sub` is required.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user_id
    pub exp: i64,    // expiry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Claims {
    /// Identity assumed by unauthenticated requests in mock mode.
    pub fn demo() -> Self {
        Self {
            sub: DEMO_USER_ID.to_string(),
            exp: i64::MAX,
            iss: None,
            email: None,
            name: Some("Demo User".to_string()),
        }
    }

    pub fn user_id(&self) -> AppResult<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::InvalidToken)
    }

    /// Best human-readable name the token carries.
    pub fn display_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .filter(|n| !n.trim().is_empty())
    }
}

pub struct AuthService {
    config: JwtConfig,
}

impl AuthService {
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }

    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        if let Some(issuer) = &self.config.issuer {
            validation.set_issuer(&[issuer]);
            validation.set_required_spec_claims(&["exp", "iss"]);
        }

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AppError::InvalidToken,
            _ => AppError::Jwt(e),
        })?;

        // Reject tokens whose subject is not a user id up front.
        token_data.claims.user_id()?;

        Ok(token_data.claims)
    }
}


#[cfg(test)]
mod tests {
    use jsonwebtoken::{encode, EncodingKey, Header};

    use super::test_support::token_for;
    use super::*;

    fn service(issuer: Option<&str>) -> AuthService {
        AuthService::new(JwtConfig {
            secret: "secret".to_string(),
            issuer: issuer.map(str::to_string),
        })
    }

    #[test]
    fn valid_token_yields_user() {
        let user_id = Uuid::new_v4();
        let token = token_for("secret", user_id, Some("Ana"));

        let claims = service(None).validate_token(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), user_id);
        assert_eq!(claims.display_name(), Some("Ana"));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = token_for("other", Uuid::new_v4(), None);
        assert!(service(None).validate_token(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            exp: chrono::Utc::now().timestamp() - 3600,
            iss: None,
            email: None,
            name: None,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        assert!(matches!(
            service(None).validate_token(&token),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn issuer_is_checked_when_configured() {
        let token = token_for("secret", Uuid::new_v4(), None);
        assert!(service(Some("https://auth.example")).validate_token(&token).is_err());
    }

    #[test]
    fn non_uuid_subject_is_rejected() {
        let claims = Claims {
            sub: "not-a-uuid".to_string(),
            exp: chrono::Utc::now().timestamp() + 3600,
            iss: None,
            email: None,
            name: None,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        assert!(matches!(
            service(None).validate_token(&token),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let mut claims = Claims::demo();
        claims.name = None;
        claims.email = Some("ana@example.com".to_string());
        assert_eq!(claims.display_name(), Some("ana@example.com"));
    }
}
