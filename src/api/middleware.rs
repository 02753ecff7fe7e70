use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    services::auth::{AuthService, Claims},
    AppState,
};

type BearerHeader = TypedHeader<Authorization<Bearer>>;

/// Resolves the caller from the bearer token. A token that is present is
/// always validated; without one, mock mode falls back to the demo identity.
fn resolve_claims(state: &AppState, bearer: Option<BearerHeader>) -> AppResult<Option<Claims>> {
    match bearer {
        Some(TypedHeader(Authorization(bearer))) => {
            let auth_service = AuthService::new(state.config.jwt.clone());
            auth_service.validate_token(bearer.token()).map(Some)
        }
        None if state.config.is_mock() => Ok(Some(Claims::demo())),
        None => Ok(None),
    }
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<BearerHeader>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = resolve_claims(&state, bearer)?.ok_or(AppError::Unauthorized)?;

    // Insert claims into request extensions
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Like `auth_middleware`, but lets anonymous requests through without claims.
pub async fn optional_auth_middleware(
    State(state): State<AppState>,
    bearer: Option<BearerHeader>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(claims) = resolve_claims(&state, bearer)? {
        request.extensions_mut().insert(claims);
    }

    Ok(next.run(request).await)
}

/// Extract user_id from request extensions
pub fn get_user_id(claims: &Claims) -> AppResult<Uuid> {
    claims.user_id()
}

/// Same for routes where the caller may be anonymous
pub fn get_optional_user_id(claims: Option<&Claims>) -> AppResult<Option<Uuid>> {
    claims.map(get_user_id).transpose()
}
