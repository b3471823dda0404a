//! Caller identification
//!
//! The bearer token is the caller's opaque user id, minted by whatever
//! identity layer fronts this service. Token verification happens upstream;
//! here we only parse the id and let per-room membership checks authorize.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use rota_core::Error;
use uuid::Uuid;

use crate::error::ApiError;

/// The authenticated caller, extracted from the Authorization header.
#[derive(Debug, Clone, Copy)]
pub struct AuthorizedUser(Uuid);

impl AuthorizedUser {
    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl<S> FromRequestParts<S> for AuthorizedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ApiError(Error::PermissionDenied("Missing authorization".into()))
            })?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError(Error::PermissionDenied("Malformed authorization".into()))
        })?;

        let user_id = Uuid::parse_str(token.trim())
            .map_err(|_| ApiError(Error::PermissionDenied("Invalid token".into())))?;

        Ok(AuthorizedUser(user_id))
    }
}
