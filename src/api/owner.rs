use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use super::errors::AppError;

/// Header carrying the authenticated owner's id, set by the upstream auth
/// layer. This service never issues or validates credentials itself.
pub const OWNER_HEADER: &str = "x-owner-id";

/// Authenticated owner identity, injected per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerId(pub Uuid);

impl<S: Send + Sync> FromRequestParts<S> for OwnerId {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<Uuid>().ok())
            .map(OwnerId)
            .ok_or(AppError::Unauthorized)
    }
}
