use axum::{extract::FromRequestParts, http::request::Parts};
use livepoll_core::AppState;

use crate::error::ApiError;

/// Acting user id, asserted upstream by the fronting auth layer via the
/// `X-User-Id` header. Token issuance and validation live outside this
/// service.
pub struct AuthUser {
    pub user_id: i64,
}

fn user_id_from_parts(parts: &Parts) -> Result<Option<i64>, ApiError> {
    let Some(raw) = parts.headers.get("x-user-id") else {
        return Ok(None);
    };
    let raw = raw.to_str().map_err(|_| ApiError::Unauthorized)?;
    let user_id = raw.trim().parse::<i64>().map_err(|_| ApiError::Unauthorized)?;
    Ok(Some(user_id))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match user_id_from_parts(parts)? {
            Some(user_id) => Ok(AuthUser { user_id }),
            None => Err(ApiError::Unauthorized),
        }
    }
}

/// Like [`AuthUser`] but anonymous callers are allowed through; read
/// endpoints use this to apply visibility rules.
pub struct MaybeAuthUser(pub Option<i64>);

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(user_id_from_parts(parts)?))
    }
}
