//! Request-side auth plumbing: the extractor that gates protected routes
//! and the current-principal endpoint.

use crate::{
    errors::AppError,
    models::principal::Principal,
    services::storage_service::StorageError,
    state::AppState,
};
use axum::{
    Json,
    extract::{FromRequestParts, State},
    http::{header, request::Parts},
};
use serde_json::{Value, json};

/// Extractor that verifies the `Authorization` header and binds the
/// resolved principal to the request. Protected handlers take this as an
/// argument; rejection is the 401/403 mapping of the underlying AuthError.
pub struct AuthPrincipal(pub Principal);

impl FromRequestParts<AppState> for AuthPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let principal = state.auth.authenticate(header).await?;
        Ok(Self(principal))
    }
}

/// GET `/auth/me` — the authenticated principal plus its avatar metadata.
///
/// The avatar reference is a weak pointer: if the file it names no longer
/// exists, the avatar resolves to null rather than failing the lookup.
pub async fn get_me(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> Result<Json<Value>, AppError> {
    let avatar = match principal.avatar_file_id {
        Some(id) => match state.storage.get_file(id).await {
            Ok(file) => Some(file),
            Err(StorageError::FileNotFound(_)) => None,
            Err(err) => return Err(err.into()),
        },
        None => None,
    };

    Ok(Json(json!({
        "success": true,
        "data": principal,
        "avatar": avatar,
    })))
}
