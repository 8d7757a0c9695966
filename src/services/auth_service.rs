//! src/services/auth_service.rs
//!
//! AuthService — verifies bearer credentials and resolves them to stored
//! principals. Tokens are `base64url(claims).base64url(hmac-sha256)` over
//! the encoded claims, keyed by the configured secret. Tokens are opaque to
//! holders; only this service mints or checks them.
//!
//! Nothing in this module logs token material or decoded claims.

use crate::models::principal::{Principal, Role};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("not authorized, no token")]
    MissingCredentials,
    #[error("authorization header is not a bearer credential")]
    MalformedScheme,
    #[error("token is malformed")]
    MalformedToken,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    ExpiredToken,
    #[error("principal not found")]
    UnknownPrincipal,
    #[error("role `{0:?}` is not authorized for this operation")]
    RoleNotAllowed(Role),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("token encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Signed token payload. `sub` is the principal id; timestamps are unix
/// seconds.
#[derive(Serialize, Deserialize, Debug)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct AuthService {
    db: Arc<SqlitePool>,
    secret: Arc<String>,
    token_ttl: Duration,
}

impl AuthService {
    pub fn new(db: Arc<SqlitePool>, secret: impl Into<String>, token_ttl: Duration) -> Self {
        Self {
            db,
            secret: Arc::new(secret.into()),
            token_ttl,
        }
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length.
        HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("hmac key length is unrestricted")
    }

    /// Mint a signed bearer token for a principal id, valid for the
    /// configured TTL from now.
    pub fn issue_token(&self, principal_id: Uuid) -> AuthResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: principal_id,
            iat: now.timestamp(),
            exp: (now + self.token_ttl).timestamp(),
        };
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{payload}.{signature}"))
    }

    /// Check a raw token's signature and expiry, returning its claims.
    pub fn verify_token(&self, token: &str) -> AuthResult<Claims> {
        let (payload, signature) = token.split_once('.').ok_or(AuthError::MalformedToken)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthError::MalformedToken)?;

        // Signature first: claims from an unverified payload are untrusted.
        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::InvalidSignature)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| AuthError::MalformedToken)?;
        let claims: Claims =
            serde_json::from_slice(&payload).map_err(|_| AuthError::MalformedToken)?;
        if claims.exp < Utc::now().timestamp() {
            return Err(AuthError::ExpiredToken);
        }
        Ok(claims)
    }

    /// Verify an `Authorization` header value and resolve the principal it
    /// names. Each failure mode is distinct: missing header, wrong scheme,
    /// undecodable token, bad signature, expired token, unknown principal.
    pub async fn authenticate(&self, header: Option<&str>) -> AuthResult<Principal> {
        let header = header.ok_or(AuthError::MissingCredentials)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::MalformedScheme)?;
        let claims = self.verify_token(token.trim())?;
        self.fetch_principal(claims.sub).await
    }

    /// Look up a principal row by id.
    pub async fn fetch_principal(&self, id: Uuid) -> AuthResult<Principal> {
        sqlx::query_as::<_, Principal>(
            "SELECT id, display_name, credential_hash, role, avatar_file_id
             FROM principals WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => AuthError::UnknownPrincipal,
            other => AuthError::Sqlx(other),
        })
    }
}

/// Pure role gate: no I/O, no clock. Rejects with the principal's role so
/// the caller can report it.
pub fn authorize(principal: &Principal, allowed: &[Role]) -> AuthResult<()> {
    if allowed.contains(&principal.role) {
        Ok(())
    } else {
        Err(AuthError::RoleNotAllowed(principal.role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_auth(ttl: Duration) -> AuthService {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::apply_schema(&pool).await.unwrap();
        AuthService::new(Arc::new(pool), "test-secret", ttl)
    }

    async fn seed_principal(auth: &AuthService, role: Role) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO principals (id, display_name, credential_hash, role, avatar_file_id)
             VALUES (?, ?, ?, ?, NULL)",
        )
        .bind(id)
        .bind("tester")
        .bind("hash")
        .bind(role)
        .execute(&*auth.db)
        .await
        .unwrap();
        id
    }

    #[tokio::test]
    async fn valid_token_resolves_principal() {
        let auth = test_auth(Duration::days(30)).await;
        let id = seed_principal(&auth, Role::User).await;
        let token = auth.issue_token(id).unwrap();

        let principal = auth
            .authenticate(Some(&format!("Bearer {token}")))
            .await
            .unwrap();
        assert_eq!(principal.id, id);
        assert_eq!(principal.role, Role::User);
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        let auth = test_auth(Duration::days(30)).await;
        assert!(matches!(
            auth.authenticate(None).await,
            Err(AuthError::MissingCredentials)
        ));
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_rejected() {
        let auth = test_auth(Duration::days(30)).await;
        assert!(matches!(
            auth.authenticate(Some("Basic dXNlcjpwdw==")).await,
            Err(AuthError::MalformedScheme)
        ));
    }

    #[tokio::test]
    async fn tampered_signature_is_rejected() {
        let auth = test_auth(Duration::days(30)).await;
        let id = seed_principal(&auth, Role::User).await;
        let token = auth.issue_token(id).unwrap();
        let (payload, _) = token.split_once('.').unwrap();
        let forged = format!("{payload}.{}", URL_SAFE_NO_PAD.encode([0u8; 32]));

        assert!(matches!(
            auth.authenticate(Some(&format!("Bearer {forged}"))).await,
            Err(AuthError::InvalidSignature)
        ));
    }

    #[tokio::test]
    async fn garbage_token_is_malformed() {
        let auth = test_auth(Duration::days(30)).await;
        assert!(matches!(
            auth.verify_token("not-a-token"),
            Err(AuthError::MalformedToken)
        ));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let auth = test_auth(Duration::seconds(-60)).await;
        let id = seed_principal(&auth, Role::User).await;
        let token = auth.issue_token(id).unwrap();

        assert!(matches!(
            auth.verify_token(&token),
            Err(AuthError::ExpiredToken)
        ));
    }

    #[tokio::test]
    async fn valid_token_for_unknown_principal_is_rejected() {
        let auth = test_auth(Duration::days(30)).await;
        let token = auth.issue_token(Uuid::new_v4()).unwrap();

        assert!(matches!(
            auth.authenticate(Some(&format!("Bearer {token}"))).await,
            Err(AuthError::UnknownPrincipal)
        ));
    }

    #[tokio::test]
    async fn role_gate_is_pure_and_strict() {
        let auth = test_auth(Duration::days(30)).await;
        let id = seed_principal(&auth, Role::User).await;
        let principal = auth.fetch_principal(id).await.unwrap();

        assert!(authorize(&principal, &[Role::User, Role::Admin]).is_ok());
        assert!(matches!(
            authorize(&principal, &[Role::Admin]),
            Err(AuthError::RoleNotAllowed(Role::User))
        ));
    }

    #[tokio::test]
    async fn dangling_avatar_does_not_break_principal_lookup() {
        let auth = test_auth(Duration::days(30)).await;
        let id = Uuid::new_v4();
        // Avatar points at a file id that was never uploaded.
        sqlx::query(
            "INSERT INTO principals (id, display_name, credential_hash, role, avatar_file_id)
             VALUES (?, 'tester', 'hash', 'user', ?)",
        )
        .bind(id)
        .bind(Uuid::new_v4())
        .execute(&*auth.db)
        .await
        .unwrap();

        let principal = auth.fetch_principal(id).await.unwrap();
        assert!(principal.avatar_file_id.is_some());
    }
}
