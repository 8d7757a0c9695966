//! Defines routes for the file store API.
//!
//! ## Structure
//! - **File endpoints**
//!   - `POST   /files` — upload 1..n multipart parts (bearer token)
//!   - `GET    /files` — list metadata, newest first (bearer token)
//!   - `GET    /files/{id}` — public streaming download
//!   - `DELETE /files/{id}` — delete file + chunks (bearer token)
//!
//! - **Auth endpoint**
//!   - `GET /auth/me` — current principal and avatar metadata
//!
//! Health endpoints are mounted at the root. Protection comes from the
//! `AuthPrincipal` extractor on each handler, not from route middleware.

use crate::{
    handlers::{
        auth_handlers::get_me,
        file_handlers::{delete_file, download_file, list_files, upload_files},
        health_handlers::{healthz, readyz},
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build and return the router for all API routes.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // file endpoints
        .route("/files", post(upload_files).get(list_files))
        .route("/files/{id}", get(download_file).delete(delete_file))
        // auth endpoint
        .route("/auth/me", get(get_me))
}
