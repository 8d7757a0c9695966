//! HTTP handlers for the four file operations.
//! Bodies are streamed in both directions — multipart parts feed the upload
//! pipeline without buffering whole files, and downloads are assembled
//! chunk by chunk. Storage concerns live in `StorageService`.

use crate::{
    config::DeleteScope,
    errors::AppError,
    handlers::auth_handlers::AuthPrincipal,
    models::{file_object::FramingMode, principal::Role},
    services::{auth_service::authorize, storage_service::StorageError},
    state::AppState,
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use std::io;
use tracing::warn;
use uuid::Uuid;

/// POST `/files` — ingest 1..n multipart file parts.
///
/// Each part is consumed as its own stream and committed (or rolled back)
/// independently, so one failing part never poisons its siblings. The
/// response reports the outcome per file; zero file parts is a validation
/// error raised before any storage I/O.
pub async fn upload_files(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut files = Vec::new();
    let mut failures = Vec::new();
    let mut parts = 0usize;

    while let Some(field) = multipart.next_field().await? {
        // Non-file form fields are not upload streams.
        if field.file_name().is_none() {
            continue;
        }
        parts += 1;
        let display_name = field.file_name().unwrap_or("unnamed").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = futures::stream::try_unfold(field, |mut field| async move {
            match field.chunk().await {
                Ok(Some(part)) => Ok(Some((part, field))),
                Ok(None) => Ok(None),
                Err(err) => Err(io::Error::new(io::ErrorKind::Other, err)),
            }
        });

        match state
            .storage
            .ingest_stream(principal.id, &display_name, &content_type, data)
            .await
        {
            Ok(file) => files.push(file),
            Err(err) => {
                warn!(file = %display_name, error = %err, "upload stream failed");
                failures.push(json!({
                    "displayName": display_name,
                    "error": err.to_string(),
                }));
            }
        }
    }

    if parts == 0 {
        return Err(StorageError::EmptyBatch.into());
    }

    let body = Json(json!({
        "success": failures.is_empty(),
        "files": files,
        "failures": failures,
    }));
    Ok((StatusCode::CREATED, body).into_response())
}

/// GET `/files` — all file metadata, newest upload first.
///
/// An empty store is reported as a 404-style signal rather than an empty
/// array; that is an explicit outcome here, not an error path.
pub async fn list_files(
    State(state): State<AppState>,
    AuthPrincipal(_principal): AuthPrincipal,
) -> Result<Response, AppError> {
    let files = state.storage.list_files(None).await?;
    if files.is_empty() {
        let body = Json(json!({"success": false, "error": "no files exist"}));
        return Ok((StatusCode::NOT_FOUND, body).into_response());
    }
    Ok(Json(files).into_response())
}

/// GET `/files/{id}` — public streaming download.
///
/// Framing comes from the category persisted at ingestion: images render
/// inline, everything else forces a download with the original name.
pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let file = state.storage.get_file(id).await?;
    let body = Body::from_stream(state.storage.chunk_stream(&file));

    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&file.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&file.size_bytes.max(0).to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
    if file.category.framing() == FramingMode::Attachment {
        let disposition = format!(
            "attachment; filename=\"{}\"",
            sanitize_filename(&file.display_name)
        );
        headers.insert(
            header::CONTENT_DISPOSITION,
            HeaderValue::from_str(&disposition)
                .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
        );
    }
    Ok(response)
}

/// DELETE `/files/{id}` — remove a file and all its chunks.
///
/// Under the `owner` delete scope, non-owners need the admin role; the
/// default `any` scope keeps shared-bucket semantics.
pub async fn delete_file(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let file = state.storage.get_file(id).await?;
    if state.delete_scope == DeleteScope::Owner && file.owner_id != principal.id {
        authorize(&principal, &[Role::Admin])?;
    }
    state.storage.delete_file(id).await?;

    Ok(Json(json!({"success": true, "message": "file deleted"})))
}

/// Keep header values parseable: quotes and control characters have no
/// place in a filename parameter.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_control() && *c != '"')
        .collect()
}
