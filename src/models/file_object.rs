//! Represents one logically complete stored binary and its chunk layout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Closed set of content categories, resolved once at ingestion time from
/// the declared content type and persisted on the record. Read paths do a
/// pure lookup instead of re-sniffing MIME strings per request.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Image,
    Video,
    Document,
    Other,
}

/// Response-shaping decision applied when streaming an object back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FramingMode {
    /// Serve with the stored content type, rendered in place.
    Inline,
    /// Force a download carrying the original display name.
    Attachment,
}

impl FileCategory {
    /// Classify a declared MIME type into the closed category set.
    pub fn from_content_type(content_type: &str) -> Self {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim()
            .to_ascii_lowercase();
        if mime.starts_with("image/") {
            Self::Image
        } else if mime.starts_with("video/") {
            Self::Video
        } else if mime.starts_with("text/")
            || mime == "application/pdf"
            || mime == "application/msword"
            || mime.starts_with("application/vnd.")
        {
            Self::Document
        } else {
            Self::Other
        }
    }

    /// Framing is a pure function of the category: images render inline,
    /// everything else is forced to download.
    pub fn framing(self) -> FramingMode {
        match self {
            Self::Image => FramingMode::Inline,
            _ => FramingMode::Attachment,
        }
    }
}

/// Metadata record describing one stored binary.
///
/// Created atomically once all chunks are written; immutable afterwards
/// except for deletion. The payload bytes themselves live in the chunk
/// table, never on this struct.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FileObject {
    /// Globally unique, never reused.
    pub id: Uuid,

    /// Principal that uploaded the file.
    pub owner_id: Uuid,

    /// Original filename as supplied by the uploader.
    pub display_name: String,

    /// Declared MIME type.
    pub content_type: String,

    /// Category resolved at ingestion time.
    pub category: FileCategory,

    /// Total payload size; equals the sum of all chunk lengths.
    pub size_bytes: i64,

    /// Hex MD5 of the full payload, computed while streaming.
    pub checksum: String,

    /// When the upload was committed.
    pub uploaded_at: DateTime<Utc>,

    /// Number of chunks; zero for an empty upload.
    pub chunk_count: i64,
}
