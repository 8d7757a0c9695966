//! src/services/storage_service.rs
//!
//! StorageService — chunked binary store backed entirely by SQLite: a
//! metadata table for file records and a `(file_id, seq)` table for the
//! payload chunks. Keeping both in one database lets a single transaction
//! cover a whole upload or delete, so readers never observe a file that is
//! half written or half removed.

use crate::models::file_object::{FileCategory, FileObject};
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use futures::{Stream, StreamExt, pin_mut};
use md5::Context;
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};
use std::{io, sync::Arc};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Upper bound on a single chunk payload. The final chunk of a file may be
/// smaller; an empty file has no chunks at all.
pub const CHUNK_SIZE_BYTES: usize = 1_048_576;

const FILE_COLUMNS: &str = "id, owner_id, display_name, content_type, category, \
     size_bytes, checksum, uploaded_at, chunk_count";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("file `{0}` not found")]
    FileNotFound(Uuid),
    #[error("chunk {seq} of file `{file_id}` is missing")]
    ChunkMissing { file_id: Uuid, seq: i64 },
    #[error("upload request contained no files")]
    EmptyBatch,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// One input stream of a (possibly multi-file) upload request.
pub struct IncomingFile<S> {
    pub display_name: String,
    pub content_type: String,
    pub data: S,
}

/// StorageService provides the four core operations:
/// - Ingest a byte stream (splits it into bounded chunks, commits metadata last)
/// - Stream a file back (reassembles chunks in sequence order, lazily)
/// - List file metadata (newest first)
/// - Delete a file (chunks and record as one unit)
#[derive(Clone)]
pub struct StorageService {
    /// Shared SQLite connection pool for metadata and chunk payloads.
    pub db: Arc<SqlitePool>,
}

impl StorageService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Consume one byte stream and materialize it as a file.
    ///
    /// Incoming segments arrive at whatever granularity the transport
    /// produced them; they are re-chunked into `CHUNK_SIZE_BYTES` segments
    /// written as seq 0, 1, 2, … strictly in arrival order. Chunk `n` is
    /// flushed before `n + 1` is assigned its sequence number, because the
    /// total size is unknown until the stream ends.
    ///
    /// Every write happens inside one transaction and the metadata row goes
    /// in last, so a reader can never observe the file before it is
    /// complete. If the source errors mid-stream, or the caller disconnects
    /// and this future is dropped, the transaction rolls back and no
    /// partial chunks survive.
    pub async fn ingest_stream<S>(
        &self,
        owner_id: Uuid,
        display_name: &str,
        content_type: &str,
        data: S,
    ) -> StorageResult<FileObject>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        let file_id = Uuid::new_v4();
        let mut tx = self.db.begin().await?;

        let mut buf = BytesMut::new();
        let mut digest = Context::new();
        let mut seq: i64 = 0;
        let mut size_bytes: i64 = 0;

        pin_mut!(data);
        while let Some(part) = data.next().await {
            // `?` drops the transaction, rolling back chunks written so far.
            let part = part?;
            digest.consume(&part);
            size_bytes += part.len() as i64;
            buf.extend_from_slice(&part);
            while buf.len() >= CHUNK_SIZE_BYTES {
                let payload = buf.split_to(CHUNK_SIZE_BYTES).freeze();
                write_chunk(&mut tx, file_id, seq, &payload).await?;
                seq += 1;
            }
        }
        if !buf.is_empty() {
            let payload = buf.split_to(buf.len()).freeze();
            write_chunk(&mut tx, file_id, seq, &payload).await?;
            seq += 1;
        }

        let record = FileObject {
            id: file_id,
            owner_id,
            display_name: display_name.to_string(),
            content_type: content_type.to_string(),
            category: FileCategory::from_content_type(content_type),
            size_bytes,
            checksum: format!("{:x}", digest.compute()),
            uploaded_at: Utc::now(),
            chunk_count: seq,
        };

        sqlx::query(
            "INSERT INTO files (id, owner_id, display_name, content_type, category,
                                size_bytes, checksum, uploaded_at, chunk_count)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id)
        .bind(record.owner_id)
        .bind(&record.display_name)
        .bind(&record.content_type)
        .bind(record.category)
        .bind(record.size_bytes)
        .bind(&record.checksum)
        .bind(record.uploaded_at)
        .bind(record.chunk_count)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        debug!(
            file = %record.id,
            size = record.size_bytes,
            chunks = record.chunk_count,
            "committed upload"
        );
        Ok(record)
    }

    /// Ingest several independent streams, concurrently.
    ///
    /// Each stream gets its own transaction, so one failing source does not
    /// disturb its siblings; the outcome is reported per file. An empty
    /// batch is rejected before any I/O.
    pub async fn ingest_batch<S>(
        &self,
        owner_id: Uuid,
        files: Vec<IncomingFile<S>>,
    ) -> StorageResult<Vec<StorageResult<FileObject>>>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        if files.is_empty() {
            return Err(StorageError::EmptyBatch);
        }
        let uploads = files.into_iter().map(|file| async move {
            self.ingest_stream(owner_id, &file.display_name, &file.content_type, file.data)
                .await
        });
        Ok(futures::future::join_all(uploads).await)
    }

    /// Fetch a file record. Returns FileNotFound if absent.
    pub async fn get_file(&self, id: Uuid) -> StorageResult<FileObject> {
        let sql = format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?");
        sqlx::query_as::<_, FileObject>(&sql)
            .bind(id)
            .fetch_one(&*self.db)
            .await
            .map_err(|err| match err {
                sqlx::Error::RowNotFound => StorageError::FileNotFound(id),
                other => StorageError::Sqlx(other),
            })
    }

    /// Lazily reassemble a file's bytes by reading chunks 0..chunk_count-1
    /// in sequence order.
    ///
    /// The stream is finite and non-restartable. A chunk missing mid-read
    /// (e.g. the file was deleted underneath the transfer) surfaces as
    /// ChunkMissing and aborts the stream; the consumer must start over.
    pub fn chunk_stream(
        &self,
        file: &FileObject,
    ) -> impl Stream<Item = StorageResult<Bytes>> + Send + use<> {
        let db = self.db.clone();
        let file_id = file.id;
        let chunk_count = file.chunk_count;
        futures::stream::try_unfold(0i64, move |seq| {
            let db = db.clone();
            async move {
                if seq >= chunk_count {
                    return Ok(None);
                }
                let payload: Vec<u8> =
                    sqlx::query_scalar("SELECT payload FROM chunks WHERE file_id = ? AND seq = ?")
                        .bind(file_id)
                        .bind(seq)
                        .fetch_one(&*db)
                        .await
                        .map_err(|err| match err {
                            sqlx::Error::RowNotFound => {
                                StorageError::ChunkMissing { file_id, seq }
                            }
                            other => StorageError::Sqlx(other),
                        })?;
                Ok(Some((Bytes::from(payload), seq + 1)))
            }
        })
    }

    /// List file metadata, newest upload first, optionally filtered to one
    /// owner. An empty vec is a legitimate outcome, not an error.
    pub async fn list_files(&self, owner_id: Option<Uuid>) -> StorageResult<Vec<FileObject>> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {FILE_COLUMNS} FROM files"
        ));
        if let Some(owner) = owner_id {
            builder.push(" WHERE owner_id = ");
            builder.push_bind(owner);
        }
        builder.push(" ORDER BY uploaded_at DESC, id");

        let files = builder.build_query_as().fetch_all(&*self.db).await?;
        Ok(files)
    }

    /// Remove a file's chunks and metadata record as one unit.
    ///
    /// The transaction either deletes everything or nothing; the store can
    /// never be observed with chunks but no record, or vice versa.
    /// Repeating the call returns FileNotFound.
    pub async fn delete_file(&self, id: Uuid) -> StorageResult<()> {
        let mut tx = self.db.begin().await?;

        let chunks = sqlx::query("DELETE FROM chunks WHERE file_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let record = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if record.rows_affected() == 0 {
            // Dropping the transaction undoes the chunk delete.
            return Err(StorageError::FileNotFound(id));
        }
        tx.commit().await?;

        debug!(file = %id, chunks = chunks.rows_affected(), "deleted file");
        Ok(())
    }
}

/// Insert one chunk row within the upload's transaction.
async fn write_chunk(
    tx: &mut Transaction<'_, Sqlite>,
    file_id: Uuid,
    seq: i64,
    payload: &Bytes,
) -> StorageResult<()> {
    sqlx::query("INSERT INTO chunks (file_id, seq, payload) VALUES (?, ?, ?)")
        .bind(file_id)
        .bind(seq)
        .bind(payload.as_ref())
        .execute(&mut **tx)
        .await?;
    Ok(())
}
