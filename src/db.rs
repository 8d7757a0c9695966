//! Embedded schema application.
//!
//! The schema is baked into the binary so fresh databases (and the
//! in-memory pools used by tests) can be initialized without a migrations
//! directory on disk. Statements are all `IF NOT EXISTS`, so re-applying is
//! harmless.

use sqlx::SqlitePool;

const SCHEMA: &str = include_str!("../migrations/0001_init.sql");

/// Execute every statement of the embedded schema against the pool.
pub async fn apply_schema(db: &SqlitePool) -> Result<(), sqlx::Error> {
    let statements = SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty());

    for stmt in statements {
        sqlx::query(stmt).execute(db).await?;
    }
    Ok(())
}
