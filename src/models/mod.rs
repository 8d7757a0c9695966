//! Core data models for the chunked file store.
//!
//! These entities map to SQLite rows via `sqlx::FromRow` and serialize
//! naturally as camelCase JSON via `serde`, matching the shapes the HTTP
//! surface exposes.

pub mod file_object;
pub mod principal;
