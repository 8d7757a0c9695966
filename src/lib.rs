//! Chunked binary file store with streaming ingestion/egress and a
//! token-gated access layer. The binary in `main.rs` wires these modules to
//! a TCP listener; integration tests drive the same router directly.

pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
