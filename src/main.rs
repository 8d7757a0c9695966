use anyhow::Result;
use axum::{Router, extract::DefaultBodyLimit};
use chrono::Duration;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{io::ErrorKind, path::Path, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use filevault::{
    config::AppConfig,
    db, routes,
    services::{auth_service::AuthService, storage_service::StorageService},
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + run-and-exit flags ---
    let (cfg, args) = AppConfig::from_env_and_args()?;

    tracing::info!("Starting filevault on {} (db: {})", cfg.addr(), cfg.database_url);
    if cfg.auth_secret == "insecure-dev-secret" {
        tracing::warn!("FILEVAULT_AUTH_SECRET is not set; tokens are signed with the dev secret");
    }

    // --- Ensure the database directory exists ---
    let db_path = cfg
        .database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("file:");
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    // --- Initialize SQLite connection ---
    let options = SqliteConnectOptions::from_str(&cfg.database_url)?.create_if_missing(true);
    let db: Arc<sqlx::SqlitePool> = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?,
    );

    // Idempotent; also covers --migrate mode.
    db::apply_schema(&db).await?;
    if args.migrate {
        tracing::info!("Database schema applied.");
        return Ok(());
    }

    // --- Initialize core services ---
    let storage = StorageService::new(db.clone());
    let auth = AuthService::new(
        db.clone(),
        cfg.auth_secret.clone(),
        Duration::days(cfg.token_ttl_days),
    );

    // --- Token minting mode ---
    if let Some(principal_id) = args.issue_token {
        let token = auth.issue_token(principal_id)?;
        println!("{token}");
        return Ok(());
    }

    // --- Build router ---
    let state = AppState {
        storage,
        auth,
        delete_scope: cfg.delete_scope,
    };
    let app: Router = routes::routes::routes()
        .with_state(state)
        .layer(DefaultBodyLimit::max(cfg.max_upload_bytes));

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
