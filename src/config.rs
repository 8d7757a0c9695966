use anyhow::{Context, Result, bail};
use clap::Parser;
use std::env;

/// Default token validity window.
const DEFAULT_TOKEN_TTL_DAYS: i64 = 30;
/// Default cap on a whole upload request body (1 GiB).
const DEFAULT_MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;

/// Who may delete a stored file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteScope {
    /// Any authenticated principal may delete any file (shared-bucket
    /// semantics).
    Any,
    /// Only the file's owner or an admin may delete it.
    Owner,
}

impl DeleteScope {
    fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "any" => Ok(Self::Any),
            "owner" => Ok(Self::Owner),
            other => bail!("invalid delete scope `{}` (expected `any` or `owner`)", other),
        }
    }
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth_secret: String,
    pub token_ttl_days: i64,
    pub delete_scope: DeleteScope,
    pub max_upload_bytes: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Chunked file store with token-gated access")]
pub struct Args {
    /// Host to bind to (overrides FILEVAULT_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides FILEVAULT_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides FILEVAULT_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Token signing secret (overrides FILEVAULT_AUTH_SECRET)
    #[arg(long)]
    pub auth_secret: Option<String>,

    /// Delete policy, `any` or `owner` (overrides FILEVAULT_DELETE_SCOPE)
    #[arg(long)]
    pub delete_scope: Option<String>,

    /// Apply the schema and exit
    #[arg(long)]
    pub migrate: bool,

    /// Mint a bearer token for the given principal id, print it, and exit
    #[arg(long, value_name = "PRINCIPAL_ID")]
    pub issue_token: Option<uuid::Uuid>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig plus the
    /// run-and-exit flags.
    pub fn from_env_and_args() -> Result<(Self, Args)> {
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("FILEVAULT_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("FILEVAULT_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing FILEVAULT_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 5000,
            Err(err) => return Err(err).context("reading FILEVAULT_PORT"),
        };
        let env_db = env::var("FILEVAULT_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/filevault.db".into());
        let env_secret =
            env::var("FILEVAULT_AUTH_SECRET").unwrap_or_else(|_| "insecure-dev-secret".into());
        let token_ttl_days = match env::var("FILEVAULT_TOKEN_TTL_DAYS") {
            Ok(value) => value
                .parse::<i64>()
                .with_context(|| format!("parsing FILEVAULT_TOKEN_TTL_DAYS value `{}`", value))?,
            Err(env::VarError::NotPresent) => DEFAULT_TOKEN_TTL_DAYS,
            Err(err) => return Err(err).context("reading FILEVAULT_TOKEN_TTL_DAYS"),
        };
        let env_scope = env::var("FILEVAULT_DELETE_SCOPE").unwrap_or_else(|_| "any".into());
        let max_upload_bytes = match env::var("FILEVAULT_MAX_UPLOAD_BYTES") {
            Ok(value) => value
                .parse::<usize>()
                .with_context(|| format!("parsing FILEVAULT_MAX_UPLOAD_BYTES value `{}`", value))?,
            Err(env::VarError::NotPresent) => DEFAULT_MAX_UPLOAD_BYTES,
            Err(err) => return Err(err).context("reading FILEVAULT_MAX_UPLOAD_BYTES"),
        };

        // --- Merge ---
        let cfg = Self {
            host: args.host.clone().unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.clone().unwrap_or(env_db),
            auth_secret: args.auth_secret.clone().unwrap_or(env_secret),
            token_ttl_days,
            delete_scope: DeleteScope::parse(
                args.delete_scope.as_deref().unwrap_or(&env_scope),
            )?,
            max_upload_bytes,
        };

        Ok((cfg, args))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
