/**
 * Server Configuration
 *
 * Loads `ServerConfig` from environment variables with defaults suitable for
 * local development, and builds the message store it describes.
 *
 * # Variables
 *
 * - `SERVER_PORT` (or `PORT`) - listen port, default 3000
 * - `DATABASE_URL` - PostgreSQL URL; without it the in-memory store is used
 * - `JWT_SECRET` - token signing secret
 * - `UPLOAD_DIR` - directory for uploaded files, default `uploads`
 * - `PUBLIC_BASE_URL` - absolute prefix for upload URLs
 * - `PUSH_WEBHOOK_URL` - push delivery endpoint; logging dispatcher if unset
 * - `CORS_ORIGIN` - allowed origin, `*` for any
 * - `MAX_UPLOAD_BYTES` - request body limit for uploads, default 25 MiB
 *
 * # Error Handling
 *
 * Configuration problems are logged but do not prevent startup. A database
 * that cannot be reached falls back to the in-memory store.
 */

use std::path::PathBuf;
use std::sync::Arc;

use sqlx::PgPool;

use crate::backend::messaging::{MemoryMessageStore, MessageStore, PgMessageStore};

const DEFAULT_PORT: u16 = 3000;
const DEV_JWT_SECRET: &str = "teamchat-dev-secret-change-me";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub upload_dir: PathBuf,
    pub public_base_url: Option<String>,
    pub push_webhook_url: Option<String>,
    pub cors_origin: String,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            upload_dir: PathBuf::from("uploads"),
            public_base_url: None,
            push_webhook_url: None,
            cors_origin: "*".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl ServerConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = non_empty_var("SERVER_PORT")
            .or_else(|| non_empty_var("PORT"))
            .and_then(|raw| match raw.parse::<u16>() {
                Ok(port) => Some(port),
                Err(e) => {
                    tracing::warn!("Invalid port {:?} ({}), using {}", raw, e, DEFAULT_PORT);
                    None
                }
            })
            .unwrap_or(defaults.port);

        let jwt_secret = non_empty_var("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set, using the development secret");
            defaults.jwt_secret.clone()
        });

        let max_upload_bytes = non_empty_var("MAX_UPLOAD_BYTES")
            .and_then(|raw| raw.parse::<usize>().ok())
            .unwrap_or(defaults.max_upload_bytes);

        Self {
            port,
            database_url: non_empty_var("DATABASE_URL"),
            jwt_secret,
            upload_dir: non_empty_var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            public_base_url: non_empty_var("PUBLIC_BASE_URL"),
            push_webhook_url: non_empty_var("PUSH_WEBHOOK_URL"),
            cors_origin: non_empty_var("CORS_ORIGIN").unwrap_or(defaults.cors_origin),
            max_upload_bytes,
        }
    }
}

/// Connect to PostgreSQL and run migrations, or fall back to memory
pub async fn load_store(config: &ServerConfig) -> Arc<dyn MessageStore> {
    let Some(database_url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set. Using the in-memory store; data is lost on restart.");
        return Arc::new(MemoryMessageStore::new());
    };

    tracing::info!("Connecting to database...");
    let pool = match PgPool::connect(database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to create database connection pool: {:?}", e);
            tracing::warn!("Falling back to the in-memory store.");
            return Arc::new(MemoryMessageStore::new());
        }
    };
    tracing::info!("Database connection pool created successfully");

    let store = PgMessageStore::new(pool);
    match store.migrate().await {
        Ok(()) => tracing::info!("Database migrations completed successfully"),
        Err(e) => {
            tracing::error!("Failed to run database migrations: {}", e);
            tracing::warn!("Continuing without migrations - database might not be up to date");
        }
    }
    Arc::new(store)
}
