//! # Local Preferences Database
//!
//! Client-local conversation preferences (pinned, muted, manually marked
//! unread) in a SQLite file under the platform data directory. None of this
//! is ever synced to the server.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Result as SqlxResult, Row, SqlitePool};
use uuid::Uuid;

/// Result type for local database operations
pub type Result<T> = SqlxResult<T>;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS conversation_prefs (
    group_id TEXT PRIMARY KEY NOT NULL,
    pinned INTEGER NOT NULL DEFAULT 0,
    muted INTEGER NOT NULL DEFAULT 0,
    manual_unread INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flag {
    Pinned,
    Muted,
    ManualUnread,
}

impl Flag {
    fn column(self) -> &'static str {
        match self {
            Flag::Pinned => "pinned",
            Flag::Muted => "muted",
            Flag::ManualUnread => "manual_unread",
        }
    }
}

/// Snapshot of all stored preferences
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationPrefs {
    pub pinned: HashSet<Uuid>,
    pub muted: HashSet<Uuid>,
    pub manual_unread: HashSet<Uuid>,
}

impl ConversationPrefs {
    pub fn is_pinned(&self, group_id: Uuid) -> bool {
        self.pinned.contains(&group_id)
    }

    pub fn is_muted(&self, group_id: Uuid) -> bool {
        self.muted.contains(&group_id)
    }

    pub fn is_manually_unread(&self, group_id: Uuid) -> bool {
        self.manual_unread.contains(&group_id)
    }
}

#[derive(Debug, Clone)]
pub struct LocalPrefs {
    pool: SqlitePool,
}

impl LocalPrefs {
    /// Open or create the database at the default location
    pub async fn open() -> Result<Self> {
        Self::open_at(&Self::default_path()).await
    }

    /// Open or create the database at `path`
    pub async fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
        sqlx::query("PRAGMA synchronous=NORMAL").execute(&pool).await?;

        let prefs = Self { pool };
        prefs.init_schema().await?;
        Ok(prefs)
    }

    /// Private in-memory database (tests, ephemeral sessions)
    pub async fn in_memory() -> Result<Self> {
        // one connection, otherwise each connection gets its own empty database
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        let prefs = Self { pool };
        prefs.init_schema().await?;
        Ok(prefs)
    }

    /// Platform-specific path of the database file
    pub fn default_path() -> PathBuf {
        let mut path = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
        path.push("teamchat");
        path.push("local.db");
        path
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    async fn set_flag(&self, group_id: Uuid, flag: Flag, value: bool) -> Result<()> {
        let column = flag.column();
        let sql = format!(
            "INSERT INTO conversation_prefs (group_id, {column}, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(group_id) DO UPDATE SET {column} = excluded.{column}, updated_at = excluded.updated_at"
        );
        sqlx::query(&sql)
            .bind(group_id.to_string())
            .bind(value)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_pinned(&self, group_id: Uuid, pinned: bool) -> Result<()> {
        self.set_flag(group_id, Flag::Pinned, pinned).await
    }

    pub async fn set_muted(&self, group_id: Uuid, muted: bool) -> Result<()> {
        self.set_flag(group_id, Flag::Muted, muted).await
    }

    pub async fn set_manual_unread(&self, group_id: Uuid, unread: bool) -> Result<()> {
        self.set_flag(group_id, Flag::ManualUnread, unread).await
    }

    /// Load every stored preference
    pub async fn load(&self) -> Result<ConversationPrefs> {
        let rows = sqlx::query("SELECT group_id, pinned, muted, manual_unread FROM conversation_prefs")
            .fetch_all(&self.pool)
            .await?;

        let mut prefs = ConversationPrefs::default();
        for row in rows {
            let raw: String = row.try_get("group_id")?;
            let Ok(group_id) = Uuid::parse_str(&raw) else {
                tracing::warn!("[LocalPrefs] Skipping row with invalid group id {:?}", raw);
                continue;
            };
            if row.try_get::<bool, _>("pinned")? {
                prefs.pinned.insert(group_id);
            }
            if row.try_get::<bool, _>("muted")? {
                prefs.muted.insert(group_id);
            }
            if row.try_get::<bool, _>("manual_unread")? {
                prefs.manual_unread.insert(group_id);
            }
        }
        Ok(prefs)
    }
}
