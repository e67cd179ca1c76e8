use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

/// Handle to one SQLite database.
///
/// The runtime opens two of these: the media index and the user store. The
/// pool is cheap to clone and safe to share across tasks.
#[derive(Clone)]
pub struct Db {
    pub pool: SqlitePool,
}

impl Db {
    pub async fn connect(path: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{path}"))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await?;
        info!(path = %path, "connected to sqlite db");
        Ok(Self { pool })
    }

    /// In-memory database, used by tests and fixtures.
    pub async fn open_in_memory() -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // A single connection keeps every query on the same in-memory db.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// Create the user-store tables if absent. Idempotent.
    pub async fn bootstrap_user_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS zaplink_hosts (
                host_key TEXT PRIMARY KEY,
                zapscript_version INTEGER NOT NULL,
                probed_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS zaplink_cache (
                url TEXT PRIMARY KEY,
                body BLOB NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Create the media-index tables if absent.
    ///
    /// The production index is written by the external indexer with this
    /// same DDL; test fixtures seed through it.
    pub async fn bootstrap_media_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS media_titles (
                dbid INTEGER PRIMARY KEY,
                system_id TEXT NOT NULL,
                slug TEXT NOT NULL,
                secondary_slug TEXT NOT NULL DEFAULT '',
                name TEXT NOT NULL,
                slug_length INTEGER NOT NULL,
                slug_word_count INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS media (
                dbid INTEGER PRIMARY KEY,
                system_id TEXT NOT NULL,
                title_dbid INTEGER NOT NULL REFERENCES media_titles(dbid),
                path TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS media_tags (
                media_dbid INTEGER NOT NULL REFERENCES media(dbid),
                tag_type TEXT NOT NULL,
                tag TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS slug_resolution_cache (
                system_id TEXT NOT NULL,
                slug TEXT NOT NULL,
                filters TEXT NOT NULL,
                media_dbid INTEGER NOT NULL,
                strategy TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (system_id, slug, filters)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_media_titles_slug ON media_titles(system_id, slug)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_media_titles_bucket ON media_titles(system_id, slug_length, slug_word_count)",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
