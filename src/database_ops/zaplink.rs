//! Zap-link host capability table and remote script body cache.

use chrono::Utc;
use sqlx::Row;

use super::db::Db;

/// Recorded zapscript version for a host key, if any. `0` means the host
/// definitively does not support zap links.
pub async fn zaplink_host(db: &Db, host_key: &str) -> Result<Option<i64>, sqlx::Error> {
    let row = sqlx::query("SELECT zapscript_version FROM zaplink_hosts WHERE host_key = ?")
        .bind(host_key)
        .fetch_optional(&db.pool)
        .await?;
    Ok(row.map(|r| r.get("zapscript_version")))
}

pub async fn update_zaplink_host(db: &Db, host_key: &str, version: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO zaplink_hosts (host_key, zapscript_version, probed_at)
        VALUES (?, ?, ?)
        ON CONFLICT (host_key)
        DO UPDATE SET zapscript_version = excluded.zapscript_version,
                      probed_at = excluded.probed_at
        "#,
    )
    .bind(host_key)
    .bind(version)
    .bind(Utc::now().to_rfc3339())
    .execute(&db.pool)
    .await?;
    Ok(())
}

/// Refresh the probe timestamp of an already-known host.
pub async fn touch_zaplink_host(db: &Db, host_key: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE zaplink_hosts SET probed_at = ? WHERE host_key = ?")
        .bind(Utc::now().to_rfc3339())
        .bind(host_key)
        .execute(&db.pool)
        .await?;
    Ok(())
}

/// Host keys with a recorded supported version, for pre-warming.
pub async fn supported_zaplink_hosts(db: &Db) -> Result<Vec<String>, sqlx::Error> {
    let rows = sqlx::query("SELECT host_key FROM zaplink_hosts WHERE zapscript_version > 0")
        .fetch_all(&db.pool)
        .await?;
    Ok(rows.into_iter().map(|r| r.get("host_key")).collect())
}

pub async fn zaplink_cache(db: &Db, url: &str) -> Result<Option<Vec<u8>>, sqlx::Error> {
    let row = sqlx::query("SELECT body FROM zaplink_cache WHERE url = ?")
        .bind(url)
        .fetch_optional(&db.pool)
        .await?;
    Ok(row.map(|r| r.get("body")))
}

pub async fn update_zaplink_cache(db: &Db, url: &str, body: &[u8]) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO zaplink_cache (url, body, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT (url)
        DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at
        "#,
    )
    .bind(url)
    .bind(body)
    .bind(Utc::now().to_rfc3339())
    .execute(&db.pool)
    .await?;
    Ok(())
}
