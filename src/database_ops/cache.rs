//! Slug resolution cache.
//!
//! Key = `(system_id, slug, canonical filter string)`. The canonical filter
//! string is computed once by the resolver (see
//! `normalization::tags::filters_cache_key`) and passed through verbatim so
//! lookup and store always agree.

use chrono::Utc;
use sqlx::Row;

use super::db::Db;

pub async fn cached_slug_resolution(
    db: &Db,
    system_id: &str,
    slug: &str,
    filters_key: &str,
) -> Result<Option<(i64, String)>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT media_dbid, strategy
        FROM slug_resolution_cache
        WHERE system_id = ? AND slug = ? AND filters = ?
        "#,
    )
    .bind(system_id)
    .bind(slug)
    .bind(filters_key)
    .fetch_optional(&db.pool)
    .await?;

    Ok(row.map(|r| (r.get("media_dbid"), r.get("strategy"))))
}

pub async fn set_cached_slug_resolution(
    db: &Db,
    system_id: &str,
    slug: &str,
    filters_key: &str,
    media_dbid: i64,
    strategy: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO slug_resolution_cache (system_id, slug, filters, media_dbid, strategy, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT (system_id, slug, filters)
        DO UPDATE SET media_dbid = excluded.media_dbid,
                      strategy = excluded.strategy,
                      created_at = excluded.created_at
        "#,
    )
    .bind(system_id)
    .bind(slug)
    .bind(filters_key)
    .bind(media_dbid)
    .bind(strategy)
    .bind(Utc::now().to_rfc3339())
    .execute(&db.pool)
    .await?;
    Ok(())
}
