//! Read queries against the media index.
//!
//! All projections come back as plain structs; tag rows are folded into the
//! owning media entry so callers never see the join shape.

use sqlx::Row;

use super::db::Db;

/// Read-only view of one indexed title.
#[derive(Debug, Clone)]
pub struct MediaTitle {
    pub dbid: i64,
    pub system_id: String,
    pub slug: String,
    pub secondary_slug: String,
    pub name: String,
    pub slug_length: i64,
    pub slug_word_count: i64,
}

/// Media entry projection with its tag set attached.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub dbid: i64,
    pub system_id: String,
    pub title_dbid: i64,
    pub name: String,
    pub path: String,
    /// `(tag_type, tag)` pairs.
    pub tags: Vec<(String, String)>,
}

impl SearchResult {
    /// Base filename: path suffix after the final `/`.
    pub fn base_filename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn has_tag(&self, tag_type: &str, tag: &str) -> bool {
        self.tags.iter().any(|(t, v)| t == tag_type && v == tag)
    }

    pub fn has_tag_type(&self, tag_type: &str) -> bool {
        self.tags.iter().any(|(t, _)| t == tag_type)
    }
}

const MEDIA_SELECT: &str = r#"
    SELECT m.dbid, m.system_id, m.title_dbid, t.name, m.path, tg.tag_type, tg.tag
    FROM media m
    JOIN media_titles t ON t.dbid = m.title_dbid
    LEFT JOIN media_tags tg ON tg.media_dbid = m.dbid
"#;

fn fold_rows(rows: Vec<sqlx::sqlite::SqliteRow>) -> Vec<SearchResult> {
    let mut out: Vec<SearchResult> = Vec::new();
    for row in rows {
        let dbid: i64 = row.get("dbid");
        if out.last().map(|r| r.dbid) != Some(dbid) {
            out.push(SearchResult {
                dbid,
                system_id: row.get("system_id"),
                title_dbid: row.get("title_dbid"),
                name: row.get("name"),
                path: row.get("path"),
                tags: Vec::new(),
            });
        }
        let tag_type: Option<String> = row.get("tag_type");
        if let (Some(t), Some(v)) = (tag_type, row.get::<Option<String>, _>("tag")) {
            out.last_mut().unwrap().tags.push((t, v));
        }
    }
    out
}

/// Exact equality on the title slug column.
pub async fn search_media_by_slug(
    db: &Db,
    system_id: &str,
    slug: &str,
) -> Result<Vec<SearchResult>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "{MEDIA_SELECT} WHERE m.system_id = ? AND t.slug = ? ORDER BY m.dbid"
    ))
    .bind(system_id)
    .bind(slug)
    .fetch_all(&db.pool)
    .await?;
    Ok(fold_rows(rows))
}

/// Exact equality on the secondary slug column.
pub async fn search_media_by_secondary_slug(
    db: &Db,
    system_id: &str,
    slug: &str,
) -> Result<Vec<SearchResult>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "{MEDIA_SELECT} WHERE m.system_id = ? AND t.secondary_slug = ? AND t.secondary_slug != '' ORDER BY m.dbid"
    ))
    .bind(system_id)
    .bind(slug)
    .fetch_all(&db.pool)
    .await?;
    Ok(fold_rows(rows))
}

/// Prefix match on the title slug column.
pub async fn search_media_by_slug_prefix(
    db: &Db,
    system_id: &str,
    slug: &str,
) -> Result<Vec<SearchResult>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "{MEDIA_SELECT} WHERE m.system_id = ? AND t.slug LIKE ? || '%' ORDER BY m.dbid"
    ))
    .bind(system_id)
    .bind(slug)
    .fetch_all(&db.pool)
    .await?;
    Ok(fold_rows(rows))
}

/// Length-bucketed prefilter for the fuzzy strategies: titles whose slug
/// length and word count fall inside the given inclusive bounds.
pub async fn titles_with_prefilter(
    db: &Db,
    system_id: &str,
    min_len: i64,
    max_len: i64,
    min_words: i64,
    max_words: i64,
) -> Result<Vec<MediaTitle>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT dbid, system_id, slug, secondary_slug, name, slug_length, slug_word_count
        FROM media_titles
        WHERE system_id = ?
          AND slug_length BETWEEN ? AND ?
          AND slug_word_count BETWEEN ? AND ?
        ORDER BY dbid
        "#,
    )
    .bind(system_id)
    .bind(min_len)
    .bind(max_len)
    .bind(min_words)
    .bind(max_words)
    .fetch_all(&db.pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| MediaTitle {
            dbid: row.get("dbid"),
            system_id: row.get("system_id"),
            slug: row.get("slug"),
            secondary_slug: row.get("secondary_slug"),
            name: row.get("name"),
            slug_length: row.get("slug_length"),
            slug_word_count: row.get("slug_word_count"),
        })
        .collect())
}

/// All media rows belonging to one title.
pub async fn media_for_title(
    db: &Db,
    title_dbid: i64,
) -> Result<Vec<SearchResult>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "{MEDIA_SELECT} WHERE m.title_dbid = ? ORDER BY m.dbid"
    ))
    .bind(title_dbid)
    .fetch_all(&db.pool)
    .await?;
    Ok(fold_rows(rows))
}

/// One uniformly random media entry for a system, for `launch.random`.
pub async fn random_media(db: &Db, system_id: &str) -> Result<Option<SearchResult>, sqlx::Error> {
    let row = sqlx::query("SELECT dbid FROM media WHERE system_id = ? ORDER BY RANDOM() LIMIT 1")
        .bind(system_id)
        .fetch_optional(&db.pool)
        .await?;
    match row {
        Some(row) => media_by_dbid(db, row.get("dbid")).await,
        None => Ok(None),
    }
}

/// Fetch one media row by id. None when the id dangles.
pub async fn media_by_dbid(db: &Db, dbid: i64) -> Result<Option<SearchResult>, sqlx::Error> {
    let rows = sqlx::query(&format!("{MEDIA_SELECT} WHERE m.dbid = ?"))
        .bind(dbid)
        .fetch_all(&db.pool)
        .await?;
    Ok(fold_rows(rows).into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn fixture() -> Db {
        let db = Db::open_in_memory().await.unwrap();
        db.bootstrap_media_schema().await.unwrap();
        for (dbid, slug, secondary, name, len, words) in [
            (1, "mysticquest", "", "Mystic Quest", 11, 2),
            (2, "mysticquestlegend", "", "Mystic Quest Legend", 17, 3),
            (3, "herosadventurecrystaltemple", "crystaltemple", "Hero's Adventure: Crystal Temple", 27, 4),
        ] {
            sqlx::query(
                "INSERT INTO media_titles (dbid, system_id, slug, secondary_slug, name, slug_length, slug_word_count) VALUES (?, 'SNES', ?, ?, ?, ?, ?)",
            )
            .bind(dbid)
            .bind(slug)
            .bind(secondary)
            .bind(name)
            .bind(len)
            .bind(words)
            .execute(&db.pool)
            .await
            .unwrap();
            sqlx::query("INSERT INTO media (dbid, system_id, title_dbid, path) VALUES (?, 'SNES', ?, ?)")
                .bind(dbid)
                .bind(dbid)
                .bind(format!("/roms/snes/{name}.sfc"))
                .execute(&db.pool)
                .await
                .unwrap();
        }
        sqlx::query("INSERT INTO media_tags (media_dbid, tag_type, tag) VALUES (1, 'region', 'us')")
            .execute(&db.pool)
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn slug_search_is_exact_and_carries_tags() {
        let db = fixture().await;
        let hits = search_media_by_slug(&db, "SNES", "mysticquest").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].dbid, 1);
        assert_eq!(hits[0].tags, vec![("region".to_string(), "us".to_string())]);

        assert!(search_media_by_slug(&db, "NES", "mysticquest")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn prefix_search_matches_extensions() {
        let db = fixture().await;
        let hits = search_media_by_slug_prefix(&db, "SNES", "mysticquest")
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn secondary_slug_search_skips_empty_columns() {
        let db = fixture().await;
        let hits = search_media_by_secondary_slug(&db, "SNES", "crystaltemple")
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].dbid, 3);

        // An empty query slug must not match the rows whose secondary
        // column is empty.
        assert!(search_media_by_secondary_slug(&db, "SNES", "")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn prefilter_buckets_on_length_and_words() {
        let db = fixture().await;
        let titles = titles_with_prefilter(&db, "SNES", 9, 13, 1, 3).await.unwrap();
        assert_eq!(titles.len(), 1);
        assert_eq!(titles[0].slug, "mysticquest");
    }

    #[tokio::test]
    async fn media_by_dbid_handles_dangling_ids() {
        let db = fixture().await;
        assert!(media_by_dbid(&db, 1).await.unwrap().is_some());
        assert!(media_by_dbid(&db, 999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn base_filename_is_path_suffix() {
        let db = fixture().await;
        let hit = media_by_dbid(&db, 1).await.unwrap().unwrap();
        assert_eq!(hit.base_filename(), "Mystic Quest.sfc");
    }
}
