//! Title resolver: turns a free-form `SystemID/Game Name` string into one
//! concrete media entry using the media index and the persistent resolution
//! cache.
//!
//! Resolution order: cache lookup, then the strategy chain (first non-empty
//! candidate set wins), then the selection policy picks a single entry.
//! Successful resolutions write through to the cache; cache failures only
//! ever cost a warning, never the command.

pub mod selection;
pub mod strategies;

use tracing::{debug, warn};

use crate::config::Config;
use crate::database_ops::{cache, db::Db, media, SearchResult};
use crate::error::{ZapError, ZapResult};
use crate::normalization::{
    canonicalize_filters, extract_tags, filters_cache_key, merge_filters, TagFilter,
};
use crate::systems;
use strategies::TitleQuery;

/// Outcome of a successful resolution.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub media: SearchResult,
    /// Name of the strategy that produced the result (`exact_match`,
    /// `token_match`, ...). `cached` resolutions report the strategy
    /// recorded at insert time.
    pub strategy: String,
    pub cache_hit: bool,
}

/// Cheap routing test used by the generic `launch` command: does this
/// argument look like a `SystemID/Name` title reference?
///
/// Deliberately lenient — no system lookup, no slugification. Wildcards and
/// backslashes mark the argument as a path.
pub fn might_be_title(arg: &str) -> bool {
    if arg.contains('*') || arg.contains('\\') {
        return false;
    }
    match arg.split_once('/') {
        Some((system, name)) => !system.trim().is_empty() && !name.trim().is_empty(),
        None => false,
    }
}

/// Resolve `"<SystemID>/<GameName>"` to one media entry.
pub async fn resolve_title(
    media_db: &Db,
    cfg: &Config,
    input: &str,
    adv_tags: &[TagFilter],
) -> ZapResult<Resolved> {
    let Some((system_raw, name_raw)) = input.split_once('/') else {
        return Err(ZapError::InvalidFormat(input.to_string()));
    };
    if system_raw.trim().is_empty() || name_raw.trim().is_empty() {
        return Err(ZapError::InvalidFormat(input.to_string()));
    }
    let system = systems::lookup(system_raw)
        .ok_or_else(|| ZapError::SystemNotFound(system_raw.trim().to_string()))?;

    let (cleaned, extracted) = extract_tags(name_raw);
    let had_auto_tags = !extracted.is_empty();
    let filters = canonicalize_filters(merge_filters(extracted, adv_tags));
    let filters_key = filters_cache_key(&filters);
    let q = TitleQuery::new(&cleaned);
    if q.slug.is_empty() {
        return Err(ZapError::InvalidFormat(input.to_string()));
    }

    // Cache first. A dangling dbid falls through to full resolution.
    match cache::cached_slug_resolution(media_db, system.id, &q.slug, &filters_key).await {
        Ok(Some((dbid, strategy))) => match media::media_by_dbid(media_db, dbid).await {
            Ok(Some(entry)) => {
                debug!(system = %system.id, slug = %q.slug, strategy = %strategy, "resolution cache hit");
                return Ok(Resolved {
                    media: entry,
                    strategy,
                    cache_hit: true,
                });
            }
            Ok(None) => {
                warn!(system = %system.id, slug = %q.slug, dbid, "cached resolution points at missing media; re-resolving");
            }
            Err(err) => {
                warn!(error = %err, "cached media fetch failed; re-resolving");
            }
        },
        Ok(None) => {}
        Err(err) => {
            warn!(error = %err, "resolution cache lookup failed; continuing without cache");
        }
    }

    let (candidates, strategy) =
        run_strategy_chain(media_db, system.id, &q, &filters, adv_tags, had_auto_tags).await?;

    let chosen = selection::select_one(candidates, &filters, cfg).ok_or(ZapError::NoResults {
        system: system.id.to_string(),
        query: cleaned.clone(),
    })?;

    if let Err(err) = cache::set_cached_slug_resolution(
        media_db,
        system.id,
        &q.slug,
        &filters_key,
        chosen.dbid,
        strategy,
    )
    .await
    {
        warn!(error = %err, system = %system.id, slug = %q.slug, "resolution cache write failed");
    }

    debug!(system = %system.id, slug = %q.slug, strategy, path = %chosen.path, "title resolved");
    Ok(Resolved {
        media: chosen,
        strategy: strategy.to_string(),
        cache_hit: false,
    })
}

/// Run the ordered strategies until one produces candidates.
///
/// A database error on the primary exact-match query aborts; errors on the
/// fallback strategies are logged and treated as empty results.
async fn run_strategy_chain(
    db: &Db,
    system_id: &str,
    q: &TitleQuery,
    filters: &[TagFilter],
    adv_tags: &[TagFilter],
    had_auto_tags: bool,
) -> ZapResult<(Vec<SearchResult>, &'static str)> {
    let exact = strategies::exact_match(db, system_id, q, filters).await?;
    if !exact.is_empty() {
        return Ok((exact, strategies::EXACT_MATCH));
    }

    match strategies::secondary_title_exact(db, system_id, q, filters).await {
        Ok(found) if !found.is_empty() => return Ok((found, strategies::SECONDARY_TITLE_EXACT)),
        Ok(_) => {}
        Err(err) => warn!(error = %err, strategy = strategies::SECONDARY_TITLE_EXACT, "strategy failed; skipping"),
    }

    match strategies::advanced_fuzzy(db, system_id, q, filters).await {
        Ok(Some((found, name))) => return Ok((found, name)),
        Ok(None) => {}
        Err(err) => warn!(error = %err, strategy = "advanced_fuzzy", "strategy failed; skipping"),
    }

    match strategies::main_title_exact(db, system_id, q, filters).await {
        Ok(found) if !found.is_empty() => return Ok((found, strategies::MAIN_TITLE_EXACT)),
        Ok(_) => {}
        Err(err) => warn!(error = %err, strategy = strategies::MAIN_TITLE_EXACT, "strategy failed; skipping"),
    }

    match strategies::progressive_trim(db, system_id, q, filters).await {
        Ok(found) if !found.is_empty() => return Ok((found, strategies::PROGRESSIVE_TRIM)),
        Ok(_) => {}
        Err(err) => warn!(error = %err, strategy = strategies::PROGRESSIVE_TRIM, "strategy failed; skipping"),
    }

    if had_auto_tags {
        let adv_only = canonicalize_filters(adv_tags.to_vec());
        match strategies::fallback_no_tags(db, system_id, q, &adv_only).await {
            Ok(found) if !found.is_empty() => return Ok((found, strategies::FALLBACK_NO_TAGS)),
            Ok(_) => {}
            Err(err) => warn!(error = %err, strategy = strategies::FALLBACK_NO_TAGS, "strategy failed; skipping"),
        }
    }

    Ok((Vec::new(), strategies::EXACT_MATCH))
}
