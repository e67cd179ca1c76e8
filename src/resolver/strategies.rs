//! Ordered match strategies.
//!
//! Each strategy returns any number of candidates already narrowed by the
//! effective tag filters; the first strategy producing a non-empty set
//! short-circuits the rest. Strategy names are the observable `strategy`
//! values surfaced in command results.

use std::cmp::Ordering;

use strsim::{jaro_winkler, normalized_damerau_levenshtein};

use crate::database_ops::{db::Db, media, MediaTitle, SearchResult};
use crate::normalization::{
    normalize_words, satisfies, slugify, slugify_with_metadata, split_secondary, TagFilter,
};

pub const EXACT_MATCH: &str = "exact_match";
pub const SECONDARY_TITLE_EXACT: &str = "secondary_title_exact";
pub const TOKEN_MATCH: &str = "token_match";
pub const JAROWINKLER_FUZZY: &str = "jarowinkler_fuzzy";
pub const MAIN_TITLE_EXACT: &str = "main_title_exact";
pub const PROGRESSIVE_TRIM: &str = "progressive_trim";
pub const FALLBACK_NO_TAGS: &str = "fallback_no_tags";

/// Minimum composite similarity accepted by the fuzzy strategies.
pub const MIN_TITLE_SIMILARITY: f64 = 0.70;
/// Per-word floor for the prefix word-sequence guard.
const MIN_WORD_SIMILARITY: f64 = 0.85;
/// Per-word length delta tolerated by the guard. Rejects a query word that
/// is a strict extension of a candidate word (or vice versa), so `mario`
/// cannot ride a high full-slug score onto `marioparty`.
const MAX_WORD_LEN_DELTA: usize = 2;
/// Slug-length floor for progressive trim.
const MIN_TRIM_SLUG_LEN: usize = 6;
/// Candidates within this of the best Jaro-Winkler score enter the
/// Damerau-Levenshtein tie-break.
const JW_TIE_WINDOW: f64 = 0.01;

/// Normalized query context shared by every strategy.
#[derive(Debug, Clone)]
pub struct TitleQuery {
    pub slug: String,
    pub slug_length: usize,
    pub word_count: usize,
    pub words: Vec<String>,
    /// Slug of the segment after the first `:` or ` - `, when present.
    pub secondary_slug: Option<String>,
    /// Slug of the segment before the separator, when a secondary exists.
    pub main_slug: Option<String>,
}

impl TitleQuery {
    pub fn new(cleaned_name: &str) -> Self {
        let meta = slugify_with_metadata(cleaned_name);
        let words = normalize_words(cleaned_name);
        let (main, secondary) = split_secondary(cleaned_name);
        Self {
            slug: meta.slug,
            slug_length: meta.slug_length,
            word_count: meta.word_count,
            words,
            secondary_slug: secondary
                .map(|_| meta.secondary_slug.clone())
                .filter(|s| !s.is_empty()),
            main_slug: secondary.map(|_| slugify(main)).filter(|s| !s.is_empty()),
        }
    }
}

fn keep_matching(media: Vec<SearchResult>, filters: &[TagFilter]) -> Vec<SearchResult> {
    media
        .into_iter()
        .filter(|m| satisfies(&m.tags, filters))
        .collect()
}

/// Strategy 1: exact equality on the slug column.
pub async fn exact_match(
    db: &Db,
    system_id: &str,
    q: &TitleQuery,
    filters: &[TagFilter],
) -> Result<Vec<SearchResult>, sqlx::Error> {
    Ok(keep_matching(
        media::search_media_by_slug(db, system_id, &q.slug).await?,
        filters,
    ))
}

/// Strategy 2: the query slug against the secondary-slug column, so
/// `Crystal Temple` finds `Hero's Adventure: Crystal Temple`.
pub async fn secondary_title_exact(
    db: &Db,
    system_id: &str,
    q: &TitleQuery,
    filters: &[TagFilter],
) -> Result<Vec<SearchResult>, sqlx::Error> {
    Ok(keep_matching(
        media::search_media_by_secondary_slug(db, system_id, &q.slug).await?,
        filters,
    ))
}

/// Strategy 4: the main segment's slug against the slug column, only
/// meaningful when the query itself carried a secondary title.
pub async fn main_title_exact(
    db: &Db,
    system_id: &str,
    q: &TitleQuery,
    filters: &[TagFilter],
) -> Result<Vec<SearchResult>, sqlx::Error> {
    let Some(main_slug) = q.main_slug.as_deref() else {
        return Ok(Vec::new());
    };
    Ok(keep_matching(
        media::search_media_by_slug(db, system_id, main_slug).await?,
        filters,
    ))
}

async fn prefiltered_titles(
    db: &Db,
    system_id: &str,
    q: &TitleQuery,
) -> Result<Vec<MediaTitle>, sqlx::Error> {
    let len = q.slug_length as i64;
    let words = q.word_count as i64;
    media::titles_with_prefilter(
        db,
        system_id,
        (len - 2).max(1),
        len + 2,
        (words - 1).max(1),
        words + 1,
    )
    .await
}

/// Multiset comparison of the first 2-3 word tokens. Queries with fewer
/// than two tokens do not participate.
fn token_signature_matches(q: &TitleQuery, candidate_words: &[String]) -> bool {
    let k = q.words.len().min(3);
    if k < 2 || candidate_words.len() < k {
        return false;
    }
    let mut query_sig: Vec<&String> = q.words[..k].iter().collect();
    let mut cand_sig: Vec<&String> = candidate_words[..k].iter().collect();
    query_sig.sort();
    cand_sig.sort();
    query_sig == cand_sig
}

/// Word-sequence prefix guard: the first `min(queryWords, 2)` query words
/// must pairwise match the candidate's leading words.
fn word_prefix_guard(q: &TitleQuery, candidate_words: &[String]) -> bool {
    let n = q.words.len().min(2);
    if candidate_words.len() < n {
        return false;
    }
    q.words[..n].iter().zip(candidate_words).all(|(qw, cw)| {
        qw == cw
            || (jaro_winkler(qw, cw) >= MIN_WORD_SIMILARITY
                && qw.chars().count().abs_diff(cw.chars().count()) <= MAX_WORD_LEN_DELTA)
    })
}

/// The Jaro-Winkler leg shared by strategy 3 and the tagless fallback:
/// score every prefiltered title, rank `(JW, Damerau-Levenshtein)` inside
/// the tie window, and return the media of the best title that still has
/// entries after tag filtering.
async fn jarowinkler_pick(
    db: &Db,
    titles: &[MediaTitle],
    q: &TitleQuery,
    filters: &[TagFilter],
) -> Result<Vec<SearchResult>, sqlx::Error> {
    let mut scored: Vec<(f64, &MediaTitle)> = titles
        .iter()
        .filter_map(|t| {
            let score = jaro_winkler(&q.slug, &t.slug);
            if score < MIN_TITLE_SIMILARITY {
                return None;
            }
            let candidate_words = normalize_words(&t.name);
            word_prefix_guard(q, &candidate_words).then_some((score, t))
        })
        .collect();
    if scored.is_empty() {
        return Ok(Vec::new());
    }

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    let best = scored[0].0;
    let mut top: Vec<&MediaTitle> = scored
        .iter()
        .take_while(|(score, _)| best - score <= JW_TIE_WINDOW)
        .map(|(_, t)| *t)
        .collect();
    top.sort_by(|a, b| {
        normalized_damerau_levenshtein(&q.slug, &b.slug)
            .partial_cmp(&normalized_damerau_levenshtein(&q.slug, &a.slug))
            .unwrap_or(Ordering::Equal)
    });

    for title in top {
        let media = keep_matching(media::media_for_title(db, title.dbid).await?, filters);
        if !media.is_empty() {
            return Ok(media);
        }
    }
    Ok(Vec::new())
}

/// Strategy 3: one length-bucketed prefilter query, then token signature
/// and Jaro-Winkler/Damerau-Levenshtein over the candidate list.
pub async fn advanced_fuzzy(
    db: &Db,
    system_id: &str,
    q: &TitleQuery,
    filters: &[TagFilter],
) -> Result<Option<(Vec<SearchResult>, &'static str)>, sqlx::Error> {
    let titles = prefiltered_titles(db, system_id, q).await?;
    if titles.is_empty() {
        return Ok(None);
    }

    if q.words.len() >= 2 {
        let mut matched: Vec<SearchResult> = Vec::new();
        for title in &titles {
            if token_signature_matches(q, &normalize_words(&title.name)) {
                matched.extend(media::media_for_title(db, title.dbid).await?);
            }
        }
        let matched = keep_matching(matched, filters);
        if !matched.is_empty() {
            return Ok(Some((matched, TOKEN_MATCH)));
        }
    }

    let picked = jarowinkler_pick(db, &titles, q, filters).await?;
    if picked.is_empty() {
        Ok(None)
    } else {
        Ok(Some((picked, JAROWINKLER_FUZZY)))
    }
}

/// Strategy 5: drop 1..=3 trailing word tokens, trying exact then prefix
/// for each trim. Stops once the trimmed slug falls below the length floor.
pub async fn progressive_trim(
    db: &Db,
    system_id: &str,
    q: &TitleQuery,
    filters: &[TagFilter],
) -> Result<Vec<SearchResult>, sqlx::Error> {
    for drop in 1..=3usize {
        if q.words.len() <= drop {
            break;
        }
        let trimmed: String = q.words[..q.words.len() - drop].concat();
        if trimmed.chars().count() < MIN_TRIM_SLUG_LEN {
            break;
        }

        let exact = keep_matching(
            media::search_media_by_slug(db, system_id, &trimmed).await?,
            filters,
        );
        if !exact.is_empty() {
            return Ok(exact);
        }
        let prefixed = keep_matching(
            media::search_media_by_slug_prefix(db, system_id, &trimmed).await?,
            filters,
        );
        if !prefixed.is_empty() {
            return Ok(prefixed);
        }
    }
    Ok(Vec::new())
}

/// Strategy 6: when auto-extracted tags existed and everything else came up
/// empty, retry exact and the Jaro-Winkler leg with the advanced-arg tags
/// only.
pub async fn fallback_no_tags(
    db: &Db,
    system_id: &str,
    q: &TitleQuery,
    adv_only: &[TagFilter],
) -> Result<Vec<SearchResult>, sqlx::Error> {
    let exact = keep_matching(
        media::search_media_by_slug(db, system_id, &q.slug).await?,
        adv_only,
    );
    if !exact.is_empty() {
        return Ok(exact);
    }
    let titles = prefiltered_titles(db, system_id, q).await?;
    jarowinkler_pick(db, &titles, q, adv_only).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(name: &str) -> TitleQuery {
        TitleQuery::new(name)
    }

    #[test]
    fn token_signature_is_order_independent() {
        let q = query("Mech Battle");
        assert!(token_signature_matches(&q, &normalize_words("Battle Mech")));
        assert!(!token_signature_matches(&q, &normalize_words("Battle Toads")));
    }

    #[test]
    fn token_signature_requires_two_query_tokens() {
        let q = query("Mario");
        assert!(!token_signature_matches(&q, &normalize_words("Mario")));
    }

    #[test]
    fn prefix_guard_accepts_near_word() {
        let q = query("Thundar");
        assert!(word_prefix_guard(&q, &normalize_words("Thunder")));
    }

    #[test]
    fn prefix_guard_rejects_word_extension() {
        // `mario` must not ride onto `marioparty`.
        let q = query("Mario");
        assert!(!word_prefix_guard(&q, &normalize_words("Marioparty")));
    }

    #[test]
    fn query_secondary_segments() {
        let q = query("Hero's Adventure: Crystal Temple");
        assert_eq!(q.main_slug.as_deref(), Some("herosadventure"));
        assert_eq!(q.secondary_slug.as_deref(), Some("crystaltemple"));

        let q = query("Crystal Temple");
        assert!(q.main_slug.is_none());
        assert!(q.secondary_slug.is_none());
    }

    #[test]
    fn similarity_floor_is_respected() {
        // Far-apart slugs stay below the acceptance floor.
        assert!(jaro_winkler("zeldasadventure", "metroidfusion") < MIN_TITLE_SIMILARITY);
        // Near-miss spelling lands above it.
        assert!(jaro_winkler("thundar", "thunder") >= MIN_TITLE_SIMILARITY);
    }
}
