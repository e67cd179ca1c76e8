//! Candidate selection policy.
//!
//! Every stage is `candidates -> candidates` and is applied only if it
//! leaves a non-empty result; an emptying stage is skipped and the previous
//! set kept. The pipeline is a fold over the stages, ending with an
//! alphabetical tie-break on base filename.

use crate::config::Config;
use crate::database_ops::SearchResult;
use crate::normalization::{satisfies, TagFilter, TagOperator};

/// Tag values that mark an entry as an unfinished or otherwise non-canonical
/// variant, excluded unless explicitly requested.
const UNFINISHED_VARIANTS: &[&str] = &[
    "demo", "beta", "proto", "alpha", "sample", "preview", "prerelease",
];
const UNLICENSED_VARIANTS: &[&str] = &["hack", "translation", "bootleg", "clone"];

fn stage<F>(prev: Vec<SearchResult>, f: F) -> Vec<SearchResult>
where
    F: FnOnce(&[SearchResult]) -> Vec<SearchResult>,
{
    let next = f(&prev);
    if next.is_empty() {
        prev
    } else {
        next
    }
}

/// Did the caller explicitly ask for this tag (AND or OR)? NOT filters do
/// not count as a request.
fn requested(filters: &[TagFilter], tag_type: &str, value: &str) -> bool {
    filters.iter().any(|f| {
        f.operator != TagOperator::Not && f.tag_type == tag_type && f.value == value
    })
}

fn requested_type(filters: &[TagFilter], tag_type: &str) -> bool {
    filters
        .iter()
        .any(|f| f.operator != TagOperator::Not && f.tag_type == tag_type)
}

fn is_excluded_variant(entry: &SearchResult, filters: &[TagFilter]) -> bool {
    for (t, v) in &entry.tags {
        let excluded = match t.as_str() {
            "unfinished" => UNFINISHED_VARIANTS.contains(&v.as_str()),
            "unlicensed" => UNLICENSED_VARIANTS.contains(&v.as_str()),
            "dump" => v == "bad",
            _ => false,
        };
        if excluded && !requested(filters, t, v) {
            return true;
        }
    }
    false
}

fn is_rerelease(entry: &SearchResult, filters: &[TagFilter]) -> bool {
    for tag_type in ["rerelease", "reboxed"] {
        if entry.has_tag_type(tag_type) && !requested_type(filters, tag_type) {
            return true;
        }
    }
    false
}

/// Three-tier partition on one tag type: preferred values, untagged, other.
/// The first non-empty tier wins.
fn prefer_tiered(
    candidates: Vec<SearchResult>,
    tag_type: &str,
    preferred: &[String],
) -> Vec<SearchResult> {
    let mut pref: Vec<SearchResult> = Vec::new();
    let mut untagged: Vec<SearchResult> = Vec::new();
    let mut other: Vec<SearchResult> = Vec::new();

    for c in candidates {
        if preferred.iter().any(|p| c.has_tag(tag_type, p)) {
            pref.push(c);
        } else if !c.has_tag_type(tag_type) {
            untagged.push(c);
        } else {
            other.push(c);
        }
    }

    if !pref.is_empty() {
        pref
    } else if !untagged.is_empty() {
        untagged
    } else {
        other
    }
}

/// Pick one entry from a non-empty candidate set.
pub fn select_one(
    candidates: Vec<SearchResult>,
    filters: &[TagFilter],
    cfg: &Config,
) -> Option<SearchResult> {
    if candidates.is_empty() {
        return None;
    }

    let c = stage(candidates, |prev| {
        prev.iter()
            .filter(|e| satisfies(&e.tags, filters))
            .cloned()
            .collect()
    });
    let c = stage(c, |prev| {
        prev.iter()
            .filter(|e| !is_excluded_variant(e, filters))
            .cloned()
            .collect()
    });
    let c = stage(c, |prev| {
        prev.iter()
            .filter(|e| !is_rerelease(e, filters))
            .cloned()
            .collect()
    });
    let c = prefer_tiered(c, "region", &cfg.regions);
    let mut c = prefer_tiered(c, "language", &cfg.langs);

    c.sort_by(|a, b| a.base_filename().cmp(b.base_filename()));
    c.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalization::TagFilter;

    fn entry(dbid: i64, path: &str, tags: &[(&str, &str)]) -> SearchResult {
        SearchResult {
            dbid,
            system_id: "SNES".into(),
            title_dbid: 1,
            name: "Game".into(),
            path: path.into(),
            tags: tags
                .iter()
                .map(|(t, v)| (t.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn variants_excluded_when_non_variant_exists() {
        let cands = vec![
            entry(1, "/roms/Game (Demo).sfc", &[("unfinished", "demo")]),
            entry(2, "/roms/Game (USA).sfc", &[("region", "us")]),
        ];
        let got = select_one(cands, &[], &Config::default()).unwrap();
        assert_eq!(got.dbid, 2);
    }

    #[test]
    fn variant_kept_when_explicitly_requested() {
        let cands = vec![
            entry(1, "/roms/Game (Demo).sfc", &[("unfinished", "demo")]),
            entry(2, "/roms/Game (USA).sfc", &[("region", "us")]),
        ];
        let filters = vec![TagFilter::new("unfinished", "demo", TagOperator::And)];
        let got = select_one(cands, &filters, &Config::default()).unwrap();
        assert_eq!(got.dbid, 1);
    }

    #[test]
    fn variant_selected_when_only_variants_exist() {
        let cands = vec![entry(1, "/roms/Game (Beta).sfc", &[("unfinished", "beta")])];
        let got = select_one(cands, &[], &Config::default()).unwrap();
        assert_eq!(got.dbid, 1);
    }

    #[test]
    fn region_preference_tiers() {
        let cands = vec![
            entry(1, "/roms/Game (Japan).sfc", &[("region", "jp")]),
            entry(2, "/roms/Game (USA).sfc", &[("region", "us")]),
            entry(3, "/roms/Game (Europe).sfc", &[("region", "eu")]),
        ];
        let got = select_one(cands, &[], &Config::default()).unwrap();
        assert_eq!(got.dbid, 2);
    }

    #[test]
    fn untagged_preferred_over_non_preferred_region() {
        let cands = vec![
            entry(1, "/roms/Game (Japan).sfc", &[("region", "jp")]),
            entry(2, "/roms/Game.sfc", &[]),
        ];
        let got = select_one(cands, &[], &Config::default()).unwrap();
        assert_eq!(got.dbid, 2);
    }

    #[test]
    fn rerelease_dropped_unless_requested() {
        let cands = vec![
            entry(1, "/roms/Game (Virtual Console).sfc", &[("rerelease", "virtualconsole")]),
            entry(2, "/roms/Game.sfc", &[]),
        ];
        let got = select_one(cands.clone(), &[], &Config::default()).unwrap();
        assert_eq!(got.dbid, 2);

        let filters = vec![TagFilter::new("rerelease", "virtualconsole", TagOperator::And)];
        let got = select_one(cands, &filters, &Config::default()).unwrap();
        assert_eq!(got.dbid, 1);
    }

    #[test]
    fn emptying_filter_keeps_previous_set() {
        // NOT region:us empties the set; the stage is skipped.
        let cands = vec![entry(1, "/roms/Game (USA).sfc", &[("region", "us")])];
        let filters = vec![TagFilter::new("region", "us", TagOperator::Not)];
        let got = select_one(cands, &filters, &Config::default()).unwrap();
        assert_eq!(got.dbid, 1);
    }

    #[test]
    fn alphabetical_tie_break_on_base_filename() {
        let cands = vec![
            entry(1, "/roms/b/Game B.sfc", &[]),
            entry(2, "/roms/a/Game A.sfc", &[]),
        ];
        let got = select_one(cands, &[], &Config::default()).unwrap();
        assert_eq!(got.dbid, 2);
    }
}
