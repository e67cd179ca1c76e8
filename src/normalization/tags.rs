//! Tag extraction and filter canonicalization.
//!
//! Two extraction stages run over a game name before slugification:
//! 1. canonical `(<op?><type>:<value>)` groups supplied by the script author;
//! 2. conventional filename metadata in the remaining parentheses —
//!    `(USA)`, `(En,Fr,De)`, `(1996)`, `(Rev A)`, `(Demo)` and friends.
//!
//! Filename-derived tags always use the AND operator. Canonical groups pick
//! their operator from the prefix: `+` (default) AND, `~` OR, `-` NOT.

use std::sync::OnceLock;

use regex::Regex;

/// How a tag participates in candidate filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TagOperator {
    And,
    Or,
    Not,
}

impl TagOperator {
    pub fn symbol(self) -> char {
        match self {
            TagOperator::And => '+',
            TagOperator::Or => '~',
            TagOperator::Not => '-',
        }
    }

    fn from_prefix(prefix: &str) -> Self {
        match prefix {
            "-" => TagOperator::Not,
            "~" => TagOperator::Or,
            _ => TagOperator::And,
        }
    }
}

/// One tag constraint. Type and value are canonical lowercase identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagFilter {
    pub tag_type: String,
    pub value: String,
    pub operator: TagOperator,
}

impl TagFilter {
    pub fn new(tag_type: &str, value: &str, operator: TagOperator) -> Self {
        Self {
            tag_type: tag_type.trim().to_ascii_lowercase(),
            value: value.trim().to_ascii_lowercase(),
            operator,
        }
    }

    fn and(tag_type: &str, value: &str) -> Self {
        Self::new(tag_type, value, TagOperator::And)
    }
}

fn canonical_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(([+~-]?)([A-Za-z][A-Za-z0-9_-]*):([^)]*)\)").unwrap())
}

fn paren_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(([^)]*)\)").unwrap())
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(1[89]|20)\d{2}$").unwrap())
}

const REGION_NAMES: &[(&str, &str)] = &[
    ("usa", "us"),
    ("us", "us"),
    ("europe", "eu"),
    ("japan", "jp"),
    ("world", "world"),
    ("korea", "kr"),
    ("germany", "de"),
    ("france", "fr"),
    ("spain", "es"),
    ("italy", "it"),
    ("asia", "asia"),
    ("china", "cn"),
    ("taiwan", "tw"),
    ("uk", "uk"),
    ("united kingdom", "uk"),
    ("netherlands", "nl"),
    ("russia", "ru"),
    ("australia", "au"),
    ("brazil", "br"),
    ("sweden", "se"),
    ("canada", "ca"),
    ("hong kong", "hk"),
];

const LANGUAGE_CODES: &[&str] = &[
    "en", "ja", "fr", "de", "es", "it", "nl", "pt", "ru", "zh", "ko", "sv", "da", "fi", "no",
    "pl", "ar", "el", "tr", "cs", "hu",
];

const UNFINISHED_MARKERS: &[(&str, &str)] = &[
    ("demo", "demo"),
    ("beta", "beta"),
    ("proto", "proto"),
    ("prototype", "proto"),
    ("alpha", "alpha"),
    ("sample", "sample"),
    ("preview", "preview"),
    ("prerelease", "prerelease"),
    ("pre-release", "prerelease"),
];

const UNLICENSED_MARKERS: &[(&str, &str)] = &[
    ("unl", "unlicensed"),
    ("pirate", "bootleg"),
    ("bootleg", "bootleg"),
    ("hack", "hack"),
    ("translation", "translation"),
    ("clone", "clone"),
];

const RERELEASE_MARKERS: &[&str] = &["virtual console", "psn", "eshop", "xbla", "gamecube edition", "switch online", "classic mini"];

/// Map one parenthesized filename token to canonical tags. Unrecognized
/// tokens map to nothing (they are still stripped from the title).
fn map_filename_token(token: &str) -> Vec<TagFilter> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    let lower = trimmed.to_ascii_lowercase();

    // Region lists: "USA, Europe"
    let parts: Vec<&str> = lower.split(',').map(|p| p.trim()).collect();
    if !parts.is_empty()
        && parts
            .iter()
            .all(|p| REGION_NAMES.iter().any(|(name, _)| name == p))
    {
        return parts
            .iter()
            .map(|p| {
                let code = REGION_NAMES.iter().find(|(name, _)| name == p).unwrap().1;
                TagFilter::and("region", code)
            })
            .collect();
    }

    // Language lists: "En,Fr,De"
    if !parts.is_empty() && parts.iter().all(|p| LANGUAGE_CODES.contains(p)) {
        return parts
            .iter()
            .map(|p| TagFilter::and("language", p))
            .collect();
    }

    if year_re().is_match(&lower) {
        return vec![TagFilter::and("year", &lower)];
    }

    // Revision markers: "Rev A", "Rev 1", "v1.2", "Ver 1.1"
    for prefix in ["rev ", "ver ", "version "] {
        if let Some(rest) = lower.strip_prefix(prefix) {
            return vec![TagFilter::and("revision", rest)];
        }
    }
    if lower.starts_with('v') && lower[1..].chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return vec![TagFilter::and("revision", &lower[1..])];
    }

    // Development status, possibly numbered ("Beta 3").
    let status_word = lower.split_whitespace().next().unwrap_or(&lower);
    if let Some((_, canon)) = UNFINISHED_MARKERS.iter().find(|(m, _)| *m == status_word) {
        return vec![TagFilter::and("unfinished", canon)];
    }

    if let Some((_, canon)) = UNLICENSED_MARKERS.iter().find(|(m, _)| *m == lower) {
        return vec![TagFilter::and("unlicensed", canon)];
    }

    if RERELEASE_MARKERS.contains(&lower.as_str()) {
        return vec![TagFilter::and("rerelease", &lower.replace(' ', ""))];
    }

    if lower == "b" || lower == "bad" {
        return vec![TagFilter::and("dump", "bad")];
    }

    Vec::new()
}

/// Extract both tag stages from a name.
///
/// Returns the cleaned name (all parenthesized groups removed, whitespace
/// collapsed) plus the extracted filters: canonical groups first, filename
/// metadata second.
pub fn extract_tags(name: &str) -> (String, Vec<TagFilter>) {
    let mut filters: Vec<TagFilter> = Vec::new();

    // Stage 1: canonical (op type:value) groups.
    for caps in canonical_tag_re().captures_iter(name) {
        filters.push(TagFilter::new(
            &caps[2],
            &caps[3],
            TagOperator::from_prefix(&caps[1]),
        ));
    }
    let without_canonical = canonical_tag_re().replace_all(name, "");

    // Stage 2: remaining parentheses are filename metadata.
    for caps in paren_re().captures_iter(&without_canonical) {
        filters.extend(map_filename_token(&caps[1]));
    }
    let cleaned = paren_re().replace_all(&without_canonical, "");
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    (cleaned, filters)
}

/// Parse an advanced-arg tag list: comma-separated `op?type:value` entries.
pub fn parse_adv_tags(raw: &str) -> Vec<TagFilter> {
    raw.split(',')
        .filter_map(|entry| {
            let entry = entry.trim();
            let (prefix, rest) = match entry.chars().next() {
                Some('+') => ("+", &entry[1..]),
                Some('~') => ("~", &entry[1..]),
                Some('-') => ("-", &entry[1..]),
                _ => ("", entry),
            };
            let (tag_type, value) = rest.split_once(':')?;
            if tag_type.trim().is_empty() || value.trim().is_empty() {
                return None;
            }
            Some(TagFilter::new(
                tag_type,
                value,
                TagOperator::from_prefix(prefix),
            ))
        })
        .collect()
}

/// Merge auto-extracted tags with advanced-arg tags.
///
/// An advanced-arg tag wins for its type; extracted tags of other types are
/// preserved.
pub fn merge_filters(extracted: Vec<TagFilter>, adv: &[TagFilter]) -> Vec<TagFilter> {
    let mut merged: Vec<TagFilter> = adv.to_vec();
    for tag in extracted {
        if !adv.iter().any(|a| a.tag_type == tag.tag_type) {
            merged.push(tag);
        }
    }
    merged
}

/// Canonical form of a filter set: lowercased, sorted by
/// `(type, value, operator)`, deduplicated. Structurally equal sets produce
/// identical canonical forms.
pub fn canonicalize_filters(mut filters: Vec<TagFilter>) -> Vec<TagFilter> {
    for f in &mut filters {
        f.tag_type = f.tag_type.to_ascii_lowercase();
        f.value = f.value.to_ascii_lowercase();
    }
    filters.sort_by(|a, b| {
        (&a.tag_type, &a.value, a.operator).cmp(&(&b.tag_type, &b.value, b.operator))
    });
    filters.dedup();
    filters
}

/// Whether a media tag set satisfies a filter set under operator semantics:
/// every AND tag present, no NOT tag present, and at least one OR tag
/// present when any OR tags were specified.
pub fn satisfies(tags: &[(String, String)], filters: &[TagFilter]) -> bool {
    let has = |f: &TagFilter| tags.iter().any(|(t, v)| *t == f.tag_type && *v == f.value);

    let mut any_or = false;
    let mut or_hit = false;
    for f in filters {
        match f.operator {
            TagOperator::And => {
                if !has(f) {
                    return false;
                }
            }
            TagOperator::Not => {
                if has(f) {
                    return false;
                }
            }
            TagOperator::Or => {
                any_or = true;
                or_hit = or_hit || has(f);
            }
        }
    }
    !any_or || or_hit
}

/// Stable string form of a canonicalized filter set, used as the resolution
/// cache key component.
pub fn filters_cache_key(filters: &[TagFilter]) -> String {
    canonicalize_filters(filters.to_vec())
        .iter()
        .map(|f| format!("{}{}:{}", f.operator.symbol(), f.tag_type, f.value))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_groups_with_operators() {
        let (cleaned, tags) = extract_tags("Mystic Quest (region:us) (-unfinished:demo) (~language:en)");
        assert_eq!(cleaned, "Mystic Quest");
        assert_eq!(
            tags,
            vec![
                TagFilter::new("region", "us", TagOperator::And),
                TagFilter::new("unfinished", "demo", TagOperator::Not),
                TagFilter::new("language", "en", TagOperator::Or),
            ]
        );
    }

    #[test]
    fn filename_metadata_tags() {
        let (cleaned, tags) = extract_tags("Mystic Quest (USA) (1996) (Rev A) (Demo)");
        assert_eq!(cleaned, "Mystic Quest");
        assert!(tags.contains(&TagFilter::and("region", "us")));
        assert!(tags.contains(&TagFilter::and("year", "1996")));
        assert!(tags.contains(&TagFilter::and("revision", "a")));
        assert!(tags.contains(&TagFilter::and("unfinished", "demo")));
        assert!(tags.iter().all(|t| t.operator == TagOperator::And));
    }

    #[test]
    fn multi_region_and_language_lists() {
        let (_, tags) = extract_tags("Game (USA, Europe) (En,Fr,De)");
        assert!(tags.contains(&TagFilter::and("region", "us")));
        assert!(tags.contains(&TagFilter::and("region", "eu")));
        assert!(tags.contains(&TagFilter::and("language", "en")));
        assert!(tags.contains(&TagFilter::and("language", "fr")));
        assert!(tags.contains(&TagFilter::and("language", "de")));
    }

    #[test]
    fn unknown_parens_are_stripped_but_produce_no_tags() {
        let (cleaned, tags) = extract_tags("Game (Totally Unknown Marker)");
        assert_eq!(cleaned, "Game");
        assert!(tags.is_empty());
    }

    #[test]
    fn adv_tags_win_per_type() {
        let extracted = vec![
            TagFilter::and("region", "eu"),
            TagFilter::and("year", "1996"),
        ];
        let adv = vec![TagFilter::and("region", "jp")];
        let merged = merge_filters(extracted, &adv);
        assert!(merged.contains(&TagFilter::and("region", "jp")));
        assert!(!merged.contains(&TagFilter::and("region", "eu")));
        assert!(merged.contains(&TagFilter::and("year", "1996")));
    }

    #[test]
    fn canonicalization_is_order_and_case_insensitive() {
        let a = vec![
            TagFilter::new("Region", "US", TagOperator::And),
            TagFilter::new("unfinished", "demo", TagOperator::Not),
        ];
        let b = vec![
            TagFilter::new("unfinished", "DEMO", TagOperator::Not),
            TagFilter::new("region", "us", TagOperator::And),
        ];
        assert_eq!(filters_cache_key(&a), filters_cache_key(&b));
    }

    #[test]
    fn parse_adv_tag_list() {
        let tags = parse_adv_tags("region:us,-unfinished:demo,~language:en");
        assert_eq!(
            tags,
            vec![
                TagFilter::new("region", "us", TagOperator::And),
                TagFilter::new("unfinished", "demo", TagOperator::Not),
                TagFilter::new("language", "en", TagOperator::Or),
            ]
        );
        assert!(parse_adv_tags("garbage").is_empty());
    }

    #[test]
    fn satisfies_operator_semantics() {
        let tags = vec![
            ("region".to_string(), "us".to_string()),
            ("language".to_string(), "en".to_string()),
        ];
        // AND present, NOT absent.
        assert!(satisfies(
            &tags,
            &[
                TagFilter::new("region", "us", TagOperator::And),
                TagFilter::new("unfinished", "demo", TagOperator::Not),
            ]
        ));
        // AND missing.
        assert!(!satisfies(&tags, &[TagFilter::new("region", "jp", TagOperator::And)]));
        // NOT present.
        assert!(!satisfies(&tags, &[TagFilter::new("region", "us", TagOperator::Not)]));
        // OR: at least one must hit.
        assert!(satisfies(
            &tags,
            &[
                TagFilter::new("region", "jp", TagOperator::Or),
                TagFilter::new("region", "us", TagOperator::Or),
            ]
        ));
        assert!(!satisfies(&tags, &[TagFilter::new("region", "jp", TagOperator::Or)]));
        // Empty filter set always passes.
        assert!(satisfies(&tags, &[]));
    }

    #[test]
    fn revision_shorthand() {
        let (_, tags) = extract_tags("Game (v1.2)");
        assert_eq!(tags, vec![TagFilter::and("revision", "1.2")]);
    }
}
