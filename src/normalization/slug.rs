//! Display-name to slug mapping.
//!
//! A slug is the lowercase ASCII alphanumeric identifier used as the media
//! index search key. The mapping is deterministic and idempotent on its own
//! output: slugifying a slug yields the same slug.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Slug plus the metadata the fuzzy prefilter buckets on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugMeta {
    pub slug: String,
    /// Character count of the final slug.
    pub slug_length: usize,
    /// Whitespace-separated token count before final concatenation.
    pub word_count: usize,
    /// Slug of the segment after the first `:` or ` - `; empty when absent.
    pub secondary_slug: String,
}

/// Roman numeral word tokens normalized to digits. Bare `v` and `x` are
/// excluded: they are legitimately title words ("Mega Man X" is not
/// "Mega Man 10").
const ROMAN_NUMERALS: &[(&str, &str)] = &[
    ("ii", "2"),
    ("iii", "3"),
    ("iv", "4"),
    ("vi", "6"),
    ("vii", "7"),
    ("viii", "8"),
    ("ix", "9"),
    ("xi", "11"),
    ("xii", "12"),
    ("xiii", "13"),
];

/// Symbols stripped before NFKD decomposition. NFKD would otherwise expand
/// `™` into the letters `tm`, which must not survive into the slug.
const STRIPPED_SYMBOLS: &[char] = &['™', '®', '©'];

fn roman_to_digits(token: &str) -> &str {
    ROMAN_NUMERALS
        .iter()
        .find(|(roman, _)| *roman == token)
        .map(|(_, digits)| *digits)
        .unwrap_or(token)
}

/// Ordered normalized word tokens of a display name.
///
/// Used both for building slugs (concatenation) and for word-sequence
/// validation during prefix matching. One leading definite article is
/// dropped; `&` becomes the word `and`; roman numeral tokens become digits;
/// everything non-alphanumeric is removed without leaving separators.
pub fn normalize_words(name: &str) -> Vec<String> {
    let decomposed: String = name
        .chars()
        .filter(|c| !STRIPPED_SYMBOLS.contains(c))
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    let anded = decomposed.to_lowercase().replace('&', " and ");

    let mut words: Vec<String> = Vec::new();
    let mut article_dropped = false;
    for raw in anded.split_whitespace() {
        let cleaned: String = raw.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
        if cleaned.is_empty() {
            continue;
        }
        if words.is_empty() && !article_dropped && cleaned == "the" {
            article_dropped = true;
            continue;
        }
        words.push(roman_to_digits(&cleaned).to_string());
    }
    words
}

/// Map a display name to its slug.
pub fn slugify(name: &str) -> String {
    normalize_words(name).concat()
}

/// Split a name into its main segment and optional secondary segment.
///
/// The secondary segment is the text after the first `:` or ` - `,
/// whichever occurs earlier.
pub fn split_secondary(name: &str) -> (&str, Option<&str>) {
    let colon = name.find(':');
    let dash = name.find(" - ");
    match (colon, dash) {
        (Some(c), Some(d)) if c < d => (&name[..c], Some(&name[c + 1..])),
        (Some(c), None) => (&name[..c], Some(&name[c + 1..])),
        (_, Some(d)) => (&name[..d], Some(&name[d + 3..])),
        (None, None) => (name, None),
    }
}

/// Slugify with the metadata used by the fuzzy prefilter and the
/// secondary-title strategies.
pub fn slugify_with_metadata(name: &str) -> SlugMeta {
    let words = normalize_words(name);
    let slug = words.concat();
    let (_, secondary) = split_secondary(name);
    let secondary_slug = secondary.map(slugify).unwrap_or_default();

    SlugMeta {
        slug_length: slug.chars().count(),
        word_count: words.len(),
        slug,
        secondary_slug,
    }
}
