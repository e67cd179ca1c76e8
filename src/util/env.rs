//! Environment access for the runtime: `.env` loading plus typed getters.
//! Every getter runs `init_env` itself, so callers never have to care
//! about load order.

use std::str::FromStr;
use std::sync::Once;

static DOTENV: Once = Once::new();

/// Load `.env` once per process. Later calls are no-ops.
pub fn init_env() {
    DOTENV.call_once(|| {
        if dotenv::dotenv().is_ok() {
            tracing::debug!("loaded .env");
        }
    });
}

/// Trimmed value of a set, non-blank variable.
fn raw(key: &str) -> Option<String> {
    init_env();
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Required value; the error names the missing key.
pub fn env_req(key: &str) -> anyhow::Result<String> {
    raw(key).ok_or_else(|| anyhow::anyhow!("env var {key} is not set"))
}

/// Optional value. Unset and blank both read as None.
pub fn env_opt(key: &str) -> Option<String> {
    raw(key)
}

/// Parsed value; unset, blank, or unparseable all fall back to the default.
pub fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    raw(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Boolean flag. `1/true/on/yes` enable, `0/false/off/no` disable,
/// anything else keeps the default.
pub fn env_flag(key: &str, default: bool) -> bool {
    match raw(key).map(|v| v.to_ascii_lowercase()).as_deref() {
        Some("1" | "true" | "on" | "yes") => true,
        Some("0" | "false" | "off" | "no") => false,
        _ => default,
    }
}

/// Comma-separated list, lowercased; the default applies when the variable
/// is unset or contains no usable entries.
pub fn env_list(key: &str, default: &[&str]) -> Vec<String> {
    let parsed: Vec<String> = raw(key)
        .map(|v| {
            v.split(',')
                .map(|entry| entry.trim().to_ascii_lowercase())
                .filter(|entry| !entry.is_empty())
                .collect()
        })
        .unwrap_or_default();

    if parsed.is_empty() {
        default.iter().map(|s| s.to_string()).collect()
    } else {
        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_list_falls_back_to_default() {
        let v = env_list("ZAPRUN_TEST_UNSET_LIST", &["us", "world"]);
        assert_eq!(v, vec!["us".to_string(), "world".to_string()]);
    }

    #[test]
    fn env_flag_defaults_when_unset() {
        assert!(env_flag("ZAPRUN_TEST_UNSET_FLAG", true));
        assert!(!env_flag("ZAPRUN_TEST_UNSET_FLAG", false));
    }

    #[test]
    fn env_flag_recognizes_explicit_off() {
        std::env::set_var("ZAPRUN_TEST_OFF_FLAG", "off");
        assert!(!env_flag("ZAPRUN_TEST_OFF_FLAG", true));
        std::env::remove_var("ZAPRUN_TEST_OFF_FLAG");
    }

    #[test]
    fn env_parse_falls_back_on_garbage() {
        std::env::set_var("ZAPRUN_TEST_BAD_NUM", "not-a-number");
        assert_eq!(env_parse("ZAPRUN_TEST_BAD_NUM", 7u32), 7);
        std::env::remove_var("ZAPRUN_TEST_BAD_NUM");
    }
}
