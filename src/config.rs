//! Runtime configuration.
//!
//! Everything has a hard default so the runtime works with no configuration
//! at all; env vars override individual fields (ZAPRUN_* namespace).

use serde::Deserialize;

use crate::util::env::{env_list, env_opt, env_parse};

/// Default region preference order used by the selection policy.
pub const DEFAULT_REGIONS: &[&str] = &["us", "world"];
/// Default language preference order used by the selection policy.
pub const DEFAULT_LANGS: &[&str] = &["en"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Region tags preferred when a title has multiple regional dumps.
    pub regions: Vec<String>,
    /// Language tags preferred when a title has multiple language dumps.
    pub langs: Vec<String>,
    /// Path to the read-only media index database.
    pub media_db_path: String,
    /// Path to the read/write user database (caches, zap-link hosts).
    pub user_db_path: String,
    /// TCP address probed before pre-warming zap-link hosts.
    pub probe_addr: String,
    /// Root directories searched by the relative-path launcher walk.
    pub root_dirs: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            regions: DEFAULT_REGIONS.iter().map(|s| s.to_string()).collect(),
            langs: DEFAULT_LANGS.iter().map(|s| s.to_string()).collect(),
            media_db_path: "media.db".into(),
            user_db_path: "user.db".into(),
            probe_addr: "1.1.1.1:443".into(),
            root_dirs: Vec::new(),
        }
    }
}

impl Config {
    /// Build a config from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Self {
            regions: env_list("ZAPRUN_REGIONS", DEFAULT_REGIONS),
            langs: env_list("ZAPRUN_LANGS", DEFAULT_LANGS),
            media_db_path: env_parse("ZAPRUN_MEDIA_DB", defaults.media_db_path),
            user_db_path: env_parse("ZAPRUN_USER_DB", defaults.user_db_path),
            probe_addr: env_parse("ZAPRUN_PROBE_ADDR", defaults.probe_addr),
            root_dirs: env_opt("ZAPRUN_ROOT_DIRS")
                .map(|raw| {
                    raw.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_selection_policy_contract() {
        let cfg = Config::default();
        assert_eq!(cfg.regions, vec!["us", "world"]);
        assert_eq!(cfg.langs, vec!["en"]);
    }
}
