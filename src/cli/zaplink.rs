use anyhow::Result;
use reqwest::Client;

use crate::config::Config;
use crate::database_ops::Db;
use crate::zaplink;

#[derive(Debug, Clone, Default)]
pub struct CheckConfig {
    pub url: String,
}

/// Probe (or read back) a host's zap-link capability and, when supported,
/// fetch and print the script body.
pub async fn check(cfg: &Config, args: CheckConfig) -> Result<()> {
    let user_db = Db::connect(&cfg.user_db_path).await?;
    user_db.bootstrap_user_schema().await?;
    let client = Client::new();

    match zaplink::check_zap_link(&user_db, &client, "cli", &args.url).await? {
        Some(body) => {
            println!("{body}");
        }
        None => {
            println!("not a zap link: {}", args.url);
        }
    }
    Ok(())
}

/// Pre-warm every known supported host.
pub async fn prewarm(cfg: &Config) -> Result<()> {
    let user_db = Db::connect(&cfg.user_db_path).await?;
    user_db.bootstrap_user_schema().await?;
    zaplink::prewarm(&user_db, &Client::new(), "cli", &cfg.probe_addr).await;
    Ok(())
}
