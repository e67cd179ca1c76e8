use anyhow::Result;

use crate::config::Config;
use crate::database_ops::Db;
use crate::normalization::parse_adv_tags;
use crate::resolver;

#[derive(Debug, Clone, Default)]
pub struct ResolveConfig {
    /// `SystemID/Game Name` input.
    pub target: String,
    /// Optional advanced-arg tag list (`region:us,-unfinished:demo`).
    pub tags: Option<String>,
}

/// Resolve a title and print the matched path plus the strategy that found
/// it. Mirrors what `launch.title` would launch without launching it.
pub async fn run(cfg: &Config, args: ResolveConfig) -> Result<()> {
    let media_db = Db::connect(&cfg.media_db_path).await?;
    let adv_tags = args.tags.as_deref().map(parse_adv_tags).unwrap_or_default();

    let resolved = resolver::resolve_title(&media_db, cfg, &args.target, &adv_tags).await?;
    println!("{}", resolved.media.path);
    println!(
        "strategy: {}{}",
        resolved.strategy,
        if resolved.cache_hit { " (cached)" } else { "" }
    );
    Ok(())
}
