use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::database_ops::Db;
use crate::dispatch::{run_script, CmdEnv};
use crate::platform::StubPlatform;
use crate::zapscript::parse_script;

#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Script text, or `@path` to read it from a file.
    pub script: String,
    /// Treat the script as coming from an unsafe (remote) source.
    pub unsafe_source: bool,
}

/// Parse and dispatch a script against the stub platform.
pub async fn run(cfg: &Config, args: RunConfig) -> Result<()> {
    let text = match args.script.strip_prefix('@') {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading script file {path}"))?,
        None => args.script.clone(),
    };
    let script = parse_script(&text)?;
    if script.commands.is_empty() {
        anyhow::bail!("script contains no commands");
    }

    let media_db = Db::connect(&cfg.media_db_path).await?;
    let user_db = Db::connect(&cfg.user_db_path).await?;
    user_db.bootstrap_user_schema().await?;

    let mut env = CmdEnv::new(
        Arc::new(cfg.clone()),
        media_db,
        user_db,
        Arc::new(StubPlatform::new()),
    );
    env.unsafe_source = args.unsafe_source;

    let result = run_script(&mut env, &script).await?;
    info!(
        media_changed = result.media_changed,
        playlist_changed = result.playlist_changed,
        strategy = result.strategy.as_deref().unwrap_or("-"),
        "script finished"
    );
    Ok(())
}
