use anyhow::Result;
use clap::{Parser, Subcommand};

use zaprun::cli::{resolve, run, zaplink};
use zaprun::config::Config;
use zaprun::util::env as env_util;

#[derive(Parser)]
#[command(name = "zaprun", about = "ZapScript command runtime", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and dispatch a ZapScript (text, or @file).
    Run {
        script: String,
        /// Treat the script as coming from an unsafe (remote) source.
        #[arg(long)]
        r#unsafe: bool,
    },
    /// Resolve a `SystemID/Game Name` title without launching it.
    Resolve {
        target: String,
        /// Advanced tag filters, e.g. `region:us,-unfinished:demo`.
        #[arg(long)]
        tags: Option<String>,
    },
    /// Zap-link maintenance.
    #[command(subcommand)]
    Zaplink(ZaplinkCommands),
}

#[derive(Subcommand)]
enum ZaplinkCommands {
    /// Check whether a URL is a zap link; print the fetched script.
    Check { url: String },
    /// Pre-warm every known supported host.
    Prewarm,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_util::init_env();
    zaprun::tracing::init_tracing("info,sqlx=warn")?;

    let cli = Cli::parse();
    let cfg = Config::from_env();

    match cli.command {
        Commands::Run { script, r#unsafe } => {
            run::run(
                &cfg,
                run::RunConfig {
                    script,
                    unsafe_source: r#unsafe,
                },
            )
            .await
        }
        Commands::Resolve { target, tags } => {
            resolve::run(&cfg, resolve::ResolveConfig { target, tags }).await
        }
        Commands::Zaplink(ZaplinkCommands::Check { url }) => {
            zaplink::check(&cfg, zaplink::CheckConfig { url }).await
        }
        Commands::Zaplink(ZaplinkCommands::Prewarm) => zaplink::prewarm(&cfg).await,
    }
}
