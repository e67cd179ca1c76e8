use anyhow::anyhow;
use tracing_subscriber::EnvFilter;

/// Install the process-wide log subscriber.
///
/// `RUST_LOG` wins when it parses; otherwise `fallback` supplies the
/// directive set (the binary passes something like `info,sqlx=warn` so
/// pool chatter stays quiet by default). Errors only when a subscriber is
/// already installed.
pub fn init_tracing(fallback: &str) -> anyhow::Result<()> {
    let filter = std::env::var(EnvFilter::DEFAULT_ENV)
        .ok()
        .and_then(|raw| raw.parse::<EnvFilter>().ok())
        .unwrap_or_else(|| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|err| anyhow!("log subscriber already installed: {err}"))
}
