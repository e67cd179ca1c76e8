//! Error kinds surfaced by the command runtime.
//!
//! Every user-visible failure maps to one named kind so callers (and tests)
//! can match on behavior instead of message text. Internal plumbing that has
//! no meaningful kind stays on `anyhow` at the binary boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ZapError {
    #[error("expected {expected} argument(s), got {got}")]
    ArgCount { expected: usize, got: usize },

    #[error("required argument is empty")]
    RequiredArgs,

    #[error("launch target must be SystemID/Name, got {0:?}")]
    InvalidFormat(String),

    #[error("unknown system: {0}")]
    SystemNotFound(String),

    #[error("no media found for {system}/{query}")]
    NoResults { system: String, query: String },

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("no launcher with id: {0}")]
    LauncherNotFound(String),

    #[error("media launching is currently blocked")]
    MediaLaunchBlocked,

    #[error("command {0} not allowed from an unsafe source")]
    UnsafeSource(String),

    #[error("remote fetch failed: {0}")]
    RemoteFetchFailed(String),

    #[error("remote script is JSON; only the text format is supported")]
    JsonNotSupported,

    #[error("unsupported remote content type: {0:?}")]
    ContentTypeInvalid(String),

    #[error("unknown command: {0}")]
    InvalidCommand(String),

    #[error(transparent)]
    Db(#[from] sqlx::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type ZapResult<T> = Result<T, ZapError>;
