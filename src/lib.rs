//! ZapScript command runtime.
//!
//! Receives a small text script (typically from a scanned NFC tag or a
//! remote zap link), parses it, and dispatches each command: launching
//! media through the fuzzy title resolver, fetching remote scripts with
//! offline fallback, driving playlists, and injecting input through the
//! platform abstraction.

pub mod cli;
pub mod config;
pub mod database_ops;
pub mod dispatch;
pub mod error;
pub mod normalization;
pub mod platform;
pub mod resolver;
pub mod systems;
pub mod tracing;
pub mod zaplink;
pub mod zapscript;

pub mod util {
    pub mod env;
}

pub use config::Config;
pub use error::{ZapError, ZapResult};
