//! Persistent stores.
//!
//! Two SQLite databases back the runtime: the media index (read-only here,
//! written by the out-of-process indexer) which also holds the slug
//! resolution cache, and the user store holding zap-link host capability
//! records and the remote script body cache.

pub mod cache;
pub mod db;
pub mod media;
pub mod zaplink;

pub use db::Db;
pub use media::{MediaTitle, SearchResult};
