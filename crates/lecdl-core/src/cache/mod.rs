//! Durable metadata cache (SQLite via sqlx).
//!
//! Holds one [`MetadataBundle`] per course so a repeated run skips login,
//! scraping, correlation and resolution entirely. Media artifacts are not
//! cached here; their presence at the destination path is the cache.

pub mod bundle;
pub mod db;

pub use bundle::{MetadataBundle, BUNDLE_SCHEMA_VERSION};
pub use db::{CacheStore, CachedEntry};
