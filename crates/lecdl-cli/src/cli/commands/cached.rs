//! `lecdl cached` – list courses whose metadata is cached.

use anyhow::Result;
use lecdl_core::cache::CacheStore;
use lecdl_core::config::Settings;

pub async fn run_cached(settings: &Settings) -> Result<()> {
    let cache = CacheStore::open_at(&settings.cache_db).await?;
    let entries = cache.list().await?;
    if entries.is_empty() {
        println!("No cached courses.");
    } else {
        println!("{:<32} {:<8} {}", "KEY", "SCHEMA", "COMPLETED");
        for e in entries {
            println!("{:<32} {:<8} {}", e.key, e.schema_version, e.completed_at);
        }
    }
    Ok(())
}
