//! `lecdl forget <url>` – drop a course's cached metadata.

use anyhow::Result;
use lecdl_core::cache::CacheStore;
use lecdl_core::config::Settings;
use lecdl_core::course::CourseId;

pub async fn run_forget(settings: &Settings, url: &str) -> Result<()> {
    let key = CourseId::from_url(url)?.cache_key();
    let cache = CacheStore::open_at(&settings.cache_db).await?;
    if cache.remove(&key).await? {
        println!("Forgot {key}");
    } else {
        println!("Nothing cached for {key}");
    }
    Ok(())
}
