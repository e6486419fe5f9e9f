//! `lecdl download` / `lecdl upload` – run one course through the pipeline.

use anyhow::{Context, Result};
use lecdl_core::cache::CacheStore;
use lecdl_core::config::Settings;
use lecdl_core::http::{CurlClient, HttpClient};
use lecdl_core::pipeline::{Pipeline, RunOptions, TaskKind};
use lecdl_core::publish::{DirectoryPublisher, Publisher};
use lecdl_core::scraper::CommandScraper;
use std::sync::Arc;

pub async fn run_course(settings: &Settings, url: &str, opts: RunOptions) -> Result<()> {
    // Without the cache the run still works; it just scrapes every time.
    let cache = match CacheStore::open_at(&settings.cache_db).await {
        Ok(store) => Some(store),
        Err(e) => {
            tracing::warn!(
                path = %settings.cache_db.display(),
                "metadata cache unavailable: {:#}",
                e
            );
            None
        }
    };

    let client: Arc<dyn HttpClient> = Arc::new(CurlClient::new(&settings.http));
    let publisher: Option<Arc<dyn Publisher>> = match (opts.kind, &settings.publish_root) {
        (TaskKind::Publish, Some(root)) => Some(Arc::new(DirectoryPublisher::new(root))),
        _ => None,
    };
    let pipeline = Pipeline {
        settings,
        cache: cache.as_ref(),
        client,
        publisher,
    };

    if !opts.full {
        println!(
            "Test run: first {} items, {}s per fetch (pass --full for everything).",
            settings.test_run_items,
            settings.test_fetch_limit.as_secs()
        );
    }
    let scraper = Box::new(CommandScraper::from_settings(settings));
    let report = pipeline
        .run_course(scraper, url, opts)
        .await
        .with_context(|| format!("course {url}"))?;

    print!("{report}");
    if !report.is_clean() {
        println!("Some items failed; rerun to retry them.");
    }
    Ok(())
}
