//! Metadata phase: cached per course, otherwise scrape → detect → parse capture → correlate → resolve.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::cache::{CacheStore, MetadataBundle};
use crate::capture::parse_capture;
use crate::config::Settings;
use crate::correlate::correlate;
use crate::course::CourseId;
use crate::http::HttpClient;
use crate::playlist::resolve_best;
use crate::scraper::CourseScraper;

#[derive(Debug, Clone)]
pub struct MetadataOutcome {
    pub bundle: MetadataBundle,
    /// Taken from the cache; the scraper was not invoked.
    pub from_cache: bool,
}

/// Resolve a course's metadata bundle, reusing the cached one when present.
///
/// Cache reads and writes are best-effort: a failure is logged and the run
/// continues with the freshly computed bundle. Protocol detection, capture
/// parsing and duplicate titles are fatal for the course.
pub async fn resolve_metadata(
    cache: Option<&CacheStore>,
    scraper: Box<dyn CourseScraper>,
    client: Arc<dyn HttpClient>,
    settings: &Settings,
    course_url: &str,
) -> Result<MetadataOutcome> {
    let course = CourseId::from_url(course_url)?;
    let key = course.cache_key();

    if let Some(cache) = cache {
        match cache.get(&key).await {
            Ok(Some(bundle)) => {
                tracing::info!(course = %course, "metadata cache hit; skipping scrape");
                return Ok(MetadataOutcome {
                    bundle,
                    from_cache: true,
                });
            }
            Ok(None) => tracing::debug!(course = %course, "metadata cache miss"),
            Err(e) => tracing::warn!(course = %course, "metadata cache read failed: {:#}", e),
        }
    }

    let url = course_url.to_string();
    let scraped = tokio::task::spawn_blocking(move || {
        let mut scraper = scraper;
        scraper.scrape(&url)
    })
    .await
    .context("scraper task join")?
    .context("scrape course")?;

    let protocol = settings
        .backends
        .detect(scraped.player_description.as_deref())?;
    tracing::info!(course = %course, %protocol, lectures = scraped.lectures.len(), "detected player");

    let observations = parse_capture(&scraped.capture, &settings.backends.origins())?;
    let correlation = correlate(&scraped.lectures, &observations, protocol)?;

    let backend = settings.backends.get(protocol).clone();
    let policy = settings.non_master_policy;
    let lectures = scraped.lectures.clone();
    let mut bundle = MetadataBundle::new(course.as_str(), protocol);
    bundle.lectures = scraped.lectures;
    bundle.slides = scraped.slides;
    bundle.candidate_urls = correlation
        .media
        .iter()
        .map(|(title, media)| (title.clone(), media.candidate_urls.clone()))
        .collect::<BTreeMap<_, _>>();

    let (resolved, failures) = tokio::task::spawn_blocking(move || {
        let mut resolved = Vec::new();
        let mut failures = Vec::new();
        for lecture in &lectures {
            if let Some(failure) = correlation.failures.get(&lecture.title) {
                failures.push(failure.clone().into_item(&lecture.title));
                continue;
            }
            let Some(media) = correlation.media.get(&lecture.title) else {
                continue;
            };
            let title = resolve_best(
                client.as_ref(),
                &lecture.title,
                &media.candidate_urls,
                &backend,
                policy,
            );
            if title.skipped > 0 {
                tracing::debug!(title = %lecture.title, skipped = title.skipped, "non-master candidates skipped");
            }
            resolved.extend(title.media);
            failures.extend(title.failures);
        }
        (resolved, failures)
    })
    .await
    .context("resolver task join")?;
    bundle.resolved = resolved;
    bundle.failures = failures;

    tracing::info!(
        course = %course,
        titles = bundle.lectures.len(),
        resolved_titles = bundle.resolved_titles(),
        variants = bundle.resolved.len(),
        failures = bundle.failures.len(),
        "metadata resolved"
    );

    if let Some(cache) = cache {
        if let Err(e) = cache.put(&key, &bundle).await {
            tracing::warn!(course = %course, "metadata cache write failed; continuing uncached: {:#}", e);
        }
    }

    Ok(MetadataOutcome {
        bundle,
        from_cache: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::db::open_memory;
    use crate::config::{LecdlConfig, Requirements};
    use crate::http::fake::FakeHttp;
    use crate::media::{FailureStage, LectureRecord};
    use crate::protocol::Protocol;
    use crate::scraper::ScrapedCourse;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const MH_ORIGIN: &str = "https://matterhorn.dce.harvard.edu";
    const CDN: &str = "https://dvgni8clk4vbh.cloudfront.net/engage-player";

    struct CountingScraper {
        calls: Arc<AtomicUsize>,
        course: ScrapedCourse,
    }

    impl CourseScraper for CountingScraper {
        fn scrape(&mut self, _course_url: &str) -> Result<ScrapedCourse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.course.clone())
        }
    }

    fn capture(urls: &[String]) -> Vec<u8> {
        let events: Vec<String> = urls
            .iter()
            .map(|u| format!(r#"{{"params":{{"network_isolation_key":"{MH_ORIGIN}","url":"{u}"}}}}"#))
            .collect();
        // Truncated on purpose: the browser is killed before closing the log.
        format!(r#"{{"events":[{},"#, events.join(",")).into_bytes()
    }

    fn course() -> ScrapedCourse {
        ScrapedCourse {
            player_description: Some("HUDCE Publication Listing".to_string()),
            lectures: vec![
                LectureRecord {
                    title: "Lecture 1".to_string(),
                    page_url: "https://matterhorn.dce.harvard.edu/engage/player/watch.html?id=b1"
                        .to_string(),
                },
                LectureRecord {
                    title: "Ghost".to_string(),
                    page_url: "https://matterhorn.dce.harvard.edu/engage/player/watch.html?id=zz"
                        .to_string(),
                },
            ],
            slides: BTreeMap::new(),
            capture: capture(&[format!("{CDN}/b1/cam/master.m3u8")]),
        }
    }

    fn http() -> Arc<dyn HttpClient> {
        Arc::new(
            FakeHttp::new()
                .with(
                    &format!("{CDN}/b1/cam/master.m3u8"),
                    "#EXTM3U\n#EXT-X-STREAM-INF:RESOLUTION=1280x720\n../cam/720.m3u8\n",
                )
                .with(&format!("{CDN}/b1/cam/720.m3u8"), "#EXTINF:1,\n../media/720.mp4\n"),
        )
    }

    fn settings(dir: &std::path::Path) -> Settings {
        let cfg = LecdlConfig {
            video_root: Some(dir.join("videos")),
            cache_db: Some(dir.join("cache.db")),
            ..LecdlConfig::default()
        };
        Settings::validate(&cfg, Requirements::default()).unwrap()
    }

    #[tokio::test]
    async fn second_run_uses_cache_without_scraping() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let cache = open_memory().await.unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let url = "https://canvas.harvard.edu/courses/81234/external_tools/1";

        for expect_cached in [false, true] {
            let scraper = Box::new(CountingScraper {
                calls: Arc::clone(&calls),
                course: course(),
            });
            let out = resolve_metadata(Some(&cache), scraper, http(), &settings, url)
                .await
                .unwrap();
            assert_eq!(out.from_cache, expect_cached);
            assert_eq!(out.bundle.protocol, Protocol::Matterhorn);
            assert_eq!(out.bundle.course_id, "81234");
            assert_eq!(out.bundle.resolved.len(), 1);
            assert_eq!(
                out.bundle.resolved[0].download_uri,
                format!("{CDN}/b1/media/720.mp4")
            );
            assert_eq!(out.bundle.failures.len(), 1);
            assert_eq!(out.bundle.failures[0].stage, FailureStage::Correlation);
            assert_eq!(out.bundle.failures[0].title, "Ghost");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn runs_without_cache() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let scraper = Box::new(CountingScraper {
            calls: Arc::clone(&calls),
            course: course(),
        });
        let out = resolve_metadata(
            None,
            scraper,
            http(),
            &settings(dir.path()),
            "https://canvas.harvard.edu/courses/9/x",
        )
        .await
        .unwrap();
        assert!(!out.from_cache);
        assert_eq!(out.bundle.resolved_titles(), 1);
    }

    #[tokio::test]
    async fn unknown_player_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = course();
        c.player_description = Some("Some other LMS".to_string());
        let scraper = Box::new(CountingScraper {
            calls: Arc::new(AtomicUsize::new(0)),
            course: c,
        });
        let err = resolve_metadata(
            None,
            scraper,
            http(),
            &settings(dir.path()),
            "https://canvas.harvard.edu/courses/9/x",
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Some other LMS"));
    }

    #[tokio::test]
    async fn duplicate_titles_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = course();
        c.lectures[1].title = "Lecture 1".to_string();
        let scraper = Box::new(CountingScraper {
            calls: Arc::new(AtomicUsize::new(0)),
            course: c,
        });
        let err = resolve_metadata(
            None,
            scraper,
            http(),
            &settings(dir.path()),
            "https://canvas.harvard.edu/courses/9/x",
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }
}
