//! Course pipeline: metadata phase, expansion, then two graph executions.
//!
//! The task count is unknown until metadata resolves, so a run is two-phase:
//! [`metadata::resolve_metadata`] yields a typed bundle, [`expand::expand`]
//! turns it into task lists, and [`executor::execute`] runs the video graph
//! to completion before the slide graph starts.

pub mod executor;
pub mod expand;
pub mod metadata;
pub mod report;
pub mod runner;
pub mod task;

pub use executor::{execute, RunResult, TaskRunner};
pub use expand::{expand, Expansion, RunPlan};
pub use metadata::{resolve_metadata, MetadataOutcome};
pub use report::{CourseReport, GraphReport, TaskOutcome, TaskStatus};
pub use runner::MediaTaskRunner;
pub use task::{LectureItem, Payload, SlideItem, SlideSet, Task, TaskKind};

use anyhow::Result;
use std::sync::Arc;

use crate::cache::CacheStore;
use crate::config::Settings;
use crate::http::HttpClient;
use crate::publish::Publisher;
use crate::scraper::CourseScraper;

/// Per-invocation switches from the command line.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub kind: TaskKind,
    /// Disables test-run truncation and uses the full fetch limit.
    pub full: bool,
    pub process_slides: bool,
}

/// Long-lived collaborators shared by every course run.
pub struct Pipeline<'a> {
    pub settings: &'a Settings,
    pub cache: Option<&'a CacheStore>,
    pub client: Arc<dyn HttpClient>,
    pub publisher: Option<Arc<dyn Publisher>>,
}

impl Pipeline<'_> {
    pub async fn run_course(
        &self,
        scraper: Box<dyn CourseScraper>,
        course_url: &str,
        opts: RunOptions,
    ) -> Result<CourseReport> {
        if opts.kind == TaskKind::Publish && self.publisher.is_none() {
            anyhow::bail!("publish run without a publisher");
        }

        let meta = resolve_metadata(
            self.cache,
            scraper,
            Arc::clone(&self.client),
            self.settings,
            course_url,
        )
        .await?;
        let bundle = meta.bundle;

        let test_run = !opts.full;
        let plan = RunPlan {
            kind: opts.kind,
            test_run,
            process_slides: opts.process_slides,
            fetch_limit: self.settings.fetch_limit(test_run),
            test_run_items: self.settings.test_run_items,
        };
        let expansion = expand(&bundle, &plan);
        tracing::info!(
            course = %bundle.course_id,
            test_run,
            videos = expansion.lectures.len(),
            slide_sets = expansion.slides.len(),
            "expanded tasks"
        );

        let runner: Arc<dyn TaskRunner> = Arc::new(MediaTaskRunner::new(
            Arc::clone(&self.client),
            self.settings.video_root.clone(),
            self.publisher.clone(),
            test_run,
        ));
        let workers = self.settings.max_parallel_fetches;
        let videos = execute(expansion.lectures, Arc::clone(&runner), workers).await;
        let slides_requested = opts.process_slides && bundle.protocol.supports_slides();
        let slides = if slides_requested {
            Some(execute(expansion.slides, runner, workers).await)
        } else {
            None
        };

        let mut failures = bundle.failures.clone();
        failures.extend(expansion.failures);
        Ok(CourseReport {
            course_id: bundle.course_id.clone(),
            protocol: bundle.protocol,
            metadata_cached: meta.from_cache,
            titles: bundle.lectures.len(),
            titles_resolved: bundle.resolved_titles(),
            variants: bundle.resolved.len(),
            failures,
            videos,
            slides,
        })
    }
}
