//! The production [`TaskRunner`]: local fetches and publishing.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::fetch::{fetch_media, fetch_slide};
use crate::http::HttpClient;
use crate::naming::object_key;
use crate::publish::Publisher;
use crate::storage::{artifact_state, ArtifactState};

use super::executor::{RunResult, TaskRunner};
use super::task::{LectureItem, Payload, SlideSet, Task, TaskKind};

pub struct MediaTaskRunner {
    client: Arc<dyn HttpClient>,
    video_root: PathBuf,
    publisher: Option<Arc<dyn Publisher>>,
    /// Whether an artifact kept short by a time limit counts as done (test runs).
    accept_partial: bool,
}

impl MediaTaskRunner {
    pub fn new(
        client: Arc<dyn HttpClient>,
        video_root: PathBuf,
        publisher: Option<Arc<dyn Publisher>>,
        accept_partial: bool,
    ) -> Self {
        Self {
            client,
            video_root,
            publisher,
            accept_partial,
        }
    }

    fn publisher(&self) -> Result<&dyn Publisher> {
        self.publisher
            .as_deref()
            .context("publish task without a configured publisher")
    }

    fn counts_as_done(&self, state: ArtifactState) -> bool {
        match state {
            ArtifactState::Complete => true,
            ArtifactState::Partial => self.accept_partial,
            ArtifactState::Missing => false,
        }
    }

    fn local_done(&self, relative: &Path) -> bool {
        self.counts_as_done(artifact_state(&self.video_root.join(relative)))
    }

    fn remote_done(&self, publisher: &dyn Publisher, relative: &Path) -> Result<bool> {
        Ok(self.counts_as_done(publisher.state(&object_key(relative))?))
    }

    fn fetch_lecture(&self, item: &LectureItem) -> Result<RunResult> {
        let dest = self.video_root.join(&item.relative_path);
        let outcome = fetch_media(
            self.client.as_ref(),
            item.protocol,
            &item.source,
            &dest,
            item.time_limit,
        )?;
        Ok(RunResult {
            bytes: outcome.bytes,
            partial: outcome.partial,
        })
    }

    /// Fetch every slide not already present. All items are attempted before a failure is reported.
    fn fetch_slides(&self, set: &SlideSet) -> Result<RunResult> {
        let mut result = RunResult::default();
        let mut failures = Vec::new();
        for item in &set.items {
            if self.local_done(&item.relative_path) {
                continue;
            }
            let dest = self.video_root.join(&item.relative_path);
            match fetch_slide(self.client.as_ref(), &item.thumbnail_url, &dest) {
                Ok(_) => result.bytes += std::fs::metadata(&dest).map(|m| m.len()).unwrap_or(0),
                Err(e) => {
                    tracing::warn!(slide = %item.relative_path.display(), "slide failed: {:#}", e);
                    failures.push(format!("{}: {:#}", item.relative_path.display(), e));
                }
            }
        }
        match failures.first() {
            None => Ok(result),
            Some(first) => anyhow::bail!(
                "{} of {} slides failed; first: {}",
                failures.len(),
                set.items.len(),
                first
            ),
        }
    }

    fn publish_lecture(&self, item: &LectureItem) -> Result<RunResult> {
        let publisher = self.publisher()?;
        let mut result = RunResult::default();
        if !self.local_done(&item.relative_path) {
            result = self.fetch_lecture(item)?;
        }
        let local = self.video_root.join(&item.relative_path);
        let partial = artifact_state(&local) == ArtifactState::Partial;
        publisher.put(&object_key(&item.relative_path), &local, partial)?;
        result.partial |= partial;
        Ok(result)
    }

    fn publish_slides(&self, set: &SlideSet) -> Result<RunResult> {
        let publisher = self.publisher()?;
        let result = self.fetch_slides(set)?;
        for item in &set.items {
            let key = object_key(&item.relative_path);
            if publisher.state(&key)? == ArtifactState::Complete {
                continue;
            }
            publisher.put(&key, &self.video_root.join(&item.relative_path), false)?;
        }
        Ok(result)
    }
}

impl TaskRunner for MediaTaskRunner {
    fn is_complete(&self, task: &Task) -> Result<bool> {
        match (task.kind, &task.payload) {
            (TaskKind::Fetch, Payload::Lecture(item)) => Ok(self.local_done(&item.relative_path)),
            (TaskKind::Fetch, Payload::Slides(set)) => {
                Ok(set.items.iter().all(|i| self.local_done(&i.relative_path)))
            }
            (TaskKind::Publish, Payload::Lecture(item)) => {
                self.remote_done(self.publisher()?, &item.relative_path)
            }
            (TaskKind::Publish, Payload::Slides(set)) => {
                let publisher = self.publisher()?;
                for item in &set.items {
                    if !self.remote_done(publisher, &item.relative_path)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }

    fn run(&self, task: &Task) -> Result<RunResult> {
        let result = match (task.kind, &task.payload) {
            (TaskKind::Fetch, Payload::Lecture(item)) => self.fetch_lecture(item),
            (TaskKind::Fetch, Payload::Slides(set)) => self.fetch_slides(set),
            (TaskKind::Publish, Payload::Lecture(item)) => self.publish_lecture(item),
            (TaskKind::Publish, Payload::Slides(set)) => self.publish_slides(set),
        };
        result.with_context(|| format!("{} {}", task.kind, task.identity))
    }
}
