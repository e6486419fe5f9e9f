//! Resolved metadata → task lists.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::MetadataBundle;
use crate::media::{FailureStage, ItemFailure};
use crate::naming::{media_path, media_stem, object_key, slide_dir, slide_file_name};

use super::task::{LectureItem, Payload, SlideItem, SlideSet, Task, TaskKind};

/// Per-invocation choices that shape expansion.
#[derive(Debug, Clone, Copy)]
pub struct RunPlan {
    pub kind: TaskKind,
    pub test_run: bool,
    pub process_slides: bool,
    pub fetch_limit: Duration,
    /// Items kept per multi-item task on a test run.
    pub test_run_items: usize,
}

#[derive(Debug, Default)]
pub struct Expansion {
    /// One task per resolved variant, in bundle order.
    pub lectures: Vec<Task>,
    /// One task per title with slides, in page order.
    pub slides: Vec<Task>,
    /// Slides whose timestamp could not be turned into a file name, and
    /// titles whose cleaned name is already taken by another title.
    pub failures: Vec<ItemFailure>,
}

/// Claims destination paths for titles. The first title to reach a path keeps it.
#[derive(Default)]
struct PathClaims(HashMap<PathBuf, String>);

impl PathClaims {
    /// `Some(owner)` when `path` already belongs to a different title.
    fn claim(&mut self, path: &Path, title: &str) -> Option<String> {
        match self.0.get(path) {
            Some(owner) if owner != title => Some(owner.clone()),
            Some(_) => None,
            None => {
                self.0.insert(path.to_path_buf(), title.to_string());
                None
            }
        }
    }
}

fn collision(title: &str, path: &Path, owner: &str) -> ItemFailure {
    ItemFailure {
        stage: FailureStage::Expansion,
        title: title.to_string(),
        subject: object_key(path),
        reason: format!("name collides with title {owner:?}"),
    }
}

pub fn expand(bundle: &MetadataBundle, plan: &RunPlan) -> Expansion {
    let mut out = Expansion::default();
    let mut claims = PathClaims::default();

    for media in &bundle.resolved {
        let count = bundle.variant_count(&media.title);
        let relative_path = media_path(&media.title, media.variant_index, count);
        if let Some(owner) = claims.claim(&relative_path, &media.title) {
            tracing::warn!(title = %media.title, %owner, "lecture name collision; skipping");
            out.failures.push(collision(&media.title, &relative_path, &owner));
            continue;
        }
        out.lectures.push(Task {
            identity: media_stem(&media.title, media.variant_index, count),
            kind: plan.kind,
            payload: Payload::Lecture(LectureItem {
                source: media.download_uri.clone(),
                protocol: bundle.protocol,
                relative_path,
                time_limit: plan.fetch_limit,
            }),
        });
    }

    if !plan.process_slides {
        return out;
    }
    if !bundle.protocol.supports_slides() {
        tracing::info!(protocol = %bundle.protocol, "player has no slides; skipping slide capture");
        return out;
    }

    for lecture in &bundle.lectures {
        let Some(refs) = bundle.slides.get(&lecture.title) else {
            continue;
        };
        let dir = slide_dir(&lecture.title);
        if let Some(owner) = claims.claim(&dir, &lecture.title) {
            tracing::warn!(title = %lecture.title, %owner, "slide directory collision; skipping");
            out.failures.push(collision(&lecture.title, &dir, &owner));
            continue;
        }
        let mut items: Vec<SlideItem> = Vec::with_capacity(refs.len());
        for slide in refs {
            let name = match slide_file_name(&slide.timestamp) {
                Ok(name) => name,
                Err(e) => {
                    out.failures.push(ItemFailure {
                        stage: FailureStage::Expansion,
                        title: lecture.title.clone(),
                        subject: slide.thumbnail_url.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            let relative_path = dir.join(name);
            if items.iter().any(|i| i.relative_path == relative_path) {
                continue;
            }
            items.push(SlideItem {
                relative_path,
                thumbnail_url: slide.thumbnail_url.clone(),
            });
        }
        if plan.test_run {
            items.truncate(plan.test_run_items);
        }
        out.slides.push(Task {
            identity: object_key(&dir),
            kind: plan.kind,
            payload: Payload::Slides(SlideSet {
                relative_dir: dir,
                items,
            }),
        });
    }
    out
}
