//! Tasks produced by expansion and consumed by the executor.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::protocol::Protocol;

/// What a task does with its item(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Fetch into the local destination root.
    Fetch,
    /// Fetch (if not already local), then copy to the remote store.
    Publish,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskKind::Fetch => "fetch",
            TaskKind::Publish => "publish",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Sanitized, deterministic name; also the task's object key.
    pub identity: String,
    pub kind: TaskKind,
    pub payload: Payload,
}

impl Task {
    pub fn item_count(&self) -> usize {
        match &self.payload {
            Payload::Lecture(_) => 1,
            Payload::Slides(set) => set.items.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// One variant of one title.
    Lecture(LectureItem),
    /// All slides of one title.
    Slides(SlideSet),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LectureItem {
    pub source: String,
    pub protocol: Protocol,
    /// Relative to the destination root.
    pub relative_path: PathBuf,
    pub time_limit: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideSet {
    pub relative_dir: PathBuf,
    pub items: Vec<SlideItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideItem {
    pub relative_path: PathBuf,
    pub thumbnail_url: String,
}
