//! Per-graph and per-course run summaries.

use std::fmt;

use crate::media::ItemFailure;
use crate::protocol::Protocol;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Artifacts were already present; nothing ran.
    Cached,
    /// Ran to the end, or to its time limit when `partial`.
    Complete { partial: bool },
    /// No items to process.
    Empty,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub identity: String,
    pub status: TaskStatus,
    pub bytes: u64,
}

/// Outcomes of one graph execution, in task order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphReport {
    pub outcomes: Vec<TaskOutcome>,
}

impl GraphReport {
    fn count(&self, f: impl Fn(&TaskStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| f(&o.status)).count()
    }

    pub fn complete(&self) -> usize {
        self.count(|s| matches!(s, TaskStatus::Complete { partial: false }))
    }

    pub fn partial(&self) -> usize {
        self.count(|s| matches!(s, TaskStatus::Complete { partial: true }))
    }

    pub fn cached(&self) -> usize {
        self.count(|s| matches!(s, TaskStatus::Cached))
    }

    pub fn empty(&self) -> usize {
        self.count(|s| matches!(s, TaskStatus::Empty))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            TaskStatus::Failed(reason) => Some((o.identity.as_str(), reason.as_str())),
            _ => None,
        })
    }

    pub fn bytes(&self) -> u64 {
        self.outcomes.iter().map(|o| o.bytes).sum()
    }
}

impl fmt::Display for GraphReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} complete, {} partial, {} cached, {} empty, {} failed",
            self.complete(),
            self.partial(),
            self.cached(),
            self.empty(),
            self.failed().count()
        )
    }
}

/// Everything the CLI prints about one course.
#[derive(Debug, Clone)]
pub struct CourseReport {
    pub course_id: String,
    pub protocol: Protocol,
    /// Metadata came from the cache; no scraping happened.
    pub metadata_cached: bool,
    pub titles: usize,
    pub titles_resolved: usize,
    pub variants: usize,
    /// Correlation, resolution and expansion failures.
    pub failures: Vec<ItemFailure>,
    pub videos: GraphReport,
    /// `None` when slides were not requested or the player has none.
    pub slides: Option<GraphReport>,
}

impl CourseReport {
    /// Nothing failed at any stage.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
            && self.videos.failed().next().is_none()
            && self
                .slides
                .as_ref()
                .map_or(true, |s| s.failed().next().is_none())
    }
}

impl fmt::Display for CourseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "course {} ({}){}",
            self.course_id,
            self.protocol,
            if self.metadata_cached {
                ", metadata from cache"
            } else {
                ""
            }
        )?;
        writeln!(
            f,
            "  titles: {} resolved, {} failed ({} variants)",
            self.titles_resolved,
            self.titles.saturating_sub(self.titles_resolved),
            self.variants
        )?;
        writeln!(f, "  videos: {}", self.videos)?;
        if let Some(slides) = &self.slides {
            writeln!(f, "  slides: {}", slides)?;
        }
        for failure in &self.failures {
            let subject = if failure.subject.is_empty() {
                String::new()
            } else {
                format!(" [{}]", failure.subject)
            };
            writeln!(
                f,
                "  {:?} failure: {}{}: {}",
                failure.stage, failure.title, subject, failure.reason
            )?;
        }
        let graphs = std::iter::once(&self.videos).chain(self.slides.as_ref());
        for (identity, reason) in graphs.flat_map(|g| g.failed()) {
            writeln!(f, "  task failed: {identity}: {reason}")?;
        }
        Ok(())
    }
}
