//! Versioned record of one course's resolved metadata.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::media::{ItemFailure, LectureRecord, ResolvedMedia, SlideRef};
use crate::protocol::Protocol;

/// Bumped whenever [`MetadataBundle`] changes shape. Stored rows with another
/// version are ignored and recomputed.
pub const BUNDLE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataBundle {
    pub schema_version: u32,
    pub course_id: String,
    pub protocol: Protocol,
    /// Page metadata, in page order.
    pub lectures: Vec<LectureRecord>,
    /// Correlated candidate URLs per title.
    pub candidate_urls: BTreeMap<String, Vec<String>>,
    /// Resolved variants, grouped by title in page order.
    pub resolved: Vec<ResolvedMedia>,
    /// Slide references per title, in discovery order.
    #[serde(default)]
    pub slides: BTreeMap<String, Vec<SlideRef>>,
    /// Titles and variants that could not be resolved.
    #[serde(default)]
    pub failures: Vec<ItemFailure>,
}

impl MetadataBundle {
    pub fn new(course_id: &str, protocol: Protocol) -> Self {
        Self {
            schema_version: BUNDLE_SCHEMA_VERSION,
            course_id: course_id.to_string(),
            protocol,
            lectures: Vec::new(),
            candidate_urls: BTreeMap::new(),
            resolved: Vec::new(),
            slides: BTreeMap::new(),
            failures: Vec::new(),
        }
    }

    /// Number of resolved variants of `title`.
    pub fn variant_count(&self, title: &str) -> usize {
        self.resolved.iter().filter(|m| m.title == title).count()
    }

    /// Titles with at least one resolved variant.
    pub fn resolved_titles(&self) -> usize {
        self.lectures
            .iter()
            .filter(|l| self.variant_count(&l.title) > 0)
            .count()
    }
}
