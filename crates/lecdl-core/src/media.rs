//! Records flowing through a resolution pass.

use serde::{Deserialize, Serialize};

/// A lecture listed on the course's player page. Titles are unique per course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LectureRecord {
    pub title: String,
    pub page_url: String,
}

/// One adaptive-bitrate playlist URL seen in the network capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamObservation {
    pub url: String,
}

/// A title joined to the playlist URLs observed for its underlying asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelatedMedia {
    pub title: String,
    /// Observation order, duplicates removed.
    pub candidate_urls: Vec<String>,
}

/// One camera/perspective of a title, resolved to something fetchable.
///
/// For Matterhorn the URI is a single media file; for Panopto it is a media
/// playlist whose segments are walked by the fetch stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMedia {
    pub title: String,
    pub variant_index: usize,
    pub download_uri: String,
}

/// A slide thumbnail shown at `timestamp` (`[H:]M:S`) of a lecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideRef {
    pub timestamp: String,
    pub thumbnail_url: String,
}

/// Which stage dropped an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Correlation,
    Resolution,
    Expansion,
}

/// A title, variant or item that could not be resolved. Collected, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub stage: FailureStage,
    pub title: String,
    /// URL or identifier the failure is about.
    pub subject: String,
    pub reason: String,
}
