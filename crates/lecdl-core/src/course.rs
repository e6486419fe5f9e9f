//! Course identity derived from the target URL.

use std::fmt;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CourseError {
    #[error("invalid course URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("course URL {0:?} has no course id segment (expected /courses/<id>/...)")]
    MissingId(String),
}

/// Stable identity of a course: the second path segment of its URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CourseId(String);

impl CourseId {
    pub fn from_url(course_url: &str) -> Result<Self, CourseError> {
        let url = Url::parse(course_url).map_err(|e| CourseError::InvalidUrl {
            url: course_url.to_string(),
            reason: e.to_string(),
        })?;
        url.path_segments()
            .and_then(|mut segments| segments.nth(1))
            .filter(|id| !id.is_empty())
            .map(|id| CourseId(id.to_string()))
            .ok_or_else(|| CourseError::MissingId(course_url.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key of this course's metadata bundle in the cache store.
    pub fn cache_key(&self) -> String {
        format!("course:{}", self.0)
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
