//! Boundary to the browser helper that logs in and scrapes a course.
//!
//! Login (including out-of-band two-factor confirmation), page navigation
//! and HTML scraping happen outside this crate. The engine receives the
//! player page description, the lecture list, slide references and the raw
//! network capture taken while the player pages were open.

mod command;

pub use command::CommandScraper;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::media::{LectureRecord, SlideRef};

/// What one scrape of a course produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapedCourse {
    /// Content of the player page's description meta tag.
    pub player_description: Option<String>,
    /// Lectures in page order.
    pub lectures: Vec<LectureRecord>,
    /// Slide references per title, in discovery order.
    pub slides: BTreeMap<String, Vec<SlideRef>>,
    /// Raw network capture document.
    pub capture: Vec<u8>,
}

/// JSON printed on stdout by the helper program.
#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct HelperOutput {
    #[serde(default)]
    pub player_description: Option<String>,
    pub lectures: Vec<LectureRecord>,
    #[serde(default)]
    pub slides: BTreeMap<String, Vec<SlideRef>>,
}

/// Interface for the interactive login + scrape step.
///
/// Implementations block for as long as login and scraping take; callers on
/// an async runtime run them through `spawn_blocking`.
pub trait CourseScraper: Send {
    fn scrape(&mut self, course_url: &str) -> Result<ScrapedCourse>;
}
