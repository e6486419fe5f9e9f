//! The two backend players, their stream hosts, and player-page detection.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Backend video-serving system behind a course's player page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Record URLs carry the resource-level id; masters resolve to one `.mp4`.
    Matterhorn,
    /// Record URLs carry a session-level id; masters resolve to a `.ts` segment list.
    Panopto,
}

impl Protocol {
    pub const ALL: [Protocol; 2] = [Protocol::Matterhorn, Protocol::Panopto];

    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Matterhorn => "matterhorn",
            Protocol::Panopto => "panopto",
        }
    }

    /// Only the Panopto viewer exposes slide thumbnails.
    pub fn supports_slides(self) -> bool {
        matches!(self, Protocol::Panopto)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated per-backend settings.
#[derive(Debug, Clone)]
pub struct Backend {
    pub protocol: Protocol,
    /// Network isolation key of capture events issued by this player.
    pub origin: String,
    /// Matches the stable prefix of a stream URL that variant paths are appended to.
    pub base_prefix: Regex,
    /// Content of the player page's description meta tag.
    pub page_signature: String,
}

impl Backend {
    /// The base prefix of `url`, if it lives on this backend's stream host.
    pub fn base_prefix_of<'u>(&self, url: &'u str) -> Option<&'u str> {
        self.base_prefix.find(url).map(|m| m.as_str())
    }
}

/// One backend per protocol.
#[derive(Debug, Clone)]
pub struct Backends {
    pub matterhorn: Backend,
    pub panopto: Backend,
}

impl Backends {
    pub fn get(&self, protocol: Protocol) -> &Backend {
        match protocol {
            Protocol::Matterhorn => &self.matterhorn,
            Protocol::Panopto => &self.panopto,
        }
    }

    pub fn origins(&self) -> [&str; 2] {
        [self.matterhorn.origin.as_str(), self.panopto.origin.as_str()]
    }

    /// Infer the protocol from the player page's description meta content.
    pub fn detect(&self, description: Option<&str>) -> Result<Protocol, DetectError> {
        let checked = self.signature_list();
        let Some(found) = description.map(str::trim) else {
            return Err(DetectError::MissingDescription { checked });
        };
        Protocol::ALL
            .into_iter()
            .find(|p| self.get(*p).page_signature == found)
            .ok_or_else(|| DetectError::Unrecognized {
                found: found.to_string(),
                checked,
            })
    }

    fn signature_list(&self) -> String {
        Protocol::ALL
            .iter()
            .map(|p| format!("{} = {:?}", p, self.get(*p).page_signature))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DetectError {
    #[error("player page has no description meta tag (checked: {checked})")]
    MissingDescription { checked: String },
    #[error("unrecognized player page description {found:?} (checked: {checked})")]
    Unrecognized { found: String, checked: String },
}
