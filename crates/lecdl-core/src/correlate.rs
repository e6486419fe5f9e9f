//! Identifier correlation: page titles ↔ captured playlist URLs.
//!
//! Stream URLs look like `https://<cdn>/<kind>/<baseID>/<sessionID…>/…`.
//! Every observation of one underlying asset shares the `baseID`; Panopto
//! additionally puts the 36-character session id at the start of the next
//! segment. Record URLs carry their id in the `id` query parameter: the
//! `baseID` for Matterhorn, the session id for Panopto.

use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;
use url::Url;

use crate::media::{CorrelatedMedia, FailureStage, ItemFailure, LectureRecord, StreamObservation};
use crate::protocol::Protocol;

const SESSION_ID_LEN: usize = 36;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CorrelateError {
    #[error("title {0:?} appears more than once on the player page")]
    DuplicateTitle(String),
}

/// Why one title could not be joined to any observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrelationFailure {
    MissingRecordId { page_url: String },
    UnknownSession { session_id: String },
    UnknownBase { base_id: String },
}

impl CorrelationFailure {
    pub fn into_item(self, title: &str) -> ItemFailure {
        let (subject, reason) = match self {
            CorrelationFailure::MissingRecordId { page_url } => {
                (page_url, "page URL carries no id parameter")
            }
            CorrelationFailure::UnknownSession { session_id } => {
                (session_id, "session id not observed in the capture")
            }
            CorrelationFailure::UnknownBase { base_id } => {
                (base_id, "resource id not observed in the capture")
            }
        };
        ItemFailure {
            stage: FailureStage::Correlation,
            title: title.to_string(),
            subject,
            reason: reason.to_string(),
        }
    }
}

/// Result of one correlation pass. Both collections are ordered by title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Correlation {
    pub media: BTreeMap<String, CorrelatedMedia>,
    pub failures: BTreeMap<String, CorrelationFailure>,
}

/// Resource-level id of a stream URL (path segment 2).
pub fn base_id(url: &str) -> Option<String> {
    path_segment(url, 1)
}

/// Session-level id of a stream URL (first 36 characters of path segment 3).
pub fn session_id(url: &str) -> Option<String> {
    path_segment(url, 2).map(|s| s.chars().take(SESSION_ID_LEN).collect())
}

/// Id embedded in a record's page URL.
pub fn record_id(page_url: &str) -> Option<String> {
    let url = Url::parse(page_url).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == "id")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

fn path_segment(url: &str, index: usize) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.nth(index)?;
    (!segment.is_empty()).then(|| segment.to_string())
}

/// Join records to observations.
///
/// Observation order is significant twice: it fixes the order of each title's
/// candidate URLs (and so its perspective numbering), and for Panopto a
/// session id seen under several base ids maps to the one observed last.
pub fn correlate(
    records: &[LectureRecord],
    observations: &[StreamObservation],
    protocol: Protocol,
) -> Result<Correlation, CorrelateError> {
    let mut seen = HashSet::new();
    for record in records {
        if !seen.insert(record.title.as_str()) {
            return Err(CorrelateError::DuplicateTitle(record.title.clone()));
        }
    }

    let mut by_base: HashMap<String, Vec<String>> = HashMap::new();
    for obs in observations {
        let Some(base) = base_id(&obs.url) else {
            tracing::debug!(url = %obs.url, "observation without a resource id");
            continue;
        };
        let urls = by_base.entry(base).or_default();
        if !urls.contains(&obs.url) {
            urls.push(obs.url.clone());
        }
    }

    let session_to_base: HashMap<String, String> = match protocol {
        Protocol::Matterhorn => HashMap::new(),
        Protocol::Panopto => observations
            .iter()
            .filter_map(|obs| Some((session_id(&obs.url)?, base_id(&obs.url)?)))
            .collect(),
    };

    let mut out = Correlation::default();
    for record in records {
        let joined = lookup(record, protocol, &by_base, &session_to_base);
        match joined {
            Ok(urls) => {
                out.media.insert(
                    record.title.clone(),
                    CorrelatedMedia {
                        title: record.title.clone(),
                        candidate_urls: urls.clone(),
                    },
                );
            }
            Err(failure) => {
                tracing::warn!(title = %record.title, ?failure, "title not found in capture");
                out.failures.insert(record.title.clone(), failure);
            }
        }
    }
    Ok(out)
}

fn lookup<'a>(
    record: &LectureRecord,
    protocol: Protocol,
    by_base: &'a HashMap<String, Vec<String>>,
    session_to_base: &HashMap<String, String>,
) -> Result<&'a Vec<String>, CorrelationFailure> {
    let id = record_id(&record.page_url).ok_or_else(|| CorrelationFailure::MissingRecordId {
        page_url: record.page_url.clone(),
    })?;
    let base = match protocol {
        Protocol::Matterhorn => id,
        Protocol::Panopto => session_to_base
            .get(&id)
            .cloned()
            .ok_or(CorrelationFailure::UnknownSession { session_id: id })?,
    };
    by_base
        .get(&base)
        .ok_or(CorrelationFailure::UnknownBase { base_id: base })
}
