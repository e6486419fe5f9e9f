//! Network-capture parser: Chrome net-log → observed playlist URLs.
//!
//! The browser is killed once scraping finishes, so the log frequently lacks
//! its closing `]}`. Parsing is strict first; on failure exactly one repair
//! (cut after the last complete event, re-close) is attempted. A document
//! that fails both is fatal and the capture has to be taken again.

mod parse;
mod repair;

use std::path::Path;
use thiserror::Error;

use crate::media::StreamObservation;

use parse::NetLog;

/// Substring marking an adaptive-bitrate playlist request.
pub const PLAYLIST_MARKER: &str = ".m3u8";

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("read capture {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("capture is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    #[error("capture is truncated before its events array and cannot be repaired: {strict}")]
    NoEvents { strict: serde_json::Error },
    #[error("capture is unreadable even after repair (re-run the capture): {repaired}")]
    Unrepairable {
        strict: serde_json::Error,
        repaired: serde_json::Error,
    },
}

/// Parse a capture document and keep playlist requests issued by one of `origins`.
///
/// Observations are returned in document order.
pub fn parse_capture(raw: &[u8], origins: &[&str]) -> Result<Vec<StreamObservation>, CaptureError> {
    let log = load(raw)?;
    let observations: Vec<StreamObservation> = log
        .events
        .iter()
        .filter_map(|event| event.params.as_ref())
        .filter(|params| params.isolation_key().is_some_and(|key| from_origin(key, origins)))
        .filter_map(|params| params.url())
        .filter(|url| url.contains(PLAYLIST_MARKER))
        .map(|url| StreamObservation {
            url: url.to_string(),
        })
        .collect();
    tracing::debug!(
        events = log.events.len(),
        playlists = observations.len(),
        "parsed network capture"
    );
    Ok(observations)
}

/// Read and parse a capture file.
pub fn read_capture(path: &Path, origins: &[&str]) -> Result<Vec<StreamObservation>, CaptureError> {
    let raw = std::fs::read(path).map_err(|source| CaptureError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_capture(&raw, origins)
}

fn load(raw: &[u8]) -> Result<NetLog, CaptureError> {
    let strict = match serde_json::from_slice::<NetLog>(raw) {
        Ok(log) => return Ok(log),
        Err(e) => e,
    };
    tracing::debug!("strict capture parse failed ({strict}); repairing truncated log");

    let doc = std::str::from_utf8(raw)?;
    let Some(repaired) = repair::close_truncated(doc) else {
        return Err(CaptureError::NoEvents { strict });
    };
    let log = serde_json::from_str::<NetLog>(&repaired)
        .map_err(|repaired| CaptureError::Unrepairable { strict, repaired })?;
    tracing::info!(events = log.events.len(), "recovered truncated network capture");
    Ok(log)
}

/// Isolation keys are either a bare origin or `"<top-frame> <frame>"` pairs.
fn from_origin(key: &str, origins: &[&str]) -> bool {
    key.split_whitespace().any(|part| origins.contains(&part))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MH: &str = "https://matterhorn.dce.harvard.edu";
    const PP: &str = "https://harvard.hosted.panopto.com";
    const ORIGINS: [&str; 2] = [MH, PP];

    fn event(key: &str, url: &str) -> String {
        format!(
            r#"{{"params":{{"network_isolation_key":"{key}","url":"{url}"}},"phase":0,"type":2}}"#
        )
    }

    fn log_of(events: &[String]) -> String {
        format!(
            r#"{{"constants":{{"logEventTypes":{{"A":1}}}},"events":[{}]}}"#,
            events.join(",\n")
        )
    }

    fn sample_events() -> Vec<String> {
        vec![
            event(MH, "https://cdn.example/engage-player/b1/x/master.m3u8"),
            event("https://evil.example", "https://cdn.example/engage-player/b9/x/master.m3u8"),
            event(MH, "https://cdn.example/engage-player/b1/x/video.mp4"),
            r#"{"phase":1,"type":3}"#.to_string(),
            r#"{"params":{"url":"https://nokey.example/a.m3u8"}}"#.to_string(),
            r#"{"params":{"network_isolation_key":7,"url":["odd"]}}"#.to_string(),
            event(
                &format!("{PP} {PP}"),
                "https://cdn.example/sessions/b2/s2.hls/master.m3u8",
            ),
        ]
    }

    #[test]
    fn keeps_only_known_origin_playlists() {
        let doc = log_of(&sample_events());
        let obs = parse_capture(doc.as_bytes(), &ORIGINS).unwrap();
        let urls: Vec<_> = obs.iter().map(|o| o.url.as_str()).collect();
        assert_eq!(
            urls,
            [
                "https://cdn.example/engage-player/b1/x/master.m3u8",
                "https://cdn.example/sessions/b2/s2.hls/master.m3u8",
            ]
        );
    }

    #[test]
    fn no_false_positive_origins() {
        let doc = log_of(&sample_events());
        for obs in parse_capture(doc.as_bytes(), &[MH]).unwrap() {
            assert!(obs.url.contains("engage-player/b1"));
        }
        assert!(parse_capture(doc.as_bytes(), &["https://other.example"])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn repairs_log_missing_closing_tokens() {
        let full = log_of(&sample_events());
        let truncated = format!("{},\n", &full[..full.len() - 2]);
        let obs = parse_capture(truncated.as_bytes(), &ORIGINS).unwrap();
        assert_eq!(obs, parse_capture(full.as_bytes(), &ORIGINS).unwrap());
    }

    #[test]
    fn repair_of_well_formed_log_is_a_no_op() {
        let full = log_of(&sample_events());
        let repaired = repair::close_truncated(&full).unwrap();
        assert_eq!(repaired, full);
        let a = parse_capture(full.as_bytes(), &ORIGINS).unwrap();
        let b = parse_capture(repaired.as_bytes(), &ORIGINS).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn repair_drops_partial_trailing_event() {
        let full = log_of(&sample_events());
        let cut = format!(
            "{},\n{{\"params\":{{\"network_isolation_key\":\"{MH}\",\"url\":\"https://cdn",
            &full[..full.len() - 2]
        );
        let obs = parse_capture(cut.as_bytes(), &ORIGINS).unwrap();
        assert_eq!(obs.len(), 2);
    }

    #[test]
    fn unrepairable_capture_is_fatal() {
        let err = parse_capture(br#"{"constants":{"a":"#, &ORIGINS).unwrap_err();
        assert!(matches!(err, CaptureError::NoEvents { .. }));

        // Structurally closable but still not valid JSON.
        let err = parse_capture(br#"{"events":[{"a":1} {"b":2}"#, &ORIGINS).unwrap_err();
        assert!(matches!(err, CaptureError::Unrepairable { .. }));
    }

    #[test]
    fn read_capture_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net_log.json");
        std::fs::write(&path, log_of(&sample_events())).unwrap();
        assert_eq!(read_capture(&path, &ORIGINS).unwrap().len(), 2);
        assert!(matches!(
            read_capture(&dir.path().join("missing.json"), &ORIGINS),
            Err(CaptureError::Read { .. })
        ));
    }
}
