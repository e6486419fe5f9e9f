//! Time-bounded fetches of resolved media and slides into the destination root.
//!
//! Media fetches check their elapsed time after every chunk. Once the limit
//! is exceeded the transfer stops, the bytes so far are kept at the final path
//! and the outcome is flagged partial. That is a success, not an error.

use anyhow::{Context, Result};
use std::path::Path;
use std::time::{Duration, Instant};

use crate::http::{Flow, HttpClient, StreamEnd};
use crate::playlist::segment_uris;
use crate::protocol::Protocol;
use crate::storage::ArtifactWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOutcome {
    pub bytes: u64,
    /// The time limit cut the transfer short.
    pub partial: bool,
}

/// Which image a slide was saved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideSource {
    HighRes,
    Thumbnail,
}

/// Fetch a resolved media URI: a direct file for Matterhorn, a segment walk for Panopto.
pub fn fetch_media(
    client: &dyn HttpClient,
    protocol: Protocol,
    source: &str,
    dest: &Path,
    limit: Duration,
) -> Result<FetchOutcome> {
    let outcome = match protocol {
        Protocol::Matterhorn => fetch_direct(client, source, dest, limit)?,
        Protocol::Panopto => fetch_segments(client, source, dest, limit)?,
    };
    if outcome.partial {
        tracing::warn!(
            dest = %dest.display(),
            bytes = outcome.bytes,
            limit_secs = limit.as_secs_f64(),
            "fetch hit its time limit; kept partial artifact"
        );
    } else {
        tracing::info!(dest = %dest.display(), bytes = outcome.bytes, "fetched");
    }
    Ok(outcome)
}

/// Stream one file to `dest`.
pub fn fetch_direct(
    client: &dyn HttpClient,
    url: &str,
    dest: &Path,
    limit: Duration,
) -> Result<FetchOutcome> {
    let started = Instant::now();
    let deadline = started + limit;
    let mut writer = ArtifactWriter::create(dest)?;
    let streamed = client.stream(url, Some(deadline), &mut |chunk| {
        writer.append(chunk)?;
        Ok(if started.elapsed() > limit {
            Flow::Stop
        } else {
            Flow::Continue
        })
    });
    let end = match streamed {
        Ok(end) => end,
        Err(e) => {
            writer.discard();
            return Err(e.context(format!("fetch {url}")));
        }
    };
    let partial = end == StreamEnd::Stopped;
    let bytes = writer.finalize(dest, partial)?;
    Ok(FetchOutcome { bytes, partial })
}

/// Concatenate the segments of a media playlist into `dest`, in listed order.
pub fn fetch_segments(
    client: &dyn HttpClient,
    playlist_url: &str,
    dest: &Path,
    limit: Duration,
) -> Result<FetchOutcome> {
    let started = Instant::now();
    let deadline = started + limit;
    let body = client.get_text(playlist_url)?;
    let segments = segment_uris(playlist_url, &body)
        .with_context(|| format!("invalid playlist URL {playlist_url}"))?;
    if segments.is_empty() {
        anyhow::bail!("media playlist {playlist_url} lists no segments");
    }
    tracing::debug!(%playlist_url, segments = segments.len(), "walking segments");

    let mut writer = ArtifactWriter::create(dest)?;
    let mut partial = false;
    for (i, segment) in segments.iter().enumerate() {
        if started.elapsed() > limit {
            tracing::debug!(done = i, total = segments.len(), "segment walk stopped");
            partial = true;
            break;
        }
        let streamed = client.stream(segment, Some(deadline), &mut |chunk| {
            writer.append(chunk)?;
            Ok(if started.elapsed() > limit {
                Flow::Stop
            } else {
                Flow::Continue
            })
        });
        let end = match streamed {
            Ok(end) => end,
            Err(e) => {
                writer.discard();
                return Err(e.context(format!("fetch segment {segment}")));
            }
        };
        if end == StreamEnd::Stopped {
            partial = true;
            break;
        }
    }
    let bytes = writer.finalize(dest, partial)?;
    Ok(FetchOutcome { bytes, partial })
}

/// Save one slide, preferring the high-resolution image next to the thumbnail.
///
/// The thumbnail must answer 200. The high-resolution URL is the thumbnail's
/// effective URL with `thumbs` replaced by `images`; if that does not answer
/// 200 the thumbnail itself is saved.
pub fn fetch_slide(client: &dyn HttpClient, thumbnail_url: &str, dest: &Path) -> Result<SlideSource> {
    let thumb = client.get(thumbnail_url)?;
    if thumb.status != 200 {
        anyhow::bail!("slide thumbnail {} returned HTTP {}", thumbnail_url, thumb.status);
    }
    let hi_url = thumb.effective_url.replace("thumbs", "images");
    let (source, body) = match client.get(&hi_url) {
        Ok(hi) if hi.status == 200 => (SlideSource::HighRes, hi.body),
        Ok(hi) => {
            tracing::debug!(%hi_url, status = hi.status, "no high-resolution slide; using thumbnail");
            (SlideSource::Thumbnail, thumb.body)
        }
        Err(e) => {
            tracing::debug!(%hi_url, error = %e, "high-resolution slide failed; using thumbnail");
            (SlideSource::Thumbnail, thumb.body)
        }
    };
    let mut writer = ArtifactWriter::create(dest)?;
    writer.append(&body)?;
    writer.finalize(dest, false)?;
    Ok(source)
}
