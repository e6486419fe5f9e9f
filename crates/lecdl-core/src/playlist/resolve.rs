use thiserror::Error;
use url::Url;

use crate::config::NonMasterPolicy;
use crate::http::HttpClient;
use crate::media::{FailureStage, ItemFailure, ResolvedMedia};
use crate::protocol::{Backend, Protocol};

use super::master::{is_master, parse_master, select_best, Resolution};
use super::media::{find_media_path, is_media_playlist};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("title has no candidate playlist URLs")]
    EmptyCandidates,
    #[error("fetch {url}: {message}")]
    Fetch { url: String, message: String },
    #[error("stream-info line without RESOLUTION: {line}")]
    MissingResolution { line: String },
    #[error("stream-info {resolution} is not followed by a variant path")]
    MissingVariantPath { resolution: Resolution },
    #[error("master playlist lists no variants")]
    NoVariants,
    #[error("{url} does not match the {protocol} base prefix")]
    NoBasePrefix { protocol: Protocol, url: String },
    #[error("sub-playlist {url} names no .mp4 file")]
    NoMediaPath { url: String },
    #[error("{url} is neither a master nor a media playlist")]
    NotAPlaylist { url: String },
}

/// Everything learned about one title's candidates.
#[derive(Debug, Default)]
pub struct TitleResolution {
    /// Resolved variants, numbered consecutively in candidate order.
    pub media: Vec<ResolvedMedia>,
    pub failures: Vec<ItemFailure>,
    /// Non-master candidates dropped under [`NonMasterPolicy::Skip`].
    pub skipped: usize,
}

/// Resolve a single candidate playlist URL.
///
/// `Ok(None)` means the candidate is not a master and the policy skips it.
pub fn resolve_candidate(
    client: &dyn HttpClient,
    url: &str,
    backend: &Backend,
    policy: NonMasterPolicy,
) -> Result<Option<String>, ResolveError> {
    let body = fetch_text(client, url)?;
    if !is_master(&body) {
        return match policy {
            NonMasterPolicy::Skip => {
                tracing::debug!(%url, "not a master playlist; skipping");
                Ok(None)
            }
            NonMasterPolicy::Passthrough if is_media_playlist(&body) => Ok(Some(url.to_string())),
            NonMasterPolicy::Passthrough => Err(ResolveError::NotAPlaylist {
                url: url.to_string(),
            }),
        };
    }

    let variants = parse_master(&body)?;
    let best = select_best(&variants).ok_or(ResolveError::NoVariants)?;
    tracing::debug!(%url, resolution = %best.resolution, path = %best.path, "selected variant");

    let base = backend
        .base_prefix_of(url)
        .ok_or_else(|| ResolveError::NoBasePrefix {
            protocol: backend.protocol,
            url: url.to_string(),
        })?;

    match backend.protocol {
        Protocol::Matterhorn => {
            let sub_url = absolute(base, &best.path.replace("../", ""));
            let sub_body = fetch_text(client, &sub_url)?;
            let media_path =
                find_media_path(&sub_body).ok_or(ResolveError::NoMediaPath { url: sub_url })?;
            Ok(Some(absolute(base, &media_path)))
        }
        Protocol::Panopto => Ok(Some(absolute(base, &best.path))),
    }
}

/// Resolve every candidate of one title independently.
///
/// A failing candidate is recorded and its siblings still resolve. Two
/// candidates that end at the same URI count as one variant.
pub fn resolve_best(
    client: &dyn HttpClient,
    title: &str,
    candidates: &[String],
    backend: &Backend,
    policy: NonMasterPolicy,
) -> TitleResolution {
    let mut out = TitleResolution::default();
    if candidates.is_empty() {
        out.failures.push(failure(title, "", &ResolveError::EmptyCandidates));
        return out;
    }

    for candidate in candidates {
        match resolve_candidate(client, candidate, backend, policy) {
            Ok(Some(uri)) => {
                if out.media.iter().any(|m| m.download_uri == uri) {
                    tracing::debug!(%title, %uri, "duplicate variant");
                    continue;
                }
                out.media.push(ResolvedMedia {
                    title: title.to_string(),
                    variant_index: out.media.len(),
                    download_uri: uri,
                });
            }
            Ok(None) => out.skipped += 1,
            Err(e) => {
                tracing::warn!(%title, %candidate, error = %e, "candidate not resolved");
                out.failures.push(failure(title, candidate, &e));
            }
        }
    }
    out
}

fn failure(title: &str, subject: &str, err: &ResolveError) -> ItemFailure {
    ItemFailure {
        stage: FailureStage::Resolution,
        title: title.to_string(),
        subject: subject.to_string(),
        reason: err.to_string(),
    }
}

fn fetch_text(client: &dyn HttpClient, url: &str) -> Result<String, ResolveError> {
    client.get_text(url).map_err(|e| ResolveError::Fetch {
        url: url.to_string(),
        message: format!("{e:#}"),
    })
}

/// Variant paths are appended to the base prefix unless already absolute.
fn absolute(base: &str, path: &str) -> String {
    if Url::parse(path).is_ok() {
        path.to_string()
    } else {
        format!("{base}{}", path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LecdlConfig;
    use crate::http::fake::FakeHttp;
    use crate::protocol::Backends;

    const MH_BASE: &str = "https://dvgni8clk4vbh.cloudfront.net/engage-player/base1/";
    const PP_BASE: &str = "https://d2y36twrtb17ty.cloudfront.net/sessions/base2/sess2.hls/";

    fn backends() -> Backends {
        LecdlConfig::default().backends().unwrap()
    }

    fn master(entries: &[(&str, &str)]) -> String {
        let mut s = String::from("#EXTM3U\n");
        for (res, path) in entries {
            s.push_str(&format!("#EXT-X-STREAM-INF:BANDWIDTH=1,RESOLUTION={res}\n{path}\n"));
        }
        s
    }

    #[test]
    fn matterhorn_resolves_to_direct_mp4() {
        let cam = format!("{MH_BASE}cam0/master.m3u8");
        let http = FakeHttp::new()
            .with(
                &cam,
                master(&[("640x360", "../cam0/360.m3u8"), ("1280x720", "../cam0/720.m3u8")]),
            )
            .with(
                &format!("{MH_BASE}cam0/720.m3u8"),
                "#EXTM3U\n#EXTINF:3600,\n../presenter/720p.mp4\n",
            );
        let b = backends();
        let uri = resolve_candidate(&http, &cam, &b.matterhorn, NonMasterPolicy::Skip).unwrap();
        assert_eq!(uri, Some(format!("{MH_BASE}presenter/720p.mp4")));
        assert_eq!(http.hits(&format!("{MH_BASE}cam0/360.m3u8")), 0);
    }

    #[test]
    fn panopto_resolves_to_variant_playlist() {
        let url = format!("{PP_BASE}master.m3u8");
        let http = FakeHttp::new().with(
            &url,
            master(&[
                ("640x360", "360/index.m3u8"),
                ("1280x720", "720/index.m3u8"),
                ("960x540", "540/index.m3u8"),
            ]),
        );
        let b = backends();
        let uri = resolve_candidate(&http, &url, &b.panopto, NonMasterPolicy::Skip).unwrap();
        assert_eq!(uri, Some(format!("{PP_BASE}720/index.m3u8")));
    }

    #[test]
    fn non_master_policy() {
        let url = format!("{PP_BASE}720/index.m3u8");
        let html = format!("{PP_BASE}page.m3u8");
        let http = FakeHttp::new()
            .with(&url, "#EXTM3U\n#EXTINF:10,\n0.ts\n")
            .with(&html, "<html></html>");
        let b = backends();
        assert_eq!(
            resolve_candidate(&http, &url, &b.panopto, NonMasterPolicy::Skip).unwrap(),
            None
        );
        assert_eq!(
            resolve_candidate(&http, &url, &b.panopto, NonMasterPolicy::Passthrough).unwrap(),
            Some(url.clone())
        );
        assert!(matches!(
            resolve_candidate(&http, &html, &b.panopto, NonMasterPolicy::Passthrough),
            Err(ResolveError::NotAPlaylist { .. })
        ));
    }

    #[test]
    fn base_prefix_mismatch_fails_candidate() {
        let url = "https://elsewhere.example/sessions/x/y/master.m3u8";
        let http = FakeHttp::new().with(url, master(&[("640x360", "a.m3u8")]));
        let b = backends();
        assert!(matches!(
            resolve_candidate(&http, url, &b.panopto, NonMasterPolicy::Skip),
            Err(ResolveError::NoBasePrefix { protocol: Protocol::Panopto, .. })
        ));
    }

    #[test]
    fn sibling_failures_do_not_abort_title() {
        let good0 = format!("{PP_BASE}a/master.m3u8");
        let bad = format!("{PP_BASE}b/master.m3u8");
        let missing = format!("{PP_BASE}c/master.m3u8");
        let good1 = format!("{PP_BASE}d/master.m3u8");
        let http = FakeHttp::new()
            .with(&good0, master(&[("640x360", "a/360.m3u8")]))
            .with(&bad, "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1\nb.m3u8\n")
            .with(&good1, master(&[("1920x1080", "d/1080.m3u8")]));
        let b = backends();
        let candidates = vec![good0, bad.clone(), missing.clone(), good1];
        let r = resolve_best(&http, "Lecture", &candidates, &b.panopto, NonMasterPolicy::Skip);

        assert_eq!(r.media.len(), 2);
        assert_eq!(r.media[0].variant_index, 0);
        assert_eq!(r.media[0].download_uri, format!("{PP_BASE}a/360.m3u8"));
        assert_eq!(r.media[1].variant_index, 1);
        assert_eq!(r.media[1].download_uri, format!("{PP_BASE}d/1080.m3u8"));
        assert_eq!(r.failures.len(), 2);
        assert_eq!(r.failures[0].subject, bad);
        assert!(r.failures[0].reason.contains("RESOLUTION"));
        assert_eq!(r.failures[1].subject, missing);
        assert!(r.failures[1].reason.contains("404"));
    }

    #[test]
    fn empty_candidates_and_duplicate_uris() {
        let b = backends();
        let http = FakeHttp::new();
        let r = resolve_best(&http, "Ghost", &[], &b.panopto, NonMasterPolicy::Skip);
        assert!(r.media.is_empty());
        assert_eq!(r.failures.len(), 1);
        assert_eq!(r.failures[0].stage, FailureStage::Resolution);

        let a = format!("{PP_BASE}master.m3u8");
        let a2 = format!("{PP_BASE}master.m3u8?again=1");
        let body = master(&[("640x360", "360/index.m3u8")]);
        let http = FakeHttp::new().with(&a, body.clone()).with(&a2, body);
        let r = resolve_best(&http, "Twice", &[a, a2], &b.panopto, NonMasterPolicy::Skip);
        assert_eq!(r.media.len(), 1);
        assert!(r.failures.is_empty());
    }
}
