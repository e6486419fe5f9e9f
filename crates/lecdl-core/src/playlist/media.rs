//! Media-playlist scanning: segment lists and final media paths.

use regex::Regex;
use std::sync::OnceLock;
use url::Url;

pub const SEGMENT_EXTENSION: &str = ".ts";

fn media_path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?:\.\./)*([^\s"'#]+\.mp4)"#).expect("static pattern"))
}

/// Relative path of the `.mp4` a Matterhorn sub-playlist points at, without leading `../`.
pub fn find_media_path(body: &str) -> Option<String> {
    media_path_re()
        .captures(body)
        .map(|caps| caps[1].trim_start_matches("../").to_string())
}

/// Segment lines of a media playlist, resolved against the playlist's own URL, in listed order.
pub fn segment_uris(playlist_url: &str, body: &str) -> Result<Vec<String>, url::ParseError> {
    let base = Url::parse(playlist_url)?;
    body.lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#') && is_segment(line))
        .map(|line| base.join(line).map(String::from))
        .collect()
}

/// A media playlist lists at least one segment or `#EXTINF` entry.
pub fn is_media_playlist(body: &str) -> bool {
    body.lines()
        .map(str::trim)
        .any(|line| line.starts_with("#EXTINF") || (!line.starts_with('#') && is_segment(line)))
}

fn is_segment(line: &str) -> bool {
    let path = line.split(['?', '#']).next().unwrap_or(line);
    path.ends_with(SEGMENT_EXTENSION)
}
