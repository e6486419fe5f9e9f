//! File- and object-store-safe names and the destination layout.
//!
//! ```text
//! <root>/<title>.mp4                       single variant
//! <root>/<title> - perspective<N>.mp4      one of several variants
//! <root>/<title> slides/<HH>_<MM>_<SS>.jpg
//! ```

use std::path::PathBuf;
use thiserror::Error;

pub const MEDIA_EXTENSION: &str = "mp4";
pub const SLIDE_EXTENSION: &str = "jpg";

const INVALID_CHARS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Replace every character that is invalid in a file name with `_`.
pub fn clean_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if INVALID_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Stable identity of one variant of a title.
pub fn media_stem(title: &str, variant_index: usize, variant_count: usize) -> String {
    let title = clean_file_name(title);
    if variant_count > 1 {
        format!("{title} - perspective{variant_index}")
    } else {
        title
    }
}

/// Path of a media artifact relative to the destination root.
pub fn media_path(title: &str, variant_index: usize, variant_count: usize) -> PathBuf {
    PathBuf::from(format!(
        "{}.{MEDIA_EXTENSION}",
        media_stem(title, variant_index, variant_count)
    ))
}

/// Directory holding a title's slides, relative to the destination root.
pub fn slide_dir(title: &str) -> PathBuf {
    PathBuf::from(format!("{} slides", clean_file_name(title)))
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid slide timestamp {0:?}, expected [H:]M:S")]
pub struct TimestampError(pub String);

/// `"1:02:03"` → `01_02_03.jpg`, `"4:05"` → `00_04_05.jpg`.
pub fn slide_file_name(timestamp: &str) -> Result<String, TimestampError> {
    let invalid = || TimestampError(timestamp.to_string());
    let parts = timestamp
        .trim()
        .split(':')
        .map(|p| p.trim().parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;
    let (h, m, s) = match parts.as_slice() {
        [m, s] => (0, *m, *s),
        [h, m, s] => (*h, *m, *s),
        _ => return Err(invalid()),
    };
    Ok(format!("{h:02}_{m:02}_{s:02}.{SLIDE_EXTENSION}"))
}

/// Object-store key for a relative artifact path (`/`-separated on every platform).
pub fn object_key(relative: &std::path::Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
