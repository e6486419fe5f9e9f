//! Artifact files on the local destination root.
//!
//! Bytes land in `<path>.part` and are renamed into place when the fetch
//! ends, including when it ends early on its time limit. An early end also
//! leaves a `<path>.partial` marker next to the artifact so a later full run
//! knows to fetch it again.

mod writer;

pub use writer::ArtifactWriter;

use std::path::{Path, PathBuf};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Marker suffix for artifacts cut short by their time limit.
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Path for the temp file: appends `.part` to the final path (e.g. `a.mp4` → `a.mp4.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    with_suffix(final_path, TEMP_SUFFIX)
}

pub fn partial_marker(final_path: &Path) -> PathBuf {
    with_suffix(final_path, PARTIAL_SUFFIX)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut o = path.as_os_str().to_owned();
    o.push(suffix);
    PathBuf::from(o)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactState {
    Missing,
    /// Present but cut short by a time limit.
    Partial,
    Complete,
}

pub fn artifact_state(final_path: &Path) -> ArtifactState {
    if !final_path.is_file() {
        ArtifactState::Missing
    } else if partial_marker(final_path).exists() {
        ArtifactState::Partial
    } else {
        ArtifactState::Complete
    }
}
