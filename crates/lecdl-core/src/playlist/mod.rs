//! Adaptive-bitrate playlist resolution: candidate playlist URLs → fetchable URIs.
//!
//! Each candidate is a separate camera/perspective. A master candidate is
//! reduced to its largest variant, then made absolute against the stream
//! host's base prefix:
//!
//! - Matterhorn: the variant is a sub-playlist naming one `.mp4`; the result
//!   is a direct file URL.
//! - Panopto: the variant playlist itself is the result; the fetch stage walks
//!   its `.ts` segments.

mod master;
mod media;
mod resolve;

pub use master::{is_master, parse_master, select_best, Resolution, VariantStream, STREAM_INF};
pub use media::{find_media_path, is_media_playlist, segment_uris, SEGMENT_EXTENSION};
pub use resolve::{resolve_best, resolve_candidate, ResolveError, TitleResolution};
