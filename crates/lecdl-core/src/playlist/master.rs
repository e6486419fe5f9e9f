//! Master-playlist parsing and variant selection.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use super::ResolveError;

/// Marker of a stream-info line; its presence makes a playlist a master.
pub const STREAM_INF: &str = "#EXT-X-STREAM-INF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u64,
    pub height: u64,
}

impl Resolution {
    /// Saturates; dimensions come straight from the network.
    pub fn area(self) -> u64 {
        self.width.saturating_mul(self.height)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One stream-info entry and the relative path on the line after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantStream {
    pub resolution: Resolution,
    pub path: String,
}

fn resolution_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"RESOLUTION=(\d+)x(\d+)").expect("static pattern"))
}

pub fn is_master(body: &str) -> bool {
    body.contains(STREAM_INF)
}

/// Variants in playlist order. Blank lines between a stream-info line and its path are skipped.
pub fn parse_master(body: &str) -> Result<Vec<VariantStream>, ResolveError> {
    let mut variants = Vec::new();
    let mut lines = body.lines().map(str::trim);
    while let Some(line) = lines.next() {
        if !line.starts_with(STREAM_INF) {
            continue;
        }
        let caps = resolution_re()
            .captures(line)
            .ok_or_else(|| ResolveError::MissingResolution {
                line: line.to_string(),
            })?;
        let dim = |i: usize| {
            caps[i].parse::<u64>().map_err(|_| ResolveError::MissingResolution {
                line: line.to_string(),
            })
        };
        let resolution = Resolution {
            width: dim(1)?,
            height: dim(2)?,
        };
        let path = lines
            .by_ref()
            .find(|l| !l.is_empty())
            .filter(|l| !l.starts_with('#'))
            .ok_or(ResolveError::MissingVariantPath { resolution })?;
        variants.push(VariantStream {
            resolution,
            path: path.to_string(),
        });
    }
    Ok(variants)
}

/// Largest `width * height`; the first of equal areas wins.
pub fn select_best(variants: &[VariantStream]) -> Option<&VariantStream> {
    let mut best: Option<&VariantStream> = None;
    for v in variants {
        if best.map_or(true, |b| v.resolution.area() > b.resolution.area()) {
            best = Some(v);
        }
    }
    best
}
