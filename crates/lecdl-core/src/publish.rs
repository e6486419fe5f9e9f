//! Republishing of local artifacts to the remote store.
//!
//! Remote access sits behind [`Publisher`]. The built-in implementation
//! copies into a directory where the remote store is mounted. Objects
//! uploaded from a time-limited fetch carry the same `.partial` marker as
//! local artifacts, so a later full upload replaces them.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::storage::{artifact_state, partial_marker, temp_path, ArtifactState};

pub trait Publisher: Send + Sync {
    /// State of the object under `key` (`/`-separated).
    fn state(&self, key: &str) -> Result<ArtifactState>;

    /// Upload the local file at `source` under `key`, replacing any previous object.
    /// `partial` records that the source was cut short by a time limit.
    fn put(&self, key: &str, source: &Path, partial: bool) -> Result<()>;
}

/// Publishes into a mounted directory, writing through `.part` + rename.
#[derive(Debug, Clone)]
pub struct DirectoryPublisher {
    root: PathBuf,
}

impl DirectoryPublisher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn target(&self, key: &str) -> PathBuf {
        key.split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |path, part| path.join(part))
    }
}

impl Publisher for DirectoryPublisher {
    fn state(&self, key: &str) -> Result<ArtifactState> {
        Ok(artifact_state(&self.target(key)))
    }

    fn put(&self, key: &str, source: &Path, partial: bool) -> Result<()> {
        let target = self.target(key);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let tmp = temp_path(&target);
        std::fs::copy(source, &tmp).with_context(|| {
            format!("failed to copy {} to {}", source.display(), tmp.display())
        })?;
        std::fs::rename(&tmp, &target).with_context(|| {
            format!("failed to rename {} to {}", tmp.display(), target.display())
        })?;
        let marker = partial_marker(&target);
        if partial {
            std::fs::File::create(&marker)
                .with_context(|| format!("failed to write {}", marker.display()))?;
        } else if marker.exists() {
            std::fs::remove_file(&marker)
                .with_context(|| format!("failed to remove {}", marker.display()))?;
        }
        tracing::info!(%key, partial, "published");
        Ok(())
    }
}
