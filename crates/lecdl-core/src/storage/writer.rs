//! Sequential writer for one artifact's temp file.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::{partial_marker, temp_path};

pub struct ArtifactWriter {
    file: BufWriter<File>,
    temp_path: PathBuf,
    written: u64,
}

impl ArtifactWriter {
    /// Create (truncating) the temp file for `final_path`, making parent directories as needed.
    pub fn create(final_path: &Path) -> Result<Self> {
        if let Some(parent) = final_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let temp_path = temp_path(final_path);
        let file = File::create(&temp_path)
            .with_context(|| format!("failed to create temp file: {}", temp_path.display()))?;
        Ok(Self {
            file: BufWriter::new(file),
            temp_path,
            written: 0,
        })
    }

    pub fn append(&mut self, data: &[u8]) -> Result<()> {
        self.file
            .write_all(data)
            .with_context(|| format!("write to {} failed", self.temp_path.display()))?;
        self.written += data.len() as u64;
        Ok(())
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Drop the temp file of a fetch that failed.
    pub fn discard(self) {
        let ArtifactWriter { file, temp_path, .. } = self;
        drop(file);
        if let Err(e) = std::fs::remove_file(&temp_path) {
            tracing::debug!(path = %temp_path.display(), "could not remove temp file: {}", e);
        }
    }

    /// Flush, sync and atomically rename the temp file to `final_path`.
    ///
    /// `partial` sets or clears the partial marker next to the artifact.
    pub fn finalize(self, final_path: &Path, partial: bool) -> Result<u64> {
        let file = self
            .file
            .into_inner()
            .map_err(|e| anyhow::anyhow!("flush {} failed: {}", self.temp_path.display(), e))?;
        file.sync_all().context("storage sync failed")?;
        drop(file);

        std::fs::rename(&self.temp_path, final_path).with_context(|| {
            format!(
                "failed to rename {} to {}",
                self.temp_path.display(),
                final_path.display()
            )
        })?;

        let marker = partial_marker(final_path);
        if partial {
            File::create(&marker)
                .with_context(|| format!("failed to write {}", marker.display()))?;
        } else if marker.exists() {
            std::fs::remove_file(&marker)
                .with_context(|| format!("failed to remove {}", marker.display()))?;
        }
        Ok(self.written)
    }
}
