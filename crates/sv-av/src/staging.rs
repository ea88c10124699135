//! Per-job staging workspaces.
//!
//! A [`StagingArea`] owns one freshly created, uniquely named temporary
//! directory. Uploaded assets are written to paths derived only from their
//! kind and zero-based index, so the engine can address them by
//! `(kind, index)`. The directory and everything in it is removed when the
//! area is dropped, which covers success, every error branch, and a
//! handler future that is abandoned mid-write.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sv_core::{Error, JobId, Result};
use tempfile::TempDir;

/// File name of the encoded artifact inside the workspace.
const OUTPUT_FILE: &str = "output.mp4";

/// What an uploaded asset is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Audio,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Image => "image",
            AssetKind::Audio => "audio",
        }
    }

    /// Extension used for staged files. ffmpeg probes content, so this only
    /// needs to be stable.
    fn extension(&self) -> &'static str {
        match self {
            AssetKind::Image => "jpg",
            AssetKind::Audio => "mp3",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One asset written into a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedAsset {
    pub kind: AssetKind,
    pub index: usize,
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Isolated, request-scoped storage for one job's assets and output.
///
/// # Example
///
/// ```no_run
/// use sv_av::{AssetKind, StagingArea};
/// use sv_core::JobId;
///
/// # async fn example() -> sv_core::Result<()> {
/// let mut staging = StagingArea::new(JobId::new(), None, 32 * 1024 * 1024)?;
/// staging.stage(AssetKind::Image, 0, b"...jpeg bytes...").await?;
/// staging.stage(AssetKind::Audio, 0, b"...mp3 bytes...").await?;
/// assert_eq!(staging.total_bytes(), 36);
/// // Dropping (or releasing) the area removes the directory.
/// staging.release();
/// # Ok(())
/// # }
/// ```
pub struct StagingArea {
    job_id: JobId,
    temp_dir: TempDir,
    limit_bytes: u64,
    total_bytes: u64,
    assets: Vec<StagedAsset>,
}

impl StagingArea {
    /// Create a new workspace for a job.
    ///
    /// The directory is created under `root` (or the system temp dir) with a
    /// name carrying the job id plus a random suffix.
    pub fn new(job_id: JobId, root: Option<&Path>, limit_bytes: u64) -> Result<Self> {
        let prefix = format!("slopvid-{}-", job_id.short());
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);

        let temp_dir = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| Error::Internal(format!("failed to create staging workspace: {e}")))?;

        tracing::debug!(job = %job_id, dir = %temp_dir.path().display(), "Staging workspace created");

        Ok(Self {
            job_id,
            temp_dir,
            limit_bytes,
            total_bytes: 0,
            assets: Vec::new(),
        })
    }

    /// Path to the workspace directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Deterministic location of the asset `(kind, index)`.
    pub fn asset_path(&self, kind: AssetKind, index: usize) -> PathBuf {
        self.temp_dir
            .path()
            .join(format!("{}_{index:03}.{}", kind.as_str(), kind.extension()))
    }

    /// Where the engine writes the assembled video.
    pub fn output_path(&self) -> PathBuf {
        self.temp_dir.path().join(OUTPUT_FILE)
    }

    /// Bytes staged so far.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// The configured aggregate ceiling.
    pub fn limit_bytes(&self) -> u64 {
        self.limit_bytes
    }

    /// Paths of all staged assets of one kind, ordered by index.
    pub fn paths(&self, kind: AssetKind) -> Vec<PathBuf> {
        let mut staged: Vec<&StagedAsset> =
            self.assets.iter().filter(|a| a.kind == kind).collect();
        staged.sort_by_key(|a| a.index);
        staged.into_iter().map(|a| a.path.clone()).collect()
    }

    /// Write one asset, adding its size to the running total.
    ///
    /// # Errors
    ///
    /// - [`Error::PayloadTooLarge`] if the running total would cross the
    ///   ceiling; nothing is written for that asset.
    /// - [`Error::Internal`] if `(kind, index)` was already staged.
    /// - [`Error::Io`] if the write fails.
    pub async fn stage(&mut self, kind: AssetKind, index: usize, bytes: &[u8]) -> Result<&StagedAsset> {
        if self.assets.iter().any(|a| a.kind == kind && a.index == index) {
            return Err(Error::Internal(format!("{kind} {index} staged twice")));
        }

        let size_bytes = bytes.len() as u64;
        let running = self.total_bytes.saturating_add(size_bytes);
        if running > self.limit_bytes {
            tracing::warn!(
                job = %self.job_id,
                running,
                limit = self.limit_bytes,
                "Upload exceeds size ceiling at {kind} {index}"
            );
            return Err(Error::payload_too_large(running, self.limit_bytes));
        }

        let path = self.asset_path(kind, index);
        tokio::fs::write(&path, bytes).await?;
        self.total_bytes = running;

        tracing::debug!(job = %self.job_id, "Saved {kind} {index}: {size_bytes} bytes");

        self.assets.push(StagedAsset {
            kind,
            index,
            path,
            size_bytes,
        });
        Ok(&self.assets[self.assets.len() - 1])
    }

    /// Stage an ordered batch of one kind, indices starting at zero.
    pub async fn stage_all<B: AsRef<[u8]>>(&mut self, kind: AssetKind, items: &[B]) -> Result<Vec<PathBuf>> {
        for (index, bytes) in items.iter().enumerate() {
            self.stage(kind, index, bytes.as_ref()).await?;
        }
        Ok(self.paths(kind))
    }

    /// Remove the workspace now, logging rather than propagating failures.
    ///
    /// Dropping the area has the same effect; this exists so the normal path
    /// can report cleanup problems.
    pub fn release(self) {
        let dir = self.temp_dir.path().to_path_buf();
        if let Err(e) = self.temp_dir.close() {
            tracing::warn!(job = %self.job_id, "Failed to remove staging workspace {}: {e}", dir.display());
        } else {
            tracing::debug!(job = %self.job_id, "Staging workspace removed");
        }
    }
}
