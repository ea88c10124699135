//! The end-to-end assembly job.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use sv_av::{AssemblyEngine, AssemblyInvoker, AssemblyJob, AssetKind, StagingArea};
use sv_core::config::AssemblyConfig;
use sv_core::{request, Error, JobId, Result};
use tracing::Instrument;

use crate::stage::JobStage;

/// Raw input collected by a front end, in submission order.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    /// The metadata field, unparsed.
    pub metadata: String,
    pub images: Vec<Bytes>,
    pub audio: Vec<Bytes>,
}

impl Submission {
    /// Summed size of all assets.
    pub fn asset_bytes(&self) -> u64 {
        self.images
            .iter()
            .chain(self.audio.iter())
            .map(|b| b.len() as u64)
            .sum()
    }
}

/// A delivered video.
#[derive(Debug, Clone)]
pub struct AssemblyResult {
    pub job_id: JobId,
    /// The MP4 bytes, read out of the workspace before it was removed.
    pub artifact: Bytes,
    /// Duration of the video in seconds, as reported by the engine.
    pub duration_seconds: f64,
    pub size_bytes: u64,
    /// Wall-clock time from receipt to delivery.
    pub elapsed: Duration,
}

/// Per-job budgets.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_upload_bytes: u64,
    pub deadline: Duration,
    /// Parent of per-job workspaces; system temp dir when `None`.
    pub staging_dir: Option<PathBuf>,
}

impl From<&AssemblyConfig> for PipelineSettings {
    fn from(config: &AssemblyConfig) -> Self {
        Self {
            max_upload_bytes: config.max_upload_bytes,
            deadline: config.deadline(),
            staging_dir: config.staging_dir.clone(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&AssemblyConfig::default())
    }
}

/// Runs submissions through validate, stage, invoke and collect.
///
/// Each run gets its own job id and workspace, so concurrent runs share
/// nothing but the engine.
#[derive(Clone)]
pub struct AssemblyPipeline {
    invoker: AssemblyInvoker,
    settings: PipelineSettings,
}

impl AssemblyPipeline {
    pub fn new(engine: Arc<dyn AssemblyEngine>, settings: PipelineSettings) -> Self {
        Self {
            invoker: AssemblyInvoker::new(engine, settings.deadline),
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn engine_name(&self) -> &str {
        self.invoker.engine_name()
    }

    /// Run one submission to completion.
    ///
    /// # Errors
    ///
    /// Any [`Error`] from validation, staging or the invoker. Validation
    /// failures are returned before anything touches the filesystem.
    pub async fn run(&self, submission: Submission) -> Result<AssemblyResult> {
        let job_id = JobId::new();
        let span = tracing::info_span!("assembly", job = %job_id.short());
        self.run_job(job_id, submission).instrument(span).await
    }

    async fn run_job(&self, job_id: JobId, submission: Submission) -> Result<AssemblyResult> {
        let started = Instant::now();
        tracing::info!(
            stage = %JobStage::Received,
            images = submission.images.len(),
            audio = submission.audio.len(),
            bytes = submission.asset_bytes(),
            "Assembly request received"
        );

        let request = request::validate(
            &submission.metadata,
            submission.images.len(),
            submission.audio.len(),
        )
        .map_err(failed)?;
        tracing::info!(
            stage = %JobStage::Validated,
            scenes = request.scene_count(),
            resolution = %request.resolution,
            fps = request.frame_rate,
            "Metadata validated: {:.1}s of scenes",
            request.total_duration()
        );

        let upload_bytes = submission.asset_bytes();

        // Dropping `staging` on any early return removes the workspace.
        let mut staging = StagingArea::new(
            job_id,
            self.settings.staging_dir.as_deref(),
            self.settings.max_upload_bytes,
        )
        .map_err(failed)?;
        let images = staging
            .stage_all(AssetKind::Image, &submission.images)
            .await
            .map_err(|e| failed(whole_upload(e, upload_bytes)))?;
        let audio = staging
            .stage_all(AssetKind::Audio, &submission.audio)
            .await
            .map_err(|e| failed(whole_upload(e, upload_bytes)))?;
        // The bytes are on disk now; no need to hold them twice.
        drop(submission);
        tracing::info!(
            stage = %JobStage::Staged,
            bytes = staging.total_bytes(),
            limit = staging.limit_bytes(),
            dir = %staging.path().display(),
            "Assets staged"
        );

        let job = AssemblyJob::new(&request, images, audio, staging.output_path());
        tracing::info!(
            stage = %JobStage::Invoked,
            engine = self.engine_name(),
            deadline_secs = self.invoker.deadline().as_secs(),
            "Invoking engine"
        );
        let duration_seconds = self.invoker.invoke(&job).await.map_err(failed)?;

        let artifact = Bytes::from(tokio::fs::read(&job.output).await.map_err(|e| failed(e.into()))?);
        staging.release();

        let result = AssemblyResult {
            job_id,
            size_bytes: artifact.len() as u64,
            artifact,
            duration_seconds,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            stage = %JobStage::Delivered,
            size = result.size_bytes,
            duration = result.duration_seconds,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "Video delivered"
        );
        Ok(result)
    }
}

/// Staging stops at the first asset past the ceiling; the caller is told the
/// size of everything they sent.
fn whole_upload(err: Error, upload_bytes: u64) -> Error {
    match err {
        Error::PayloadTooLarge { observed, limit } => {
            Error::payload_too_large(observed.max(upload_bytes), limit)
        }
        other => other,
    }
}

fn failed(err: Error) -> Error {
    tracing::warn!(stage = %JobStage::Failed, code = err.code(), "{err}");
    err
}
