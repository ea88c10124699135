//! The assembly engine seam.
//!
//! An [`AssemblyEngine`] turns a staged [`AssemblyJob`] into an MP4 at the
//! job's output path. The production implementation drives ffmpeg
//! ([`crate::FfmpegEngine`]); tests substitute scripted engines.

use std::path::PathBuf;

use async_trait::async_trait;
use sv_core::{AssemblyRequest, Resolution};
use tokio_util::sync::CancellationToken;

/// Everything an engine needs to render one video, with all inputs already
/// on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyJob {
    /// Image path per scene, in playback order.
    pub images: Vec<PathBuf>,
    /// Audio path per scene, in playback order.
    pub audio: Vec<PathBuf>,
    /// Seconds each scene stays on screen.
    pub durations: Vec<f64>,
    pub resolution: Resolution,
    pub frame_rate: f64,
    /// Where the finished MP4 must be written.
    pub output: PathBuf,
}

impl AssemblyJob {
    /// Bind a validated request to its staged inputs.
    pub fn new(
        request: &AssemblyRequest,
        images: Vec<PathBuf>,
        audio: Vec<PathBuf>,
        output: PathBuf,
    ) -> Self {
        Self {
            images,
            audio,
            durations: request.durations(),
            resolution: request.resolution,
            frame_rate: request.frame_rate,
            output,
        }
    }

    pub fn scene_count(&self) -> usize {
        self.durations.len()
    }

    /// Sum of scene durations; the nominal length of the output.
    pub fn total_duration(&self) -> f64 {
        self.durations.iter().sum()
    }

    /// All input paths, images first.
    pub fn inputs(&self) -> impl Iterator<Item = &PathBuf> {
        self.images.iter().chain(self.audio.iter())
    }
}

/// Typed engine failures. Engines report failure by value; nothing in the
/// invoker depends on panics or message sniffing.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A referenced input does not exist.
    #[error("Input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    /// The encode failed; `message` is the engine's diagnostic text.
    #[error("{message}")]
    Failed { message: String },

    /// The engine stopped because its cancellation token fired.
    #[error("assembly was cancelled")]
    Cancelled,

    /// The engine's own time bound elapsed.
    #[error("assembly timed out")]
    TimedOut,
}

impl EngineError {
    pub fn failed(message: impl Into<String>) -> Self {
        EngineError::Failed {
            message: message.into(),
        }
    }
}

/// Something that can render an [`AssemblyJob`] to its output path.
///
/// Implementations must stop promptly, and stop any process they started,
/// once `cancel` is cancelled.
#[async_trait]
pub trait AssemblyEngine: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Render the job, returning the duration of the produced video in
    /// seconds.
    async fn assemble(&self, job: &AssemblyJob, cancel: CancellationToken) -> Result<f64, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> AssemblyRequest {
        AssemblyRequest::parse(
            r#"{"scenes":[{"imageDuration":2},{"imageDuration":3.5}],
                "resolution":{"width":1280,"height":720},"frameRate":25}"#,
        )
        .unwrap()
    }

    #[test]
    fn job_binds_request_fields() {
        let job = AssemblyJob::new(
            &request(),
            vec!["a.jpg".into(), "b.jpg".into()],
            vec!["a.mp3".into(), "b.mp3".into()],
            "out.mp4".into(),
        );
        assert_eq!(job.scene_count(), 2);
        assert_eq!(job.durations, vec![2.0, 3.5]);
        assert_eq!(job.resolution.to_string(), "1280x720");
        assert_eq!(job.frame_rate, 25.0);
        assert!((job.total_duration() - 5.5).abs() < f64::EPSILON);
        let inputs: Vec<_> = job.inputs().map(|p| p.to_string_lossy().to_string()).collect();
        assert_eq!(inputs, vec!["a.jpg", "b.jpg", "a.mp3", "b.mp3"]);
    }

    #[test]
    fn engine_error_messages() {
        assert_eq!(
            EngineError::MissingInput("/tmp/x/image_000.jpg".into()).to_string(),
            "Input file not found: /tmp/x/image_000.jpg"
        );
        assert_eq!(
            EngineError::failed("Invalid data found when processing input").to_string(),
            "Invalid data found when processing input"
        );
    }
}
