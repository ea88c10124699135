//! ffmpeg-backed [`AssemblyEngine`].
//!
//! Each scene's still image is looped for the scene duration, scaled and
//! letterboxed to the target resolution, and paired with its narration
//! clip, which is padded with silence or trimmed to the same length. The
//! scenes are then joined with the `concat` filter and encoded to H.264/AAC
//! in a single ffmpeg run.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sv_core::config::EncodingConfig;
use tokio_util::sync::CancellationToken;

use crate::command::{CommandError, ToolCommand};
use crate::engine::{AssemblyEngine, AssemblyJob, EngineError};
use crate::tools::ToolRegistry;

/// Renders jobs by spawning ffmpeg, then reads the real duration back with
/// ffprobe when it is available.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    ffmpeg: PathBuf,
    ffprobe: Option<PathBuf>,
    encoding: EncodingConfig,
}

impl FfmpegEngine {
    pub fn new(ffmpeg: PathBuf, ffprobe: Option<PathBuf>, encoding: EncodingConfig) -> Self {
        Self {
            ffmpeg,
            ffprobe,
            encoding,
        }
    }

    /// Build an engine from discovered tools. ffmpeg is required; ffprobe is
    /// optional.
    pub fn from_registry(tools: &ToolRegistry, encoding: EncodingConfig) -> Result<Self, CommandError> {
        let ffmpeg = tools.require("ffmpeg")?.path.clone();
        let ffprobe = tools.get("ffprobe").map(|t| t.path.clone());
        Ok(Self::new(ffmpeg, ffprobe, encoding))
    }

    /// Ask ffprobe for the container duration of `path`.
    async fn probe_duration(&self, ffprobe: &Path, path: &Path, cancel: CancellationToken) -> Result<f64, EngineError> {
        let output = ToolCommand::new(ffprobe.to_path_buf())
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path.to_string_lossy())
            .cancel_on(cancel)
            .execute()
            .await
            .map_err(engine_error)?;

        let text = output.stdout.trim();
        text.parse::<f64>()
            .map_err(|_| EngineError::failed(format!("ffprobe reported an unreadable duration: {text:?}")))
    }
}

#[async_trait]
impl AssemblyEngine for FfmpegEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn assemble(&self, job: &AssemblyJob, cancel: CancellationToken) -> Result<f64, EngineError> {
        if let Some(missing) = job.inputs().find(|p| !p.exists()) {
            return Err(EngineError::MissingInput(missing.clone()));
        }

        let args = build_args(job, &self.encoding);
        tracing::info!(
            scenes = job.scene_count(),
            resolution = %job.resolution,
            fps = job.frame_rate,
            "Running ffmpeg for {:?}",
            job.output
        );
        tracing::debug!("ffmpeg {}", args.join(" "));

        // The invoker owns the deadline; the token is our only stop signal.
        ToolCommand::new(self.ffmpeg.clone())
            .args(args)
            .without_timeout()
            .cancel_on(cancel.clone())
            .execute()
            .await
            .map_err(engine_error)?;

        match &self.ffprobe {
            Some(ffprobe) => self.probe_duration(ffprobe, &job.output, cancel).await,
            None => {
                tracing::debug!("ffprobe unavailable; reporting nominal duration");
                Ok(job.total_duration())
            }
        }
    }
}

fn engine_error(err: CommandError) -> EngineError {
    match err {
        CommandError::Cancelled { .. } => EngineError::Cancelled,
        CommandError::TimedOut { .. } => EngineError::TimedOut,
        CommandError::Failed { stderr, status, tool } => {
            if stderr.is_empty() {
                EngineError::failed(format!("{tool} exited with status {status}"))
            } else {
                EngineError::failed(stderr)
            }
        }
        other => EngineError::failed(other.to_string()),
    }
}

/// Seconds with millisecond precision, the way ffmpeg options take them.
fn seconds(value: f64) -> String {
    format!("{value:.3}")
}

/// Build the complete ffmpeg argument list for `job`.
///
/// Inputs `0..n` are the looped images and `n..2n` the audio clips, so scene
/// `i` reads `[i:v]` and `[n+i:a]`.
pub fn build_args(job: &AssemblyJob, encoding: &EncodingConfig) -> Vec<String> {
    let n = job.scene_count();
    let fps = job.frame_rate.to_string();
    let (w, h) = (job.resolution.width, job.resolution.height);

    let mut args: Vec<String> = ["-hide_banner", "-nostdin", "-loglevel", "error", "-y"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    for (image, duration) in job.images.iter().zip(&job.durations) {
        args.extend([
            "-loop".into(),
            "1".into(),
            "-framerate".into(),
            fps.clone(),
            "-t".into(),
            seconds(*duration),
            "-i".into(),
            image.to_string_lossy().to_string(),
        ]);
    }
    for audio in &job.audio {
        args.extend(["-i".into(), audio.to_string_lossy().to_string()]);
    }

    let mut filter = String::new();
    for (i, duration) in job.durations.iter().enumerate() {
        filter.push_str(&format!(
            "[{i}:v]scale={w}:{h}:force_original_aspect_ratio=decrease,\
             pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black,setsar=1,fps={fps},format={pix}[v{i}];",
            pix = encoding.pixel_format,
        ));
        filter.push_str(&format!(
            "[{a}:a]aresample={sr},aformat=sample_rates={sr}:channel_layouts=stereo,\
             apad,atrim=0:{d},asetpts=PTS-STARTPTS[a{i}];",
            a = n + i,
            sr = encoding.audio_sample_rate,
            d = seconds(*duration),
        ));
    }
    for i in 0..n {
        filter.push_str(&format!("[v{i}][a{i}]"));
    }
    filter.push_str(&format!("concat=n={n}:v=1:a=1[vout][aout]"));

    args.extend([
        "-filter_complex".into(),
        filter,
        "-map".into(),
        "[vout]".into(),
        "-map".into(),
        "[aout]".into(),
        "-c:v".into(),
        encoding.video_codec.clone(),
        "-preset".into(),
        encoding.preset.clone(),
        "-crf".into(),
        encoding.crf.to_string(),
        "-pix_fmt".into(),
        encoding.pixel_format.clone(),
        "-r".into(),
        fps,
        "-c:a".into(),
        encoding.audio_codec.clone(),
        "-b:a".into(),
        encoding.audio_bitrate.clone(),
        "-movflags".into(),
        "+faststart".into(),
        job.output.to_string_lossy().to_string(),
    ]);

    args
}
