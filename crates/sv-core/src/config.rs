//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! server, assembly, encoding and tool sections. Every section defaults
//! sensibly so a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::Error;

/// Aggregate upload ceiling: 32 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 32 * 1024 * 1024;

/// Encode deadline: 5 minutes.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

const KNOWN_PRESETS: &[&str] = &[
    "ultrafast",
    "superfast",
    "veryfast",
    "faster",
    "fast",
    "medium",
    "slow",
    "slower",
    "veryslow",
];

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub assembly: AssemblyConfig,
    pub encoding: EncodingConfig,
    pub tools: ToolsConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Internal(format!("config parse error: {e}")))
    }

    /// Load configuration from a file, surfacing read and parse errors.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self.assembly.timeout_secs == 0 {
            warnings.push("assembly.timeout_secs is 0; every encode will time out".into());
        }

        if self.assembly.max_upload_bytes == 0 {
            warnings.push("assembly.max_upload_bytes is 0; every upload will be rejected".into());
        }

        if self.server.max_request_bytes < self.assembly.max_upload_bytes {
            warnings.push(format!(
                "server.max_request_bytes ({}) is below assembly.max_upload_bytes ({}); \
                 oversize uploads will be cut off by the transport",
                self.server.max_request_bytes, self.assembly.max_upload_bytes
            ));
        }

        if let Some(ref dir) = self.assembly.staging_dir {
            if !dir.is_dir() {
                warnings.push(format!(
                    "assembly.staging_dir '{}' does not exist",
                    dir.display()
                ));
            }
        }

        if !KNOWN_PRESETS.contains(&self.encoding.preset.as_str()) {
            warnings.push(format!(
                "encoding.preset '{}' is not a recognized x264 preset (valid: {})",
                self.encoding.preset,
                KNOWN_PRESETS.join(", ")
            ));
        }

        if self.encoding.crf > 51 {
            warnings.push(format!(
                "encoding.crf {} is out of range (0-51)",
                self.encoding.crf
            ));
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Transport-level body cap for a whole multipart submission.
    pub max_request_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            max_request_bytes: 2 * DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Per-job budgets and staging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Ceiling on the summed size of all uploaded assets.
    pub max_upload_bytes: u64,
    /// Hard wall-clock deadline for one encode.
    pub timeout_secs: u64,
    /// Parent directory for per-job workspaces (system temp dir if unset).
    pub staging_dir: Option<PathBuf>,
    /// Prefix of the generated download filename.
    pub filename_prefix: String,
}

impl AssemblyConfig {
    /// The encode deadline as a [`Duration`].
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            staging_dir: None,
            filename_prefix: "slop-video".into(),
        }
    }
}

/// Output encoding parameters handed to ffmpeg.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    pub video_codec: String,
    pub preset: String,
    pub crf: u32,
    pub pixel_format: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
    pub audio_sample_rate: u32,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            video_codec: "libx264".into(),
            preset: "medium".into(),
            crf: 23,
            pixel_format: "yuv420p".into(),
            audio_codec: "aac".into(),
            audio_bitrate: "192k".into(),
            audio_sample_rate: 44_100,
        }
    }
}

/// Paths to external tool executables (auto-detected from `PATH` if unset).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}
