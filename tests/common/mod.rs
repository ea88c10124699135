//! Shared test harness for integration tests.
//!
//! Provides [`ScriptedEngine`], an [`AssemblyEngine`] that plays back a fixed
//! behaviour without ffmpeg, a [`TestHarness`] that wires it into the real
//! router, and a small multipart [`Form`] builder.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sv_av::{AssemblyEngine, AssemblyJob, EngineError, ToolRegistry};
use sv_core::config::Config;
use sv_server::context::AppContext;
use sv_server::router::build_router;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

/// What a [`ScriptedEngine`] does when asked to assemble.
#[derive(Clone)]
pub enum Behavior {
    /// Write `artifact` to the output path and report `duration`.
    Succeed { duration: f64, artifact: Vec<u8> },
    /// Report the given failure.
    Fail(fn(&AssemblyJob) -> EngineError),
    /// Run until cancelled.
    Hang,
}

pub struct ScriptedEngine {
    behavior: Behavior,
    calls: AtomicUsize,
    cancelled: AtomicBool,
    jobs: Mutex<Vec<AssemblyJob>>,
}

impl ScriptedEngine {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
            cancelled: AtomicBool::new(false),
            jobs: Mutex::new(Vec::new()),
        })
    }

    pub fn succeeding(duration: f64) -> Arc<Self> {
        Self::new(Behavior::Succeed {
            duration,
            artifact: fake_mp4(),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn jobs(&self) -> Vec<AssemblyJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssemblyEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn assemble(&self, job: &AssemblyJob, cancel: CancellationToken) -> Result<f64, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.jobs.lock().unwrap().push(job.clone());

        match &self.behavior {
            Behavior::Succeed { duration, artifact } => {
                tokio::fs::write(&job.output, artifact).await.unwrap();
                Ok(*duration)
            }
            Behavior::Fail(make) => Err(make(job)),
            Behavior::Hang => {
                tokio::fs::write(&job.output, b"partial").await.unwrap();
                cancel.cancelled().await;
                self.cancelled.store(true, Ordering::SeqCst);
                Err(EngineError::Cancelled)
            }
        }
    }
}

/// A few bytes that look like the start of an MP4.
pub fn fake_mp4() -> Vec<u8> {
    let mut bytes = b"\x00\x00\x00\x18ftypmp42\x00\x00\x00\x00mp42isom".to_vec();
    bytes.extend_from_slice(&[0u8; 64]);
    bytes
}

/// Router plus the engine and staging root behind it.
pub struct TestHarness {
    pub app: Router,
    pub engine: Arc<ScriptedEngine>,
    pub staging: TempDir,
}

impl TestHarness {
    pub fn new(engine: Arc<ScriptedEngine>) -> Self {
        Self::with_config(engine, Config::default())
    }

    /// Build a harness; the staging root is always a fresh temp dir so tests
    /// can assert that nothing is left behind.
    pub fn with_config(engine: Arc<ScriptedEngine>, mut config: Config) -> Self {
        let staging = tempfile::tempdir().expect("failed to create staging root");
        config.assembly.staging_dir = Some(staging.path().to_path_buf());

        let ctx = AppContext::new(config, ToolRegistry::default(), engine.clone());
        Self {
            app: build_router(ctx),
            engine,
            staging,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// True when no workspace remains under the staging root.
    pub fn staging_is_empty(&self) -> bool {
        dir_is_empty(self.staging.path())
    }
}

pub fn dir_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).map(|mut d| d.next().is_none()).unwrap_or(true)
}

/// Metadata JSON in the client schema.
pub fn metadata(durations: &[f64]) -> String {
    let scenes: Vec<String> = durations
        .iter()
        .map(|d| format!(r#"{{"imageDuration":{d}}}"#))
        .collect();
    format!(
        r#"{{"scenes":[{}],"resolution":{{"width":1920,"height":1080}},"frameRate":30}}"#,
        scenes.join(",")
    )
}

const BOUNDARY: &str = "slopvid-test-boundary-7MA4YWxkTrZu0gW";

/// Minimal multipart/form-data encoder.
#[derive(Default)]
pub struct Form {
    body: Vec<u8>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                 Content-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// `count` images named `scene_<i>.jpg`, each `size` bytes.
    pub fn images(self, count: usize, size: usize) -> Self {
        (0..count).fold(self, |form, i| {
            form.file("images", &format!("scene_{i}.jpg"), "image/jpeg", &vec![0xFF; size])
        })
    }

    /// `count` audio clips named `scene_<i>.mp3`, each `size` bytes.
    pub fn audio(self, count: usize, size: usize) -> Self {
        (0..count).fold(self, |form, i| {
            form.file("audio", &format!("scene_{i}.mp3"), "audio/mpeg", &vec![0x49; size])
        })
    }

    pub fn into_request(mut self, uri: &str) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Request::post(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Collect a response body as raw bytes.
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

/// Paths of the workspaces the engine was handed.
pub fn workspaces(engine: &ScriptedEngine) -> Vec<PathBuf> {
    engine
        .jobs()
        .iter()
        .filter_map(|j| j.output.parent().map(Path::to_path_buf))
        .collect()
}
