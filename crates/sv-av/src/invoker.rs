//! Runs one encode under a hard deadline.
//!
//! The [`AssemblyInvoker`] hands a job to its engine together with a fresh
//! [`CancellationToken`]. If the deadline fires first the token is cancelled
//! and the invoker waits (bounded) for the engine to wind down, so by the
//! time [`Error::Timeout`] is returned the encoder process is gone. Engine
//! failures are reclassified into the job error taxonomy by variant, never
//! by inspecting message text.

use std::sync::Arc;
use std::time::{Duration, Instant};

use sv_core::{Error, Result};
use tokio_util::sync::CancellationToken;

use crate::engine::{AssemblyEngine, AssemblyJob, EngineError};

/// How long a cancelled engine gets to stop before we stop waiting on it.
const CANCEL_GRACE: Duration = Duration::from_secs(10);

/// Invokes an [`AssemblyEngine`] with a deadline and typed error mapping.
#[derive(Clone)]
pub struct AssemblyInvoker {
    engine: Arc<dyn AssemblyEngine>,
    deadline: Duration,
}

impl AssemblyInvoker {
    pub fn new(engine: Arc<dyn AssemblyEngine>, deadline: Duration) -> Self {
        Self { engine, deadline }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Run `job` to completion or until the deadline.
    ///
    /// Returns the duration of the produced video in seconds. On any error
    /// a partial output file is removed.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if the deadline elapsed; the engine was cancelled.
    /// - [`Error::MissingFiles`] if the engine could not find an input.
    /// - [`Error::Encoding`] if the engine failed or produced no usable output.
    /// - [`Error::Internal`] if the engine stopped for any other reason.
    pub async fn invoke(&self, job: &AssemblyJob) -> Result<f64> {
        let started = Instant::now();
        let result = self.run(job).await;

        match &result {
            Ok(duration) => tracing::info!(
                engine = self.engine.name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Assembly finished: {duration:.2}s of video"
            ),
            Err(e) => {
                tracing::warn!(
                    engine = self.engine.name(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    code = e.code(),
                    "Assembly failed: {e}"
                );
                remove_partial_output(job).await;
            }
        }

        result
    }

    async fn run(&self, job: &AssemblyJob) -> Result<f64> {
        let cancel = CancellationToken::new();
        let mut assembly = std::pin::pin!(self.engine.assemble(job, cancel.clone()));

        let outcome = tokio::select! {
            outcome = &mut assembly => outcome,
            _ = tokio::time::sleep(self.deadline) => {
                tracing::warn!(
                    engine = self.engine.name(),
                    "Deadline of {:?} reached; cancelling assembly",
                    self.deadline
                );
                cancel.cancel();
                if tokio::time::timeout(CANCEL_GRACE, &mut assembly).await.is_err() {
                    tracing::error!(
                        engine = self.engine.name(),
                        "Engine did not stop within {CANCEL_GRACE:?} of cancellation"
                    );
                }
                return Err(Error::Timeout { deadline: self.deadline });
            }
        };

        let duration = outcome.map_err(|e| self.classify(e))?;

        if !job.output.is_file() {
            return Err(Error::encoding(format!(
                "{} reported success but wrote no output",
                self.engine.name()
            )));
        }
        if !(duration.is_finite() && duration > 0.0) {
            return Err(Error::encoding(format!(
                "{} reported an invalid duration: {duration}",
                self.engine.name()
            )));
        }

        Ok(duration)
    }

    fn classify(&self, err: EngineError) -> Error {
        match err {
            EngineError::MissingInput(path) => Error::missing_file(path),
            EngineError::Failed { message } => Error::encoding(message),
            EngineError::TimedOut => Error::Timeout {
                deadline: self.deadline,
            },
            EngineError::Cancelled => {
                Error::Internal(format!("{} stopped unexpectedly", self.engine.name()))
            }
        }
    }
}

async fn remove_partial_output(job: &AssemblyJob) {
    match tokio::fs::remove_file(&job.output).await {
        Ok(()) => tracing::debug!("Removed partial output {:?}", job.output),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove partial output {:?}: {e}", job.output),
    }
}
