//! Application context shared across route handlers via Axum state.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use sv_av::{AssemblyEngine, ToolRegistry};
use sv_core::config::Config;
use sv_pipeline::{AssemblyPipeline, PipelineSettings};

/// Everything a handler needs. Cheap to clone; all fields are shared.
///
/// Jobs keep no state here: each request builds its own workspace inside
/// the pipeline, so the context is effectively read-only.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub tools: Arc<ToolRegistry>,
    pub pipeline: Arc<AssemblyPipeline>,
    /// Present when a Prometheus recorder was installed at startup.
    pub metrics: Option<PrometheusHandle>,
}

impl AppContext {
    /// Build a context around `engine`, with budgets taken from `config`.
    pub fn new(config: Config, tools: ToolRegistry, engine: Arc<dyn AssemblyEngine>) -> Self {
        let pipeline = AssemblyPipeline::new(engine, PipelineSettings::from(&config.assembly));
        Self {
            config: Arc::new(config),
            tools: Arc::new(tools),
            pipeline: Arc::new(pipeline),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
