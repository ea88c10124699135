//! Liveness endpoints.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::context::AppContext;

/// Response body of `GET /api/health`.
#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Name of the engine jobs are rendered with.
    pub engine: String,
}

/// GET /health
pub async fn health_check() -> &'static str {
    "ok"
}

/// GET /api/health
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn api_health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        engine: ctx.pipeline.engine_name().to_string(),
    })
}
