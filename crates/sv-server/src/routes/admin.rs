//! Admin route handlers.

use axum::extract::State;
use axum::Json;
use sv_av::ToolInfo;
use tokio::task::JoinError;

use crate::context::AppContext;

/// GET /api/admin/tools
#[utoipa::path(
    get,
    path = "/api/admin/tools",
    responses(
        (status = 200, description = "List external tool availability", body = Vec<sv_av::ToolInfo>)
    )
)]
pub async fn tools(State(ctx): State<AppContext>) -> Json<Vec<ToolInfo>> {
    // Version detection spawns each tool; keep it off the async workers.
    let registry = ctx.tools.clone();
    let joined = tokio::task::spawn_blocking(move || registry.check_all()).await;
    Json(tool_status(joined))
}

fn tool_status(joined: Result<Vec<ToolInfo>, JoinError>) -> Vec<ToolInfo> {
    joined.unwrap_or_else(|e| {
        tracing::error!("Tool check task failed: {e}");
        Vec::new()
    })
}
