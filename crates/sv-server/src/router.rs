//! Axum router construction.
//!
//! Builds the full application router with the assembly routes, health and
//! admin endpoints, OpenAPI docs, and middleware layers.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::context::AppContext;
use crate::middleware::request_id::request_id_middleware;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::assemble::assemble_video,
        routes::health::api_health,
        routes::admin::tools,
    ),
    components(schemas(
        routes::assemble::AssemblyForm,
        routes::health::HealthResponse,
        crate::error::ErrorBody,
        sv_core::AssemblyRequest,
        sv_core::SceneSpec,
        sv_core::Resolution,
        sv_av::ToolInfo,
    ))
)]
struct ApiDoc;

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    // The transport cap sits above the assembly ceiling so oversize uploads
    // still reach the typed size check.
    let body_limit = usize::try_from(ctx.config.server.max_request_bytes).unwrap_or(usize::MAX);

    let api = Router::new()
        .route("/health", get(routes::health::api_health))
        .route("/assemble-video", post(routes::assemble::assemble_video))
        .route("/admin/tools", get(routes::admin::tools));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/assemble-video", post(routes::assemble::assemble_video))
        .nest("/api", api)
        .merge(SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/metrics", get(routes::metrics::metrics_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
