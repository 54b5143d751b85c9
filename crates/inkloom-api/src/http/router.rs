//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`.
//! Middleware: CORS, tracing.
//!
//! The workflow editor is a separate application; this server only speaks
//! JSON and SSE, there is no static file serving.

use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Workflow execution
        .route(
            "/workflows/execute",
            post(handlers::workflow::execute_workflow),
        )
        // Run records and progress
        .route("/runs", get(handlers::workflow::list_runs))
        .route("/runs/{run_id}", get(handlers::workflow::get_run))
        .route("/runs/{run_id}/events", get(handlers::workflow::run_events))
        // Model configurations
        .route(
            "/models",
            get(handlers::model::list_models).post(handlers::model::upsert_model),
        )
        .route("/models/{id}", delete(handlers::model::delete_model))
        .route(
            "/models/{id}/default",
            post(handlers::model::set_default_model),
        )
        .route("/models/{id}/test", post(handlers::model::test_model))
        // Maintenance
        .route("/cache/clear", post(handlers::system::clear_cache));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
