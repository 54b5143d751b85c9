//! Maintenance handlers.

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use serde_json::json;

use crate::http::response::ApiResponse;
use crate::state::AppState;

/// POST /api/v1/cache/clear - Drop all cached node results.
pub async fn clear_cache(State(state): State<AppState>) -> Json<ApiResponse<serde_json::Value>> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let cleared = state.engine.clear_cache();
    let elapsed = start.elapsed().as_millis() as u64;

    Json(ApiResponse::success(
        json!({ "cleared": cleared }),
        request_id,
        elapsed,
    ))
}
