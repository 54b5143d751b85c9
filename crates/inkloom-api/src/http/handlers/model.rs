//! Model configuration handlers.
//!
//! Mutations go through the in-memory registry first, then persist the
//! full list to the model store so a restart sees the same set.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use serde_json::json;

use inkloom_infra::llm::{create_provider, test_provider_connection};
use inkloom_types::error::ModelConfigError;
use inkloom_types::model::ModelConfig;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/models - List all model configurations.
pub async fn list_models(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ModelConfig>>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let models = state.models.list().await;
    let elapsed = start.elapsed().as_millis() as u64;

    let resp = ApiResponse::success(models, request_id, elapsed).with_link("self", "/api/v1/models");

    Ok(Json(resp))
}

/// POST /api/v1/models - Create or replace a model configuration.
pub async fn upsert_model(
    State(state): State<AppState>,
    Json(body): Json<ModelConfig>,
) -> Result<Json<ApiResponse<ModelConfig>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    if body.id.trim().is_empty() {
        return Err(AppError::Validation("model id must not be empty".to_string()));
    }
    if body.model_id.trim().is_empty() {
        return Err(AppError::Validation(
            "model identifier (modelId) must not be empty".to_string(),
        ));
    }

    let id = body.id.clone();
    state.models.upsert(body).await;
    state.persist_models().await?;

    // Re-read the stored entry; the registry may have adjusted the default
    // flag to keep exactly one default.
    let saved = state
        .models
        .get(&id)
        .await
        .ok_or_else(|| AppError::Internal(format!("model '{id}' vanished after upsert")))?;
    let elapsed = start.elapsed().as_millis() as u64;

    let resp = ApiResponse::success(saved, request_id, elapsed)
        .with_link("self", &format!("/api/v1/models/{id}"));

    Ok(Json(resp))
}

/// DELETE /api/v1/models/:id - Remove a model configuration.
pub async fn delete_model(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let removed = state.models.remove(&id).await?;
    state.persist_models().await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let resp = ApiResponse::success(
        json!({ "deleted": true, "id": removed.id }),
        request_id,
        elapsed,
    );

    Ok(Json(resp))
}

/// POST /api/v1/models/:id/default - Mark a configuration as the default.
pub async fn set_default_model(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    state.models.set_default(&id).await?;
    state.persist_models().await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let resp = ApiResponse::success(json!({ "id": id, "isDefault": true }), request_id, elapsed)
        .with_link("self", &format!("/api/v1/models/{id}"));

    Ok(Json(resp))
}

/// POST /api/v1/models/:id/test - Round-trip a minimal prompt through the
/// configured provider to confirm the credentials work.
pub async fn test_model(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let config = state
        .models
        .get(&id)
        .await
        .ok_or(AppError::Model(ModelConfigError::NotFound { id: id.clone() }))?;

    let provider = create_provider(&config)?;
    test_provider_connection(&provider).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let resp = ApiResponse::success(
        json!({ "id": id, "ok": true, "provider": provider.name() }),
        request_id,
        elapsed,
    );

    Ok(Json(resp))
}
