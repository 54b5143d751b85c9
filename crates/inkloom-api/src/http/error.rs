//! Application error type mapping to HTTP status codes and envelope format.

use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use inkloom_types::error::{ModelConfigError, WorkflowError};
use inkloom_types::llm::LlmError;

use super::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Structural workflow problems (duplicate ids, dangling edges, cycles).
    Workflow(WorkflowError),
    /// Model configuration errors.
    Model(ModelConfigError),
    /// Provider invocation errors.
    Provider(LlmError),
    /// Unknown run id.
    RunNotFound(Uuid),
    /// Request validation error.
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<WorkflowError> for AppError {
    fn from(e: WorkflowError) -> Self {
        AppError::Workflow(e)
    }
}

impl From<ModelConfigError> for AppError {
    fn from(e: ModelConfigError) -> Self {
        AppError::Model(e)
    }
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        AppError::Provider(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // The envelope derives the HTTP status from the code string.
        let (code, message) = match &self {
            AppError::Workflow(e) => ("INVALID_WORKFLOW", e.to_string()),
            AppError::Model(e @ ModelConfigError::NotFound { .. }) => {
                ("MODEL_NOT_FOUND", e.to_string())
            }
            AppError::Model(e @ ModelConfigError::Empty) => ("NO_MODELS", e.to_string()),
            AppError::Model(e @ ModelConfigError::Storage { .. }) => {
                ("STORE_ERROR", e.to_string())
            }
            AppError::Provider(e @ LlmError::MissingApiKey { .. }) => {
                ("MISSING_API_KEY", e.to_string())
            }
            AppError::Provider(e) => ("PROVIDER_ERROR", e.to_string()),
            AppError::RunNotFound(run_id) => {
                ("RUN_NOT_FOUND", format!("run '{run_id}' not found"))
            }
            AppError::Validation(msg) => ("VALIDATION_ERROR", msg.clone()),
            AppError::Internal(msg) => ("INTERNAL_ERROR", msg.clone()),
        };

        ApiResponse::error(code, &message, String::new(), 0).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn workflow_errors_are_bad_requests() {
        let err = AppError::from(WorkflowError::DuplicateNodeId { id: "a".into() });
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unknown_run_is_not_found() {
        let err = AppError::RunNotFound(Uuid::now_v7());
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn model_errors_split_by_variant() {
        let not_found = AppError::from(ModelConfigError::NotFound { id: "m1".into() });
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let empty = AppError::from(ModelConfigError::Empty);
        assert_eq!(empty.into_response().status(), StatusCode::CONFLICT);

        let storage = AppError::from(ModelConfigError::Storage {
            message: "disk gone".into(),
        });
        assert_eq!(
            storage.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn provider_errors_split_by_variant() {
        let missing = AppError::from(LlmError::MissingApiKey { model: "m1".into() });
        assert_eq!(missing.into_response().status(), StatusCode::BAD_REQUEST);

        let transport = AppError::from(LlmError::Transport {
            message: "connection refused".into(),
        });
        assert_eq!(transport.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
