//! Structural and configuration error types.

use thiserror::Error;

/// Structural workflow errors.
///
/// All of these are detected before any node is dispatched; a submission
/// that trips one is rejected outright.
#[derive(Debug, Clone, Error)]
pub enum WorkflowError {
    #[error("duplicate node id '{id}'")]
    DuplicateNodeId { id: String },

    #[error("edge '{edge_id}' references unknown node '{node_id}'")]
    UnknownNode { edge_id: String, node_id: String },

    #[error("cycle detected involving nodes: {}", nodes.join(", "))]
    CycleDetected { nodes: Vec<String> },
}

/// Errors from the model configuration registry and store.
#[derive(Debug, Clone, Error)]
pub enum ModelConfigError {
    #[error("model configuration '{id}' not found")]
    NotFound { id: String },

    #[error("no model configurations available")]
    Empty,

    #[error("model store error: {message}")]
    Storage { message: String },
}
