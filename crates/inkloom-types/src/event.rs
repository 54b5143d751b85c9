//! Execution events for the push-style status stream.
//!
//! `NodeEvent` is the per-node lifecycle record consumed by external
//! collaborators; `RunEvent` scopes it to a run for the process-wide
//! broadcast bus. All variants are Clone + Send + Sync for use with tokio
//! broadcast channels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Lifecycle phase of a node within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeEventStatus {
    Started,
    Processing,
    Completed,
    Failed,
}

/// A single per-node lifecycle event, emitted in execution order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeEvent {
    pub node_id: String,
    /// Agent role for agent nodes; tool/data type string otherwise.
    pub agent_type: String,
    pub status: NodeEventStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl NodeEvent {
    /// Build an event stamped with the current time.
    pub fn now(
        node_id: impl Into<String>,
        agent_type: impl Into<String>,
        status: NodeEventStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            agent_type: agent_type.into(),
            status,
            message: message.into(),
            output: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_output(mut self, output: Value) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// A node event scoped to its run, as carried on the broadcast bus.
///
/// Flattened on the wire: subscribers see the node event fields plus
/// `run_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    pub run_id: Uuid,
    #[serde(flatten)]
    pub event: NodeEvent,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_wire_names_are_lowercase() {
        assert_eq!(
            serde_json::to_string(&NodeEventStatus::Started).unwrap(),
            "\"started\""
        );
        assert_eq!(
            serde_json::to_string(&NodeEventStatus::Processing).unwrap(),
            "\"processing\""
        );
        assert_eq!(
            serde_json::to_string(&NodeEventStatus::Completed).unwrap(),
            "\"completed\""
        );
        assert_eq!(
            serde_json::to_string(&NodeEventStatus::Failed).unwrap(),
            "\"failed\""
        );
    }

    #[test]
    fn run_event_flattens_node_fields() {
        let run_id = Uuid::now_v7();
        let event = RunEvent {
            run_id,
            event: NodeEvent::now("3", "chapter_writer", NodeEventStatus::Completed, "done")
                .with_output(json!({"title": "X"})),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["run_id"], json!(run_id.to_string()));
        assert_eq!(value["node_id"], json!("3"));
        assert_eq!(value["status"], json!("completed"));
        assert_eq!(value["output"]["title"], json!("X"));
        assert!(value.get("error").is_none());
    }
}
