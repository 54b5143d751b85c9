//! Workflow graph types: nodes, edges, submissions, and run records.
//!
//! A workflow is a directed acyclic graph authored by the external editor.
//! The editor submits it as a [`WorkflowSubmission`]; the engine works on
//! the [`WorkflowDefinition`] derived from it.
//! Node `config` payloads arrive as raw JSON and are typed by the node
//! configuration mapper into [`TypedNodeConfig`] values.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Graph structure
// ---------------------------------------------------------------------------

/// The kind of work a node performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A model invocation through a provider adapter.
    Agent,
    /// A locally evaluated expression.
    Tool,
    /// Literal or referenced content, no dispatch.
    Data,
}

impl NodeKind {
    /// Lowercase wire name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Agent => "agent",
            NodeKind::Tool => "tool",
            NodeKind::Data => "data",
        }
    }
}

/// Editor canvas coordinates, carried through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub x: f64,
    pub y: f64,
}

/// A single unit of work in a workflow graph.
///
/// `config` is the raw editor payload; its typed shape depends on `kind`
/// and is produced by the node configuration mapper. Nodes are immutable
/// once execution starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowNode {
    /// Editor-assigned identifier, unique within the workflow.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Node kind (wire field `type`).
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Canvas position (ignored by the engine).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<NodePosition>,
    /// Kind-specific payload, typed later by the mapper.
    #[serde(default)]
    pub config: Value,
    /// Optional upper bound on this node's total execution time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Optional retry budget overriding the shell's default attempt count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<u32>,
}

/// A must-complete-before ordering constraint between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEdge {
    /// Editor-assigned edge identifier.
    #[serde(default)]
    pub id: String,
    /// Upstream node id.
    pub source: String,
    /// Downstream node id.
    pub target: String,
}

/// A complete workflow graph.
///
/// Invariants (enforced by structural validation, not construction):
/// node ids are unique, every edge references existing nodes, and the
/// edge relation is acyclic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub nodes: Vec<WorkflowNode>,
    pub edges: Vec<WorkflowEdge>,
}

/// The wire contract handed to the engine by the external editor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSubmission {
    pub workflow_id: String,
    #[serde(default)]
    pub workflow_name: Option<String>,
    pub nodes: Vec<WorkflowNode>,
    pub edges: Vec<WorkflowEdge>,
    /// Seed values available to nodes as `{{ context.<key> }}` references.
    #[serde(default)]
    pub context: HashMap<String, Value>,
}

impl WorkflowSubmission {
    /// Split the submission into the graph definition and the seed context.
    pub fn into_parts(self) -> (WorkflowDefinition, HashMap<String, Value>) {
        let name = self
            .workflow_name
            .unwrap_or_else(|| self.workflow_id.clone());
        (
            WorkflowDefinition {
                id: self.workflow_id,
                name,
                nodes: self.nodes,
                edges: self.edges,
            },
            self.context,
        )
    }
}

// ---------------------------------------------------------------------------
// Typed node configurations (mapper output)
// ---------------------------------------------------------------------------

/// Agent node payload: a model invocation under a role contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentNodeConfig {
    /// Role of this agent, also the key into the schema registry.
    #[serde(default)]
    pub agent_type: String,
    /// Model configuration id; empty means "use the current default".
    #[serde(default)]
    pub model_id: String,
    /// Prompt template; may reference upstream outputs.
    #[serde(default)]
    pub prompt: String,
    /// Optional linked prompt template id from the editor's card library.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_card_id: Option<String>,
}

/// Tool node payload: a locally evaluated expression.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolNodeConfig {
    #[serde(default)]
    pub tool_type: String,
    /// Expression body evaluated against `{nodes, context}`.
    #[serde(default)]
    pub function_body: String,
    /// Carried in the contract; unused by the expression tool type.
    #[serde(default)]
    pub model_id: String,
}

/// Data node payload: literal or referenced content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataNodeConfig {
    #[serde(default)]
    pub data_type: String,
    #[serde(default)]
    pub content: String,
}

/// The typed request object a given node kind expects.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedNodeConfig {
    Agent(AgentNodeConfig),
    Tool(ToolNodeConfig),
    Data(DataNodeConfig),
}

// ---------------------------------------------------------------------------
// Run records
// ---------------------------------------------------------------------------

/// Lifecycle state of a workflow run.
///
/// `PENDING -> RUNNING -> {COMPLETE | FAILED}`; there are no other
/// transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Pending,
    Running,
    Complete,
    Failed,
}

impl RunStatus {
    /// True once the run can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Complete | RunStatus::Failed)
    }
}

/// The poll-style status answer for a single run.
///
/// `outputs` grows as nodes complete; outputs already computed remain
/// readable even after a downstream failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub run_id: Uuid,
    pub workflow_id: String,
    pub workflow_name: String,
    pub status: RunStatus,
    /// Node id -> produced output (text or structured value).
    #[serde(default)]
    pub outputs: HashMap<String, Value>,
    /// Normalized message for the node at which the run stopped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl WorkflowRun {
    /// Create a fresh PENDING record for a submission.
    pub fn pending(run_id: Uuid, workflow_id: String, workflow_name: String) -> Self {
        Self {
            run_id,
            workflow_id,
            workflow_name,
            status: RunStatus::Pending,
            outputs: HashMap::new(),
            error: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }
}
