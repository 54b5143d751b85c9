//! Typed node configuration mapping.
//!
//! Editor submissions carry each node's settings as a loose JSON blob. This
//! module turns that blob into a [`TypedNodeConfig`] and fills in the gaps a
//! half-configured node leaves behind: an agent node with no model falls back
//! to the registry default, and an empty prompt falls back to a role-specific
//! starter prompt. Every substitution is logged so a run's transcript shows
//! what the engine actually executed.

use inkloom_types::workflow::{
    AgentNodeConfig, DataNodeConfig, NodeKind, ToolNodeConfig, TypedNodeConfig, WorkflowNode,
};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::llm::ModelRegistry;

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

/// Build the typed configuration for a node, applying defaults where the
/// submission left fields empty.
///
/// Malformed config blobs (wrong types, `null`) map to an all-default config
/// rather than failing the node; the defaults below then take over.
pub async fn map_node_config(node: &WorkflowNode, models: &ModelRegistry) -> TypedNodeConfig {
    match node.kind {
        NodeKind::Agent => {
            let mut config: AgentNodeConfig = typed_config(node);
            if config.model_id.is_empty() {
                match models.default_model().await {
                    Ok(default) => {
                        info!(
                            node_id = %node.id,
                            model = %default.name,
                            "agent node has no model configured, using default"
                        );
                        config.model_id = default.id;
                    }
                    Err(error) => {
                        debug!(node_id = %node.id, %error, "no default model to assign");
                    }
                }
            }
            if config.prompt.is_empty() {
                info!(
                    node_id = %node.id,
                    agent_type = %config.agent_type,
                    "agent node has no prompt configured, using role default"
                );
                config.prompt = default_prompt_for(&config.agent_type);
            }
            TypedNodeConfig::Agent(config)
        }
        NodeKind::Tool => TypedNodeConfig::Tool(typed_config::<ToolNodeConfig>(node)),
        NodeKind::Data => TypedNodeConfig::Data(typed_config::<DataNodeConfig>(node)),
    }
}

fn typed_config<T: DeserializeOwned + Default>(node: &WorkflowNode) -> T {
    match serde_json::from_value(node.config.clone()) {
        Ok(config) => config,
        Err(error) => {
            debug!(node_id = %node.id, %error, "malformed node config, using defaults");
            T::default()
        }
    }
}

/// Fallback prompt for an agent role when the node carries none.
///
/// These keep an under-specified workflow runnable; the role schemas still
/// shape the output structure.
pub fn default_prompt_for(agent_type: &str) -> String {
    let prompt = match agent_type {
        "story_architect" => {
            "Design the story: establish the premise, the central themes, and an arc \
             for each major character."
        }
        "world_builder" => {
            "Build the world this story takes place in: the setting, its key locations, \
             and the rules that govern it."
        }
        "chapter_writer" => {
            "Write the next chapter in full, consistent with the outline and everything \
             written so far."
        }
        "continuity_editor" => {
            "Review the draft for continuity problems and list each issue with its \
             location and severity."
        }
        _ => "Complete your assigned part of the writing task.",
    };
    prompt.to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use inkloom_types::model::ModelConfig;
    use serde_json::json;

    fn node(kind: NodeKind, config: serde_json::Value) -> WorkflowNode {
        WorkflowNode {
            id: "n1".to_string(),
            name: "Node".to_string(),
            kind,
            position: None,
            config,
            timeout_secs: None,
            retry: None,
        }
    }

    fn registry_with_default() -> ModelRegistry {
        ModelRegistry::from_configs(vec![ModelConfig {
            id: "cfg-1".to_string(),
            name: "House Model".to_string(),
            model_id: "claude-sonnet-4".to_string(),
            api_key: "sk-test".to_string(),
            api_url: None,
            is_default: true,
        }])
    }

    #[tokio::test]
    async fn agent_config_passes_through_when_complete() {
        let node = node(
            NodeKind::Agent,
            json!({
                "agent_type": "chapter_writer",
                "model_id": "cfg-9",
                "prompt": "Write chapter one."
            }),
        );
        let mapped = map_node_config(&node, &registry_with_default()).await;

        let TypedNodeConfig::Agent(config) = mapped else {
            panic!("expected agent config");
        };
        assert_eq!(config.model_id, "cfg-9");
        assert_eq!(config.prompt, "Write chapter one.");
    }

    #[tokio::test]
    async fn missing_model_id_gets_the_registry_default() {
        let node = node(
            NodeKind::Agent,
            json!({ "agent_type": "chapter_writer", "prompt": "Write." }),
        );
        let mapped = map_node_config(&node, &registry_with_default()).await;

        let TypedNodeConfig::Agent(config) = mapped else {
            panic!("expected agent config");
        };
        assert_eq!(config.model_id, "cfg-1");
    }

    #[tokio::test]
    async fn missing_prompt_gets_a_role_default() {
        let node = node(NodeKind::Agent, json!({ "agent_type": "world_builder" }));
        let mapped = map_node_config(&node, &registry_with_default()).await;

        let TypedNodeConfig::Agent(config) = mapped else {
            panic!("expected agent config");
        };
        assert_eq!(config.prompt, default_prompt_for("world_builder"));
        assert!(!config.prompt.is_empty());
    }

    #[tokio::test]
    async fn empty_registry_leaves_model_id_empty() {
        let node = node(NodeKind::Agent, json!({ "agent_type": "chapter_writer" }));
        let mapped = map_node_config(&node, &ModelRegistry::new()).await;

        let TypedNodeConfig::Agent(config) = mapped else {
            panic!("expected agent config");
        };
        assert!(config.model_id.is_empty());
    }

    #[tokio::test]
    async fn malformed_config_maps_to_defaults() {
        let node = node(NodeKind::Agent, json!("not an object"));
        let mapped = map_node_config(&node, &registry_with_default()).await;

        let TypedNodeConfig::Agent(config) = mapped else {
            panic!("expected agent config");
        };
        // Defaults kick in, then the registry default model is substituted.
        assert_eq!(config.model_id, "cfg-1");
        assert_eq!(config.prompt, default_prompt_for(""));
    }

    #[tokio::test]
    async fn tool_and_data_configs_map_by_kind() {
        let tool = node(
            NodeKind::Tool,
            json!({ "tool_type": "javascript", "function_body": "nodes.a" }),
        );
        let data = node(
            NodeKind::Data,
            json!({ "data_type": "json", "content": "{\"k\":1}" }),
        );
        let registry = registry_with_default();

        let TypedNodeConfig::Tool(tool_config) = map_node_config(&tool, &registry).await else {
            panic!("expected tool config");
        };
        assert_eq!(tool_config.function_body, "nodes.a");

        let TypedNodeConfig::Data(data_config) = map_node_config(&data, &registry).await else {
            panic!("expected data config");
        };
        assert_eq!(data_config.data_type, "json");
    }
}
