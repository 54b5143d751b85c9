//! Execution context: prior node outputs plus reference resolution.
//!
//! `ExecutionContext` is the append-only state of one run. Downstream nodes
//! reference upstream outputs (and submission seed values) inside prompts
//! with `{{ ... }}` markers; unresolved references substitute an empty
//! string rather than failing the node. That permissive default can mask
//! authoring mistakes, so every empty substitution is logged.

use std::collections::HashMap;

use serde_json::{json, Value};
use tracing::debug;

// ---------------------------------------------------------------------------
// ExecutionContext
// ---------------------------------------------------------------------------

/// Per-run output map, owned exclusively by one execution.
///
/// Reference forms understood by [`resolve`](Self::resolve):
/// - `{{ nodes.<id> }}` (or `{{ nodes.<id>.output }}`) -- a node output
/// - `{{ context.<key> }}` -- a submission seed value
/// - `{{ <id> }}` -- bare reference, tried against outputs then seed
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    outputs: HashMap<String, Value>,
    seed: HashMap<String, Value>,
}

impl ExecutionContext {
    /// Start a context from the submission's seed values.
    pub fn new(seed: HashMap<String, Value>) -> Self {
        Self {
            outputs: HashMap::new(),
            seed,
        }
    }

    /// Record a completed node's output.
    pub fn insert(&mut self, node_id: impl Into<String>, output: Value) {
        self.outputs.insert(node_id.into(), output);
    }

    pub fn get(&self, node_id: &str) -> Option<&Value> {
        self.outputs.get(node_id)
    }

    pub fn outputs(&self) -> &HashMap<String, Value> {
        &self.outputs
    }

    pub fn into_outputs(self) -> HashMap<String, Value> {
        self.outputs
    }

    /// Replace every `{{ ... }}` marker in `template` with its resolved
    /// value. Unresolved references become the empty string; an
    /// unterminated marker is kept as literal text.
    pub fn resolve(&self, template: &str) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find("}}") {
                Some(end) => {
                    result.push_str(&self.lookup(after[..end].trim()));
                    rest = &after[end + 2..];
                }
                None => {
                    result.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        result.push_str(rest);
        result
    }

    fn lookup(&self, expression: &str) -> String {
        if let Some(reference) = expression.strip_prefix("nodes.") {
            let id = reference.strip_suffix(".output").unwrap_or(reference);
            return match self.outputs.get(id) {
                Some(value) => value_to_string(value),
                None => {
                    debug!(reference = %expression, "unresolved node reference, substituting empty string");
                    String::new()
                }
            };
        }
        if let Some(key) = expression.strip_prefix("context.") {
            return match self.seed.get(key) {
                Some(value) => value_to_string(value),
                None => {
                    debug!(reference = %expression, "unresolved context reference, substituting empty string");
                    String::new()
                }
            };
        }
        match self
            .outputs
            .get(expression)
            .or_else(|| self.seed.get(expression))
        {
            Some(value) => value_to_string(value),
            None => {
                debug!(reference = %expression, "unresolved reference, substituting empty string");
                String::new()
            }
        }
    }

    /// Build the JSON object tool-node expressions evaluate against.
    ///
    /// Shape:
    /// ```json
    /// { "nodes": { "<node_id>": <output>, ... }, "context": { ... } }
    /// ```
    pub fn as_jexl_context(&self) -> Value {
        json!({
            "nodes": self.outputs,
            "context": self.seed,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Convert a JSON value to its prompt-substitution string. Strings pass
/// through raw (no quotes), null becomes empty, everything else renders as
/// compact JSON.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
