//! JEXL expression evaluator for tool nodes.
//!
//! Wraps `jexl_eval::Evaluator` with pre-registered text transforms and
//! evaluates a tool node's expression against the run's context object.
//!
//! **Security note:** node outputs are always passed as context objects,
//! NEVER interpolated into expression strings.

use serde_json::{Value, json};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur during expression evaluation.
#[derive(Debug, thiserror::Error)]
pub enum ExpressionError {
    #[error("expression evaluation failed: {0}")]
    EvalFailed(String),

    #[error("invalid context: {0}")]
    InvalidContext(String),
}

// ---------------------------------------------------------------------------
// ToolEvaluator
// ---------------------------------------------------------------------------

/// JEXL expression evaluator with standard transforms pre-registered.
///
/// Tool nodes reference prior outputs as `nodes.<id>` and the seed context as
/// `context.<key>`, e.g. `nodes.draft.body|length` or
/// `nodes.outline.title|upper`.
pub struct ToolEvaluator {
    evaluator: jexl_eval::Evaluator<'static>,
}

impl ToolEvaluator {
    /// Create a new evaluator with all standard transforms registered.
    pub fn new() -> Self {
        let evaluator = jexl_eval::Evaluator::new()
            // String transforms
            .with_transform("lower", |args: &[Value]| {
                let s = args.first().and_then(|v| v.as_str()).unwrap_or("");
                Ok(json!(s.to_lowercase()))
            })
            .with_transform("upper", |args: &[Value]| {
                let s = args.first().and_then(|v| v.as_str()).unwrap_or("");
                Ok(json!(s.to_uppercase()))
            })
            .with_transform("trim", |args: &[Value]| {
                let s = args.first().and_then(|v| v.as_str()).unwrap_or("");
                Ok(json!(s.trim()))
            })
            .with_transform("split", |args: &[Value]| {
                let s = args.first().and_then(|v| v.as_str()).unwrap_or("");
                let delimiter = args.get(1).and_then(|v| v.as_str()).unwrap_or(",");
                let parts: Vec<&str> = s.split(delimiter).collect();
                Ok(json!(parts))
            })
            .with_transform("join", |args: &[Value]| {
                let parts: Vec<String> = args
                    .first()
                    .and_then(|v| v.as_array())
                    .map(|items| {
                        items
                            .iter()
                            .map(|item| match item {
                                Value::String(s) => s.clone(),
                                other => other.to_string(),
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                let separator = args.get(1).and_then(|v| v.as_str()).unwrap_or("\n\n");
                Ok(json!(parts.join(separator)))
            })
            // Boolean transforms
            .with_transform("not", |args: &[Value]| {
                let val = args.first().cloned().unwrap_or(Value::Null);
                Ok(json!(!is_truthy(&val)))
            })
            // String search transforms
            .with_transform("contains", |args: &[Value]| {
                let subject = args.first().and_then(|v| v.as_str()).unwrap_or("");
                let search = args.get(1).and_then(|v| v.as_str()).unwrap_or("");
                Ok(json!(subject.contains(search)))
            })
            .with_transform("startsWith", |args: &[Value]| {
                let subject = args.first().and_then(|v| v.as_str()).unwrap_or("");
                let prefix = args.get(1).and_then(|v| v.as_str()).unwrap_or("");
                Ok(json!(subject.starts_with(prefix)))
            })
            .with_transform("endsWith", |args: &[Value]| {
                let subject = args.first().and_then(|v| v.as_str()).unwrap_or("");
                let suffix = args.get(1).and_then(|v| v.as_str()).unwrap_or("");
                Ok(json!(subject.ends_with(suffix)))
            })
            // Length transform (works on strings, arrays, and objects)
            .with_transform("length", |args: &[Value]| {
                let val = args.first().cloned().unwrap_or(Value::Null);
                let len = match &val {
                    Value::String(s) => s.len(),
                    Value::Array(a) => a.len(),
                    Value::Object(o) => o.len(),
                    _ => 0,
                };
                Ok(json!(len as f64))
            });

        Self { evaluator }
    }

    /// Evaluate an expression and return the raw JSON value.
    pub fn evaluate(&self, expression: &str, context: &Value) -> Result<Value, ExpressionError> {
        if !context.is_object() {
            return Err(ExpressionError::InvalidContext(
                "context must be a JSON object".to_string(),
            ));
        }

        self.evaluator
            .eval_in_context(expression, context)
            .map_err(|e| ExpressionError::EvalFailed(e.to_string()))
    }
}

impl Default for ToolEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// JavaScript-like truthiness for transform arguments.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().unwrap_or(0.0) != 0.0,
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn evaluator() -> ToolEvaluator {
        ToolEvaluator::new()
    }

    #[test]
    fn dot_notation_reaches_node_outputs() {
        let ctx = json!({
            "nodes": {
                "outline": { "title": "The Glass Meridian" }
            },
            "context": {}
        });
        let result = evaluator()
            .evaluate("nodes.outline.title", &ctx)
            .unwrap();
        assert_eq!(result, json!("The Glass Meridian"));
    }

    #[test]
    fn array_indexing() {
        let ctx = json!({ "nodes": { "outline": { "themes": ["loss", "memory"] } } });
        let result = evaluator()
            .evaluate("nodes.outline.themes[1]", &ctx)
            .unwrap();
        assert_eq!(result, json!("memory"));
    }

    #[test]
    fn transform_chaining() {
        let ctx = json!({ "nodes": { "a": "  Hello World  " } });
        let result = evaluator().evaluate("nodes.a|trim|lower", &ctx).unwrap();
        assert_eq!(result, json!("hello world"));
    }

    #[test]
    fn upper_and_length() {
        let ctx = json!({ "nodes": { "a": "hello" } });
        let eval = evaluator();
        assert_eq!(eval.evaluate("nodes.a|upper", &ctx).unwrap(), json!("HELLO"));
        assert_eq!(eval.evaluate("nodes.a|length", &ctx).unwrap(), json!(5.0));
    }

    #[test]
    fn split_and_join() {
        let ctx = json!({ "nodes": { "csv": "a,b,c" } });
        let eval = evaluator();
        assert_eq!(
            eval.evaluate("nodes.csv|split(',')", &ctx).unwrap(),
            json!(["a", "b", "c"])
        );
        assert_eq!(
            eval.evaluate("nodes.csv|split(',')|join('-')", &ctx).unwrap(),
            json!("a-b-c")
        );
    }

    #[test]
    fn search_transforms() {
        let ctx = json!({ "nodes": { "msg": "chapter three: the storm" } });
        let eval = evaluator();
        assert_eq!(
            eval.evaluate("nodes.msg|contains('storm')", &ctx).unwrap(),
            json!(true)
        );
        assert_eq!(
            eval.evaluate("nodes.msg|startsWith('chapter')", &ctx).unwrap(),
            json!(true)
        );
        assert_eq!(
            eval.evaluate("nodes.msg|endsWith('calm')", &ctx).unwrap(),
            json!(false)
        );
    }

    #[test]
    fn not_transform_uses_truthiness() {
        let eval = evaluator();
        let ctx = json!({ "nodes": { "flag": "" } });
        assert_eq!(eval.evaluate("(nodes.flag)|not", &ctx).unwrap(), json!(true));
        let ctx = json!({ "nodes": { "flag": "yes" } });
        assert_eq!(eval.evaluate("(nodes.flag)|not", &ctx).unwrap(), json!(false));
    }

    #[test]
    fn ternary_expression() {
        let ctx = json!({ "nodes": { "draft": { "words": 12000.0 } } });
        let result = evaluator()
            .evaluate("(nodes.draft.words > 10000) ? 'novella' : 'short'", &ctx)
            .unwrap();
        assert_eq!(result, json!("novella"));
    }

    #[test]
    fn seed_context_is_reachable() {
        let ctx = json!({ "nodes": {}, "context": { "genre": "noir" } });
        let result = evaluator().evaluate("context.genre", &ctx).unwrap();
        assert_eq!(result, json!("noir"));
    }

    #[test]
    fn missing_property_is_null() {
        let ctx = json!({ "nodes": {} });
        let result = evaluator().evaluate("nodes.ghost", &ctx).unwrap();
        assert_eq!(result, json!(null));
    }

    #[test]
    fn non_object_context_is_rejected() {
        let ctx = json!("not an object");
        assert!(evaluator().evaluate("true", &ctx).is_err());
    }

    #[test]
    fn eval_failure_surfaces_as_error() {
        let ctx = json!({ "nodes": {} });
        let result = evaluator().evaluate("|||", &ctx);
        assert!(matches!(result, Err(ExpressionError::EvalFailed(_))));
    }
}
