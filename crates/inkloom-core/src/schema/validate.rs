//! Required-field validation of agent output against a declared schema.
//!
//! The walk is driven entirely by each object node's `required` list, so the
//! report is deterministic for a given `(data, schema)` pair: same paths,
//! same order, every time. Unknown fields in the data are ignored -- a schema
//! is a minimum-required contract, not an exhaustive one.

use inkloom_types::schema::{Schema, SchemaType, ValidationReport};
use serde_json::Value;

/// Validate `data` against `schema`, reporting every required field that is
/// absent or null at its dotted/indexed path
/// (e.g. `core_elements.character_arcs[0].trigger_event`).
///
/// Purely a reporting pass; repair or re-prompting is the caller's policy.
pub fn validate(data: &Value, schema: &Schema) -> ValidationReport {
    let mut missing = Vec::new();
    check_value(data, schema, "", &mut missing);
    ValidationReport::from_missing(missing)
}

/// Build the structured-output instruction appended to a prompt when a
/// schema is supplied. Providers without a native structured-output mode
/// rely on this instruction alone.
pub fn schema_instruction(schema: &Schema) -> String {
    let rendered =
        serde_json::to_string_pretty(schema).unwrap_or_else(|_| "{}".to_string());
    format!(
        "\n\nYou MUST respond with valid JSON matching this schema. \
         Return ONLY the JSON object, with no prose, markdown fences, or \
         commentary around it.\n\nSchema:\n{rendered}"
    )
}

fn check_value(value: &Value, schema: &Schema, path: &str, missing: &mut Vec<String>) {
    match schema.kind {
        SchemaType::Object => {
            // Only object nodes that declare properties and a required list
            // are walked; everything else is presence-checked by the parent.
            let Some(properties) = &schema.properties else {
                return;
            };
            let Some(required) = &schema.required else {
                return;
            };
            for name in required {
                let field_path = join_path(path, name);
                match value.get(name) {
                    None | Some(Value::Null) => missing.push(field_path),
                    Some(child) => {
                        if let Some(child_schema) = properties.get(name) {
                            check_value(child, child_schema, &field_path, missing);
                        }
                        // Required names without a property entry are
                        // presence-checked only.
                    }
                }
            }
        }
        SchemaType::Array => match value.as_array() {
            None => missing.push(format!("{path} (not an array)")),
            Some(elements) => {
                // An empty array satisfies a required array field.
                if let Some(items) = &schema.items {
                    for (index, element) in elements.iter().enumerate() {
                        check_value(element, items, &format!("{path}[{index}]"), missing);
                    }
                }
            }
        },
        _ => {}
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}
