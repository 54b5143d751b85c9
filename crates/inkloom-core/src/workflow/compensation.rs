//! Structured-output recovery for agent nodes.
//!
//! Providers asked for JSON frequently wrap it in markdown fences or stray
//! prose, and sometimes omit required fields entirely. This module pulls the
//! structured payload out of a raw completion, builds the follow-up prompt
//! that asks for exactly the fields a validation pass found missing, and
//! merges the follow-up's answer back into the original output.

use serde_json::Value;

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract a JSON object or array from a raw completion.
///
/// Tries, in order: the whole text as JSON, the first ```json fenced block,
/// and finally the outermost `{...}` slice. Scalar-only completions ("42",
/// "true") are treated as prose, not structure.
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(value) = parse_structured(trimmed) {
        return Some(value);
    }

    if let Some(fenced) = fenced_block(trimmed) {
        if let Some(value) = parse_structured(fenced) {
            return Some(value);
        }
    }

    let first = trimmed.find('{')?;
    let last = trimmed.rfind('}')?;
    if last <= first {
        return None;
    }
    parse_structured(&trimmed[first..=last])
}

fn parse_structured(candidate: &str) -> Option<Value> {
    serde_json::from_str::<Value>(candidate)
        .ok()
        .filter(|value| value.is_object() || value.is_array())
}

fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```json").map(|at| at + "```json".len()).or_else(|| {
        text.find("```").map(|at| at + "```".len())
    })?;
    let rest = &text[start..];
    let end = rest.find("```")?;
    Some(rest[..end].trim())
}

// ---------------------------------------------------------------------------
// Follow-up prompt
// ---------------------------------------------------------------------------

/// Build the follow-up prompt asking the model to supply only the fields the
/// last response was missing.
pub fn build_compensation_prompt(
    original_prompt: &str,
    raw_output: &str,
    missing: &[String],
) -> String {
    let mut fields = String::new();
    for path in missing {
        fields.push_str("- ");
        fields.push_str(path);
        fields.push('\n');
    }

    format!(
        "Your previous response to the request below was missing required fields.\n\n\
         Original request:\n{original_prompt}\n\n\
         Your previous response:\n{raw_output}\n\n\
         The following required fields were missing or null:\n{fields}\n\
         Respond with a JSON object containing ONLY these missing fields, filled with \
         appropriate values consistent with your previous response. Do not repeat fields \
         you already provided. Return ONLY the JSON object, with no prose or markdown \
         fences around it."
    )
}

// ---------------------------------------------------------------------------
// Merging
// ---------------------------------------------------------------------------

/// Deep-merge `patch` into `base`.
///
/// Objects merge key by key, recursing where both sides hold objects; any
/// other pairing overwrites the base value. Arrays overwrite wholesale so a
/// follow-up can replace an incomplete list.
pub fn merge_outputs(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_outputs(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
