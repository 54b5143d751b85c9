//! Output schemas and validation reports.
//!
//! A [`Schema`] is a recursive tree describing the exact JSON shape an
//! agent's output must satisfy. Schemas are authored as static templates at
//! startup and immutable thereafter; the validator in `inkloom-core` walks
//! them as a minimum-required contract (unknown fields are ignored).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The JSON type a schema node declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Object,
    Array,
    String,
    Integer,
    Number,
    Boolean,
}

/// A recursive schema node.
///
/// Only `object` nodes that declare `properties` are recursed into by the
/// validator; `required` lists the property names that must be present and
/// non-null. `items` describes array elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "type")]
    pub kind: SchemaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, Schema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

impl Schema {
    /// A scalar string node.
    pub fn string() -> Self {
        Self::scalar(SchemaType::String)
    }

    /// A scalar integer node.
    pub fn integer() -> Self {
        Self::scalar(SchemaType::Integer)
    }

    /// A scalar number node.
    pub fn number() -> Self {
        Self::scalar(SchemaType::Number)
    }

    /// A scalar boolean node.
    pub fn boolean() -> Self {
        Self::scalar(SchemaType::Boolean)
    }

    fn scalar(kind: SchemaType) -> Self {
        Self {
            kind,
            properties: None,
            items: None,
            required: None,
        }
    }

    /// An array node with the given element schema.
    pub fn array(items: Schema) -> Self {
        Self {
            kind: SchemaType::Array,
            properties: None,
            items: Some(Box::new(items)),
            required: None,
        }
    }

    /// An object node with named properties and a required list.
    ///
    /// `required` order is preserved and drives the order of missing-field
    /// reports.
    pub fn object<I, R>(properties: I, required: R) -> Self
    where
        I: IntoIterator<Item = (&'static str, Schema)>,
        R: IntoIterator<Item = &'static str>,
    {
        let properties: BTreeMap<String, Schema> = properties
            .into_iter()
            .map(|(name, schema)| (name.to_string(), schema))
            .collect();
        let required: Vec<String> = required.into_iter().map(str::to_string).collect();
        Self {
            kind: SchemaType::Object,
            properties: Some(properties),
            items: None,
            required: if required.is_empty() {
                None
            } else {
                Some(required)
            },
        }
    }
}

/// The validator's answer: whether the data satisfies the schema, and the
/// dotted/indexed paths of every required field that is missing or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub missing_fields: Vec<String>,
}

impl ValidationReport {
    /// A report with no missing fields.
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            missing_fields: Vec::new(),
        }
    }

    /// Build a report from collected missing paths.
    pub fn from_missing(missing_fields: Vec<String>) -> Self {
        Self {
            is_valid: missing_fields.is_empty(),
            missing_fields,
        }
    }
}
