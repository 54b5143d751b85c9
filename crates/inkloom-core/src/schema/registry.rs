//! Static mapping from agent role to the output schema that role must
//! satisfy.
//!
//! Built once at startup with the built-in writing roles and immutable
//! afterwards; the engine queries it by `agent_type` before validating an
//! agent node's parsed output.

use std::collections::HashMap;

use inkloom_types::schema::Schema;

/// Role -> output schema lookup table.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Schema>,
}

impl SchemaRegistry {
    /// An empty registry. Roles without a registered schema skip validation.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in long-form writing roles.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("story_architect", story_architect_schema());
        registry.register("world_builder", world_builder_schema());
        registry.register("chapter_writer", chapter_writer_schema());
        registry.register("continuity_editor", continuity_editor_schema());
        registry
    }

    pub fn register(&mut self, role: impl Into<String>, schema: Schema) {
        self.schemas.insert(role.into(), schema);
    }

    pub fn get(&self, role: &str) -> Option<&Schema> {
        self.schemas.get(role)
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }
}

fn story_architect_schema() -> Schema {
    Schema::object(
        [
            ("title", Schema::string()),
            (
                "core_elements",
                Schema::object(
                    [
                        ("premise", Schema::string()),
                        ("themes", Schema::array(Schema::string())),
                        (
                            "character_arcs",
                            Schema::array(Schema::object(
                                [
                                    ("character_name", Schema::string()),
                                    ("arc_summary", Schema::string()),
                                    ("trigger_event", Schema::string()),
                                ],
                                ["character_name", "arc_summary", "trigger_event"],
                            )),
                        ),
                    ],
                    ["premise", "character_arcs"],
                ),
            ),
        ],
        ["title", "core_elements"],
    )
}

fn world_builder_schema() -> Schema {
    Schema::object(
        [
            ("setting", Schema::string()),
            (
                "locations",
                Schema::array(Schema::object(
                    [
                        ("name", Schema::string()),
                        ("description", Schema::string()),
                    ],
                    ["name", "description"],
                )),
            ),
            ("rules", Schema::array(Schema::string())),
        ],
        ["setting", "locations"],
    )
}

fn chapter_writer_schema() -> Schema {
    Schema::object(
        [("title", Schema::string()), ("body", Schema::string())],
        ["title", "body"],
    )
}

fn continuity_editor_schema() -> Schema {
    Schema::object(
        [
            (
                "issues",
                Schema::array(Schema::object(
                    [
                        ("location", Schema::string()),
                        ("description", Schema::string()),
                        ("severity", Schema::string()),
                    ],
                    ["location", "description"],
                )),
            ),
            ("revised_text", Schema::string()),
        ],
        ["issues"],
    )
}
