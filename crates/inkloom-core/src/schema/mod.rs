//! Output schema validation and the role schema registry.
//!
//! - `validate` -- pure required-field walk producing a `ValidationReport`
//! - `registry` -- static mapping from agent role to its output `Schema`

pub mod registry;
pub mod validate;

pub use registry::SchemaRegistry;
pub use validate::{schema_instruction, validate};
