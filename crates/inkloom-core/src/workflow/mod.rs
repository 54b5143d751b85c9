//! Workflow engine core: graph planning, node dispatch, and output repair.
//!
//! This module contains the "brain" of the engine:
//! - `dag` -- graph validation, cycle detection, order/wave planning
//! - `context` -- execution context with output tracking and `{{ ref }}` resolution
//! - `node_config` -- typed node configuration mapping with logged defaults
//! - `expression` -- JEXL evaluator for tool nodes
//! - `compensation` -- structured-output extraction, follow-up prompts, merging
//! - `executor` -- the `WorkflowEngine` run loop

pub mod compensation;
pub mod context;
pub mod dag;
pub mod executor;
pub mod expression;
pub mod node_config;

pub use context::ExecutionContext;
pub use dag::{ExecutionPlan, plan, validate};
pub use executor::WorkflowEngine;
pub use node_config::map_node_config;
