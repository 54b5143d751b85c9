//! Shared domain types for Inkloom.
//!
//! This crate contains the types that cross layer boundaries: the workflow
//! graph and its submission contract, typed node configurations, model
//! provider configuration, output schemas, execution events, run records,
//! and the associated error types.
//!
//! Zero infrastructure dependencies -- only serde, serde_json, uuid, chrono,
//! thiserror.

pub mod config;
pub mod error;
pub mod event;
pub mod llm;
pub mod model;
pub mod schema;
pub mod workflow;
