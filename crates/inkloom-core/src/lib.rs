//! Engine logic and provider trait definitions for Inkloom.
//!
//! This crate defines the "ports" (the `LlmProvider` trait and its factory)
//! that the infrastructure layer implements, plus everything that runs on
//! top of them: output schema validation, the resilience shell (cache,
//! exclusive-dispatch gate, retry with backoff), the DAG workflow engine,
//! and the execution event bus. It depends only on `inkloom-types` -- never
//! on `inkloom-infra` or any HTTP/IO crate.

pub mod event;
pub mod llm;
pub mod resilience;
pub mod schema;
pub mod workflow;
