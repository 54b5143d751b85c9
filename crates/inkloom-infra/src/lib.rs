//! Infrastructure layer for Inkloom.
//!
//! Contains the concrete implementations behind the traits and stores that
//! `inkloom-core` defines abstractly: HTTP provider adapters (Anthropic
//! Messages API, OpenAI-compatible chat completions), the provider factory,
//! the file-backed model configuration store, and the TOML config loader.

pub mod config;
pub mod llm;
pub mod model_store;
