//! HTTP layer: Axum router, handlers, and the envelope response format.
//!
//! The API serves the external workflow editor. All endpoints live under
//! `/api/v1` and return [`response::ApiResponse`] envelopes; run progress
//! is additionally available as an SSE stream.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
