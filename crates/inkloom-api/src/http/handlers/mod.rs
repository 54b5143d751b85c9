//! HTTP request handlers, grouped by resource.

pub mod model;
pub mod system;
pub mod workflow;
