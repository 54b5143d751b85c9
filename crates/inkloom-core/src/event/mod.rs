//! Event distribution for workflow runs.
//!
//! Provides an `EventBus` that distributes `RunEvent` records to all
//! subscribers via a `tokio::sync::broadcast` channel.

pub mod bus;

pub use bus::EventBus;
