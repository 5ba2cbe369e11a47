//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the player crates:
//! - Logging and tracing setup
//! - Configuration and bridge injection
//! - Event bus
//!
//! Every other core crate depends on this one for its logging conventions
//! and for the event types it publishes.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
