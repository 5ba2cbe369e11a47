//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`core-service`, `core-playback`, `core-cache`). Host
//! applications can depend on `radio-workspace` and enable the documented
//! features without wiring each crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_service as service;

#[cfg(feature = "playback")]
pub use core_playback as playback;

#[cfg(feature = "offline-cache")]
pub use core_cache as cache;
