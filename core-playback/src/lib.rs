//! # Playback Session Module
//!
//! The page-side playback core.
//!
//! ## Overview
//!
//! This module handles:
//! - The playback session model and its transport states
//! - A dispatch table mapping audio lifecycle events to pure transitions
//! - The [`PlaybackController`] that owns the audio element
//! - Keyboard shortcuts and the media-session bridge
//!
//! One controller exists per page load. It is constructed explicitly and
//! handed to whichever views need it.

pub mod config;
pub mod controller;
pub mod error;
pub mod keyboard;
pub mod media_session;
pub mod session;
pub mod transitions;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use config::{LoadRetryPolicy, MediaLabels, PlaybackConfig};
pub use controller::{LoadOutcome, PlaybackController};
pub use error::{PlaybackError, Result};
pub use keyboard::{FocusTarget, KeyCode, ShortcutAction};
pub use media_session::MediaSessionBridge;
pub use session::{PlaybackRate, PlaybackSession, TransportState};
pub use transitions::{Effect, PLAYBACK_ERROR_MESSAGE, PLAY_FAILED_MESSAGE};
