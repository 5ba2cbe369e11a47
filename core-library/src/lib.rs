//! # Episode Library Module
//!
//! Owns the episode catalog and the listener-side features around it.
//!
//! ## Overview
//!
//! This module manages:
//! - Loading the episode feed and answering filtered views of it
//! - Liked episodes, persisted through the host `SettingsStore`
//! - Listener comments and the mail link that notifies the station
//!
//! The catalog is read-only for the playback controller; it only ever
//! receives cloned [`Episode`](models::Episode) values.

pub mod catalog;
pub mod comments;
pub mod error;
pub mod likes;
pub mod models;

pub use catalog::{EpisodeCatalog, EpisodeFilter};
pub use comments::{CommentComposer, CommentReceipt};
pub use error::{LibraryError, Result};
pub use likes::{LikeState, LikeStore, LIKED_EPISODES_KEY};
pub use models::{Comment, Episode, EpisodeFeed};
