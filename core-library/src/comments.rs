//! Listener comments
//!
//! Comments are appended to the episode in the catalog and announced to the
//! station through a `mailto:` link the host opens.

use crate::catalog::EpisodeCatalog;
use crate::error::{LibraryError, Result};
use crate::models::{Comment, Episode};
use bridge_traits::Clock;
use core_runtime::events::CatalogEvent;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Author label used for comments from this device.
pub const DEFAULT_AUTHOR: &str = "Listener";

/// Outcome of a submitted comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentReceipt {
    pub comment: Comment,
    pub comment_count: usize,
    /// Link the host should open to notify the station, when a recipient is
    /// configured.
    pub mailto: Option<String>,
}

pub struct CommentComposer {
    clock: Arc<dyn Clock>,
    recipient: Option<String>,
    author: String,
}

impl CommentComposer {
    pub fn new(clock: Arc<dyn Clock>, recipient: Option<String>) -> Self {
        Self {
            clock,
            recipient,
            author: DEFAULT_AUTHOR.to_string(),
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Build a comment for `episode` from raw input text.
    pub fn compose(&self, episode: &Episode, text: &str) -> Result<Comment> {
        let text = text.trim();
        if text.is_empty() {
            return Err(LibraryError::InvalidInput {
                field: "text".to_string(),
                message: "Please enter a comment".to_string(),
            });
        }

        Ok(Comment {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            author: self.author.clone(),
            date: self.clock.now(),
            episode_id: episode.id.clone(),
        })
    }

    /// Notification link for `comment`, or `None` without a recipient.
    pub fn mailto_link(&self, episode: &Episode, comment: &Comment) -> Option<String> {
        let recipient = self.recipient.as_deref()?;
        let subject = format!("Radio app - new comment: {}", episode.title);
        let body = format!(
            "Episode: {}\nComment: {}\nAuthor: {}\nDate: {}",
            episode.title,
            comment.text,
            comment.author,
            comment.date.format("%Y-%m-%d %H:%M UTC"),
        );

        Some(format!(
            "mailto:{}?subject={}&body={}",
            recipient,
            urlencoding::encode(&subject),
            urlencoding::encode(&body)
        ))
    }

    /// Validate, append to the episode and build the notification link.
    pub fn submit(
        &self,
        catalog: &EpisodeCatalog,
        episode_id: &str,
        text: &str,
    ) -> Result<CommentReceipt> {
        let episode = catalog
            .find(episode_id)
            .ok_or_else(|| LibraryError::episode_not_found(episode_id))?;
        let comment = self.compose(&episode, text)?;

        let updated = catalog.update(episode_id, |episode| {
            episode.comments.push(comment.clone());
        })?;

        info!(episode_id, comment_id = %comment.id, "Comment added");
        catalog.emit(CatalogEvent::CommentAdded {
            episode_id: episode_id.to_string(),
            comment_id: comment.id.clone(),
        });

        Ok(CommentReceipt {
            mailto: self.mailto_link(&updated, &comment),
            comment_count: updated.comment_count(),
            comment,
        })
    }
}
