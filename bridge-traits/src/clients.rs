//! Controlled client windows
//!
//! The offline worker's view of the pages it serves: it claims them once
//! activated and focuses or opens one when a notification is clicked.

use async_trait::async_trait;

use crate::error::Result;

/// An open application window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientWindow {
    pub id: String,
    pub url: String,
    pub focused: bool,
}

#[async_trait]
pub trait ClientWindows: Send + Sync {
    /// Take control of every open page of the origin.
    async fn claim(&self) -> Result<()>;

    /// All window clients, including ones not yet controlled.
    async fn match_all_windows(&self) -> Result<Vec<ClientWindow>>;

    async fn focus(&self, id: &str) -> Result<()>;

    async fn open_window(&self, url: &str) -> Result<ClientWindow>;
}
