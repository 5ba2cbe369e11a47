//! User-facing messages and system notifications
//!
//! [`UserNotifier`] is the page-side channel for blocking messages ("could
//! not play this episode"). [`NotificationPresenter`] is the worker-side
//! system notification surface used for push messages.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Page-side user-visible messages.
pub trait UserNotifier: Send + Sync {
    /// Show a blocking error or warning message.
    fn alert(&self, message: &str);

    /// Show a confirmation message.
    fn success(&self, message: &str) {
        self.alert(message);
    }
}

/// A button shown on a system notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl NotificationAction {
    pub fn new(action: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            title: title.into(),
            icon: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

/// Options of a system notification, serialized the way the push payload
/// spells them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOptions {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    pub require_interaction: bool,
    pub actions: Vec<NotificationAction>,
    /// Any other keys of the push payload, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Worker-side system notification surface.
#[async_trait]
pub trait NotificationPresenter: Send + Sync {
    async fn show(&self, options: NotificationOptions) -> Result<()>;

    /// Close the notification with `tag`. Closing an unknown tag is not an
    /// error.
    async fn close(&self, tag: &str) -> Result<()>;
}
