//! Push notifications and notification clicks.
//!
//! A push payload is a JSON object whose keys override the configured
//! template key by key. Anything that is not a usable object falls back to
//! the template unchanged.

use bridge_traits::{NotificationAction, NotificationOptions};
use serde_json::Value;
use tracing::warn;

/// Action id of the button that only closes the notification.
pub const DISMISS_ACTION: &str = "dismiss";

/// Action id of the button that opens the app.
pub const OPEN_ACTION: &str = "open";

const APP_ICON: &str = "/icons/icon-192x192.png";

/// Notification shown when a push carries no usable payload.
pub fn default_template() -> NotificationOptions {
    NotificationOptions {
        title: "Radio App".to_string(),
        body: "A new episode is out!".to_string(),
        icon: APP_ICON.to_string(),
        badge: APP_ICON.to_string(),
        tag: "new-episode".to_string(),
        require_interaction: true,
        actions: vec![
            NotificationAction::new(OPEN_ACTION, "Open app").with_icon(APP_ICON),
            NotificationAction::new(DISMISS_ACTION, "Close"),
        ],
        extra: Default::default(),
    }
}

/// Overlay the keys of a push payload on `template`.
pub fn merge_push_payload(
    template: &NotificationOptions,
    payload: Option<&[u8]>,
) -> NotificationOptions {
    let Some(payload) = payload.filter(|bytes| !bytes.is_empty()) else {
        return template.clone();
    };

    let overrides = match serde_json::from_slice::<Value>(payload) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            warn!(kind = json_kind(&other), "Push payload is not an object, using template");
            return template.clone();
        }
        Err(e) => {
            warn!(error = %e, "Malformed push payload, using template");
            return template.clone();
        }
    };

    let mut merged = match serde_json::to_value(template) {
        Ok(Value::Object(map)) => map,
        _ => return template.clone(),
    };
    merged.extend(overrides);

    match serde_json::from_value(Value::Object(merged)) {
        Ok(options) => options,
        Err(e) => {
            warn!(error = %e, "Push payload has mistyped fields, using template");
            template.clone()
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A click on a shown notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationClick {
    pub tag: String,
    /// Button pressed, `None` for the notification body.
    pub action: Option<String>,
}

impl NotificationClick {
    pub fn body(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            action: None,
        }
    }

    pub fn action(tag: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            action: Some(action.into()),
        }
    }

    pub fn is_dismiss(&self) -> bool {
        self.action.as_deref() == Some(DISMISS_ACTION)
    }
}

/// What handling a click did besides closing the notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Dismissed,
    /// An existing window of the origin was focused.
    Focused(String),
    /// A new window was opened at the app root.
    Opened(String),
    /// Neither focusing nor opening a window worked.
    NoWindow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_payload_uses_template() {
        let template = default_template();
        assert_eq!(merge_push_payload(&template, None), template);
        assert_eq!(merge_push_payload(&template, Some(b"".as_slice())), template);
    }

    #[test]
    fn test_payload_overrides_keys() {
        let template = default_template();
        let payload = br#"{"title":"New Ep","url":"/ep/4"}"#;
        let merged = merge_push_payload(&template, Some(payload.as_slice()));

        assert_eq!(merged.title, "New Ep");
        assert_eq!(merged.body, "A new episode is out!");
        assert_eq!(merged.tag, "new-episode");
        assert_eq!(merged.actions.len(), 2);
        assert_eq!(merged.extra["url"], "/ep/4");
    }

    #[test]
    fn test_unusable_payloads_fall_back() {
        let template = default_template();
        assert_eq!(merge_push_payload(&template, Some(b"not json".as_slice())), template);
        assert_eq!(merge_push_payload(&template, Some(b"[1,2]".as_slice())), template);
        let mistyped = br#"{"title":7}"#;
        assert_eq!(merge_push_payload(&template, Some(mistyped.as_slice())), template);
    }

    #[test]
    fn test_dismiss_click() {
        assert!(NotificationClick::action("new-episode", "dismiss").is_dismiss());
        assert!(!NotificationClick::action("new-episode", "open").is_dismiss());
        assert!(!NotificationClick::body("new-episode").is_dismiss());
    }
}
