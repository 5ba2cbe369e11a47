//! Keyboard shortcuts
//!
//! | Code | Action |
//! |---|---|
//! | `Space` | toggle play/pause |
//! | `ArrowLeft` / `ArrowRight` | seek back / forward by the seek step |
//! | `KeyM` | toggle mute |
//! | `Digit1` / `Digit2` / `Digit3` | rate 1.0 / 1.5 / 2.0 |
//!
//! Shortcuts are suppressed while focus is inside a text input.

use crate::controller::PlaybackController;
use crate::error::PlaybackError;
use crate::session::PlaybackRate;
use std::str::FromStr;
use tracing::trace;

/// DOM `KeyboardEvent.code` values with a shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    Space,
    ArrowLeft,
    ArrowRight,
    KeyM,
    Digit1,
    Digit2,
    Digit3,
}

impl FromStr for KeyCode {
    type Err = PlaybackError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code {
            "Space" => Ok(KeyCode::Space),
            "ArrowLeft" => Ok(KeyCode::ArrowLeft),
            "ArrowRight" => Ok(KeyCode::ArrowRight),
            "KeyM" => Ok(KeyCode::KeyM),
            "Digit1" => Ok(KeyCode::Digit1),
            "Digit2" => Ok(KeyCode::Digit2),
            "Digit3" => Ok(KeyCode::Digit3),
            other => Err(PlaybackError::UnsupportedKey(other.to_string())),
        }
    }
}

/// Where keyboard focus was when the key was pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusTarget {
    #[default]
    Document,
    TextInput,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShortcutAction {
    TogglePlayPause,
    SeekBy(f64),
    ToggleMute,
    SetRate(PlaybackRate),
}

impl KeyCode {
    pub fn action(self, seek_step: f64) -> ShortcutAction {
        match self {
            KeyCode::Space => ShortcutAction::TogglePlayPause,
            KeyCode::ArrowLeft => ShortcutAction::SeekBy(-seek_step),
            KeyCode::ArrowRight => ShortcutAction::SeekBy(seek_step),
            KeyCode::KeyM => ShortcutAction::ToggleMute,
            KeyCode::Digit1 => ShortcutAction::SetRate(PlaybackRate::Normal),
            KeyCode::Digit2 => ShortcutAction::SetRate(PlaybackRate::OneAndHalf),
            KeyCode::Digit3 => ShortcutAction::SetRate(PlaybackRate::Double),
        }
    }
}

/// The shortcut for `code`, or `None` when unbound or suppressed.
pub fn shortcut_for(code: &str, focus: FocusTarget, seek_step: f64) -> Option<ShortcutAction> {
    if focus == FocusTarget::TextInput {
        return None;
    }
    code.parse::<KeyCode>().ok().map(|key| key.action(seek_step))
}

impl PlaybackController {
    /// Handle a key press. Returns whether the key was consumed, in which
    /// case the host should suppress its default action.
    pub async fn handle_key(&self, code: &str, focus: FocusTarget) -> bool {
        let Some(action) = shortcut_for(code, focus, self.config().seek_step_secs) else {
            return false;
        };
        trace!(code, ?action, "Keyboard shortcut");

        match action {
            ShortcutAction::TogglePlayPause => self.toggle_play_pause().await,
            ShortcutAction::SeekBy(delta) => self.seek_by(delta),
            ShortcutAction::ToggleMute => self.toggle_mute(),
            ShortcutAction::SetRate(rate) => self.apply_rate(rate),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dom_codes() {
        assert_eq!("Space".parse::<KeyCode>().unwrap(), KeyCode::Space);
        assert_eq!("Digit3".parse::<KeyCode>().unwrap(), KeyCode::Digit3);
        assert!(matches!(
            "KeyK".parse::<KeyCode>(),
            Err(PlaybackError::UnsupportedKey(code)) if code == "KeyK"
        ));
    }

    #[test]
    fn test_arrows_use_seek_step() {
        assert_eq!(
            shortcut_for("ArrowLeft", FocusTarget::Document, 10.0),
            Some(ShortcutAction::SeekBy(-10.0))
        );
        assert_eq!(
            shortcut_for("ArrowRight", FocusTarget::Document, 15.0),
            Some(ShortcutAction::SeekBy(15.0))
        );
    }

    #[test]
    fn test_text_input_suppresses_shortcuts() {
        assert_eq!(shortcut_for("Space", FocusTarget::TextInput, 10.0), None);
        assert_eq!(shortcut_for("KeyM", FocusTarget::TextInput, 10.0), None);
    }

    #[test]
    fn test_digits_map_to_rates() {
        assert_eq!(
            shortcut_for("Digit2", FocusTarget::Document, 10.0),
            Some(ShortcutAction::SetRate(PlaybackRate::OneAndHalf))
        );
    }
}
