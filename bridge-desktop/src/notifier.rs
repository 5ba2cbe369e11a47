//! Console and logging-only user surfaces
//!
//! A desktop host has no alert dialog, system notification center or
//! browser windows to drive, so these adapters report through `tracing`
//! and keep just enough state for the worker to reason about.

use async_trait::async_trait;
use bridge_traits::{
    error::Result, ClientWindow, ClientWindows, NotificationOptions, NotificationPresenter,
    UserNotifier,
};
use parking_lot::Mutex;
use tracing::{info, warn};
use url::Url;

/// Writes user-visible messages to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl UserNotifier for ConsoleNotifier {
    fn alert(&self, message: &str) {
        warn!(target: "radio::alert", "{}", message);
    }

    fn success(&self, message: &str) {
        info!(target: "radio::alert", "{}", message);
    }
}

/// Logs notifications and remembers which tags are open.
#[derive(Debug, Default)]
pub struct LoggingNotificationPresenter {
    open: Mutex<Vec<NotificationOptions>>,
}

impl LoggingNotificationPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications shown and not closed yet.
    pub fn open_notifications(&self) -> Vec<NotificationOptions> {
        self.open.lock().clone()
    }
}

#[async_trait]
impl NotificationPresenter for LoggingNotificationPresenter {
    async fn show(&self, options: NotificationOptions) -> Result<()> {
        info!(title = %options.title, body = %options.body, tag = %options.tag, "Notification");
        let mut open = self.open.lock();
        // Same tag replaces the previous notification
        open.retain(|shown| shown.tag != options.tag);
        open.push(options);
        Ok(())
    }

    async fn close(&self, tag: &str) -> Result<()> {
        self.open.lock().retain(|shown| shown.tag != tag);
        Ok(())
    }
}

/// A single-process stand-in for the browser's window list.
#[derive(Debug)]
pub struct DesktopWindows {
    origin: Url,
    windows: Mutex<Vec<ClientWindow>>,
    next_id: Mutex<u64>,
}

impl DesktopWindows {
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            windows: Mutex::new(Vec::new()),
            next_id: Mutex::new(1),
        }
    }

    pub fn windows(&self) -> Vec<ClientWindow> {
        self.windows.lock().clone()
    }
}

#[async_trait]
impl ClientWindows for DesktopWindows {
    async fn claim(&self) -> Result<()> {
        info!(windows = self.windows.lock().len(), "Claimed open windows");
        Ok(())
    }

    async fn match_all_windows(&self) -> Result<Vec<ClientWindow>> {
        Ok(self.windows())
    }

    async fn focus(&self, id: &str) -> Result<()> {
        let mut windows = self.windows.lock();
        if !windows.iter().any(|window| window.id == id) {
            warn!(id, "Focus requested for unknown window");
        }
        for window in windows.iter_mut() {
            window.focused = window.id == id;
        }
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<ClientWindow> {
        let url = self
            .origin
            .join(url)
            .map(String::from)
            .unwrap_or_else(|_| url.to_string());
        let id = {
            let mut next_id = self.next_id.lock();
            let id = format!("window-{}", *next_id);
            *next_id += 1;
            id
        };

        let window = ClientWindow {
            id,
            url,
            focused: true,
        };
        info!(id = %window.id, url = %window.url, "Opened window");

        let mut windows = self.windows.lock();
        for other in windows.iter_mut() {
            other.focused = false;
        }
        windows.push(window.clone());
        Ok(window)
    }
}
