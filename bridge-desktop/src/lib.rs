//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`, with relative URLs resolved against the
//!   app origin
//! - `SettingsStore` using a SQLite-backed key-value store
//! - `UserNotifier` writing alerts to the log
//! - `NotificationPresenter` and `ClientWindows` that log instead of
//!   driving a browser
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, SqliteSettingsStore};
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let http = ReqwestHttpClient::new()?.with_base_url(origin);
//!     let settings = SqliteSettingsStore::new("settings.db".into()).await?;
//!     // Hand both to CoreConfig::builder()
//!     Ok(())
//! }
//! ```

mod http;
mod notifier;
mod settings;

pub use http::ReqwestHttpClient;
pub use notifier::{ConsoleNotifier, DesktopWindows, LoggingNotificationPresenter};
pub use settings::SqliteSettingsStore;
