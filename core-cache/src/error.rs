//! # Cache Error Types

use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    // ========================================================================
    // Storage Errors
    // ========================================================================
    /// A write would grow the cache past its byte quota.
    #[error("Cache quota exceeded: {needed} bytes needed, {available} available")]
    QuotaExceeded { needed: u64, available: u64 },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// A manifest entry could not be fetched during install.
    #[error("Failed to pre-cache {url}: {reason}")]
    ManifestEntry { url: String, reason: String },

    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    #[error("Malformed worker message: {0}")]
    MalformedMessage(String),

    /// The worker task is gone.
    #[error("Cache worker stopped")]
    WorkerClosed,

    // ========================================================================
    // Generic Errors
    // ========================================================================
    #[error("Invalid cache configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<CacheError> for BridgeError {
    fn from(error: CacheError) -> Self {
        match error {
            CacheError::Bridge(inner) => inner,
            CacheError::WorkerClosed => BridgeError::NotAvailable(error.to_string()),
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
