//! Error types for session operations.

use std::sync::Arc;

use dotconnect_chain::ChainError;
use thiserror::Error;

/// Errors surfaced by connect and related session operations.
///
/// `Clone` so that one in-flight extension enable can report the same
/// outcome to every caller waiting on it. Chain failures keep the typed
/// [`ChainError`] behind an `Arc` for the same reason.
#[derive(Error, Debug, Clone)]
pub enum SessionError {
    /// Another connect is still running on this adapter.
    #[error("A connection attempt is already in progress")]
    ConnectInProgress,

    /// No extension runtime, extension not installed, enable rejected or no accounts.
    #[error("Wallet extension unavailable: {0}")]
    ExtensionUnavailable(String),

    /// The account selection was cancelled or failed.
    #[error("Account selection cancelled: {0}")]
    SelectionCancelled(String),

    /// Unknown network or a network without endpoints.
    #[error("Configuration error: {0}")]
    Configuration(Arc<ChainError>),

    /// Subscribing to account changes failed.
    #[error("Account subscription failed: {0}")]
    Subscription(String),

    #[error("Chain error: {0}")]
    Chain(Arc<ChainError>),
}

impl SessionError {
    /// The chain error behind a configuration or chain failure.
    pub fn chain_error(&self) -> Option<&ChainError> {
        match self {
            SessionError::Configuration(e) | SessionError::Chain(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ChainError> for SessionError {
    fn from(e: ChainError) -> Self {
        if e.is_configuration() {
            SessionError::Configuration(Arc::new(e))
        } else {
            SessionError::Chain(Arc::new(e))
        }
    }
}

// ChainError wraps subxt errors that have no equality, so chain failures
// compare by message.
impl PartialEq for SessionError {
    fn eq(&self, other: &Self) -> bool {
        use SessionError::*;
        match (self, other) {
            (ConnectInProgress, ConnectInProgress) => true,
            (ExtensionUnavailable(a), ExtensionUnavailable(b))
            | (SelectionCancelled(a), SelectionCancelled(b))
            | (Subscription(a), Subscription(b)) => a == b,
            (Configuration(a), Configuration(b)) | (Chain(a), Chain(b)) => {
                Arc::ptr_eq(a, b) || a.to_string() == b.to_string()
            }
            _ => false,
        }
    }
}

impl Eq for SessionError {}

/// Error reported by an extension collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ExtensionError(pub String);

impl ExtensionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
