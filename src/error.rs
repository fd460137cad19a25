//! Error types for proctor-alert

use crate::types::{AlertId, SessionId, SessionStatus};
use thiserror::Error;

/// Errors that can occur in the alert core
#[derive(Debug, Error)]
pub enum AlertError {
    /// Alert store append/query failure
    ///
    /// An append failure is fatal to that alert — it is never delivered
    /// without an id.
    #[error("Store error: {0}")]
    Store(String),

    /// Referenced session does not exist
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    /// Referenced alert does not exist
    #[error("Alert not found: {0}")]
    AlertNotFound(AlertId),

    /// Session creation attempted without a prior identity verification
    #[error("Identity must be verified before starting a monitored session")]
    IdentityUnverified,

    /// Transition attempted out of a terminal session state
    #[error("Session {session_id} is already {status:?}")]
    SessionClosed {
        session_id: SessionId,
        status: SessionStatus,
    },

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for alert operations
pub type Result<T> = std::result::Result<T, AlertError>;
