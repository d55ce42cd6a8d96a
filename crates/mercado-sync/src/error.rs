//! # Sync Error Types
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │    Session      │  │     Store               │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  InvalidTrans.. │  │  Store(StoreError)      │ │
//! │  │  ConfigFile     │  │  NotSignedIn    │  │                         │ │
//! │  │  ConfigParse    │  │                 │  │                         │ │
//! │  │  ConfigEncode   │  │                 │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use mercado_store::StoreError;
use thiserror::Error;

use crate::session::SessionState;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reading or writing `mercado.toml` failed.
    #[error("Config file: {0}")]
    ConfigFile(String),

    #[error("Malformed mercado.toml: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Could not encode settings: {0}")]
    ConfigEncode(#[from] toml::ser::Error),

    // =========================================================================
    // Session Errors
    // =========================================================================
    /// The session state machine does not allow this step.
    #[error("Cannot go from {from} to {to}")]
    InvalidTransition { from: SessionState, to: SessionState },

    #[error("No active session")]
    NotSignedIn,

    // =========================================================================
    // Store Errors
    // =========================================================================
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigFile(err.to_string())
    }
}

impl SyncError {
    /// Returns true if the operation can be retried as-is.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Store(e) => e.is_retryable(),
            _ => false,
        }
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::ConfigFile(_)
                | SyncError::ConfigParse(_)
                | SyncError::ConfigEncode(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_decide_retry() {
        assert!(SyncError::Store(StoreError::Unavailable("offline".into())).is_retryable());
        assert!(!SyncError::NotSignedIn.is_retryable());
        assert!(!SyncError::InvalidConfig("bad".into()).is_retryable());
    }

    #[test]
    fn test_config_errors() {
        assert!(SyncError::InvalidConfig("bad".into()).is_config_error());
        let parse: SyncError = toml::from_str::<toml::Table>("store = [").unwrap_err().into();
        assert!(parse.is_config_error());
        assert!(!SyncError::NotSignedIn.is_config_error());
    }

    #[test]
    fn test_transition_message() {
        let err = SyncError::InvalidTransition {
            from: SessionState::Subscribed,
            to: SessionState::ResolvingIdentity,
        };
        assert_eq!(
            err.to_string(),
            "Cannot go from subscribed to resolving-identity"
        );
    }
}
