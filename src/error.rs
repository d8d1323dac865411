//! Error types for wired-notify
//!
//! Provides a unified error type for all operations.

use std::fmt;

use thiserror::Error;

/// Result type alias using WiredError
pub type Result<T> = std::result::Result<T, WiredError>;

/// Unified error type for wired-notify operations
#[derive(Debug, Error)]
pub enum WiredError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("Transport closed before a complete frame was received")]
    TransportClosed,

    #[error("Transport error: {0}")]
    Transport(String),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("{0}")]
    Fatal(FatalError),

    // -------------------------------------------------------------------------
    // Startup Errors
    // -------------------------------------------------------------------------
    #[error("Specification catalog error: {0}")]
    Catalog(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl WiredError {
    /// True for errors that should hand control to the reconnect policy
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            WiredError::Io(_) | WiredError::TransportClosed | WiredError::Transport(_)
        )
    }
}

/// Why a session was torn down for good
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalReason {
    /// The server rejected our protocol specification
    CompatibilityMismatch,

    /// Username or password is incorrect
    LoginFailed,

    /// The account is banned from this server
    Banned,

    /// The reconnect policy gave up
    RetriesExhausted { attempts: u32 },
}

impl fmt::Display for FatalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalReason::CompatibilityMismatch => write!(f, "compatibility mismatch"),
            FatalReason::LoginFailed => write!(f, "login failed: username or password is incorrect"),
            FatalReason::Banned => write!(f, "login failed: user is banned from this server"),
            FatalReason::RetriesExhausted { attempts } => {
                write!(f, "unable to reconnect after {} tries", attempts)
            }
        }
    }
}

/// A session-fatal condition, with enough context to tell the operator
/// which connection attempt and which transaction caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatalError {
    /// Connection attempt number (1-based, counts every transport open)
    pub attempt: u64,

    /// Transaction name that triggered the condition
    pub transaction: String,

    pub reason: FatalReason,
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "session terminated on connection attempt {} ({}): {}",
            self.attempt, self.transaction, self.reason
        )
    }
}

impl From<FatalError> for WiredError {
    fn from(err: FatalError) -> Self {
        WiredError::Fatal(err)
    }
}
