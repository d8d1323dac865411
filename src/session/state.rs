//! Session record
//!
//! The single mutable record describing the connection. Only the session
//! actor writes to it; everyone else reads snapshots.

use std::fmt;
use std::time::Instant;

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Disconnected,
    Reconnecting,
    Connected,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Disconnected => write!(f, "disconnected"),
            Status::Reconnecting => write!(f, "reconnecting"),
            Status::Connected => write!(f, "connected"),
        }
    }
}

/// Everything the session knows about its connection
///
/// Invariants:
/// - `status == Connected` implies `user_id` and `negotiated_version` are
///   non-empty
/// - `retry_count` grows only while reconnecting and drops to zero when a
///   transport opens
#[derive(Debug, Clone)]
pub struct SessionState {
    pub host: String,
    pub port: u16,
    pub status: Status,

    /// Consecutive transport failures
    pub retry_count: u32,

    /// Connection attempts made so far, successful or not
    pub attempt: u64,

    /// Last inbound ping request; `None` until the first one arrives
    pub last_keepalive_at: Option<Instant>,

    /// Protocol version offered by the server in this connection's handshake
    pub negotiated_version: String,

    /// User id assigned at login
    pub user_id: String,

    /// Display name announced in server info
    pub server_name: String,

    /// A login was sent on this connection and has not been answered
    pub login_pending: bool,
}

impl SessionState {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            status: Status::Disconnected,
            retry_count: 0,
            attempt: 0,
            last_keepalive_at: None,
            negotiated_version: String::new(),
            user_id: String::new(),
            server_name: String::new(),
            login_pending: false,
        }
    }

    /// Forget everything learned on the current connection
    pub fn clear_connection(&mut self) {
        self.negotiated_version.clear();
        self.user_id.clear();
        self.login_pending = false;
        self.last_keepalive_at = None;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            retry_count: self.retry_count,
            attempt: self.attempt,
            user_id: self.user_id.clone(),
            negotiated_version: self.negotiated_version.clone(),
            server_name: self.server_name.clone(),
        }
    }
}

/// Read-only copy of the session record for operators and tests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub status: Status,
    pub retry_count: u32,
    pub attempt: u64,
    pub user_id: String,
    pub negotiated_version: String,
    pub server_name: String,
}
