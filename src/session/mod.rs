//! Session Module
//!
//! The Wired session: lifecycle state, protocol state machine, reconnect
//! policy and keepalive watchdog.
//!
//! ## Handshake Order
//! ```text
//! client_handshake ─▶ server_handshake ─▶ acknowledge
//!                                          │
//!                      ┌───────────────────┴──────────────┐
//!                      ▼ (check requested)                 ▼
//!             compatibility_check ─▶ status ─▶ client_info ◀┘
//!                                                 │
//!                        server_info ─▶ send_login ─▶ login
//!                                                       │
//!                     set_nick, set_status, set_icon, join_chat, set_idle
//! ```
//!
//! Pings and server info re-announcements may arrive at any point.

mod state;
mod machine;
mod reconnect;
mod watchdog;

pub use state::{SessionSnapshot, SessionState, Status};
pub use machine::{FailureOutcome, Session, SessionAction, TRANSPORT};
pub use reconnect::{ReconnectPolicy, RetryDecision};
pub use watchdog::Watchdog;
