//! # wired-notify
//!
//! A long-lived Wired (P7) chat session that:
//! - Negotiates the P7 handshake and proves specification compatibility
//! - Logs in, sets up its user, and joins a channel
//! - Answers keepalive pings and pings proactively when the server goes quiet
//! - Reconnects after transport failures, up to a fixed number of tries
//! - Forwards "user joined" events to a push notification sink
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Wired Server (TCP)                       │
//! └──────────────▲──────────────────────────────┬───────────────┘
//!                │ write                        │ read
//! ┌──────────────┴──────────┐       ┌───────────▼───────────────┐
//! │     Session Thread      │◀──────│  Reader Thread            │
//! │  (sole state owner)     │ event │  (FrameReader + codec)    │
//! │                         │◀──────┤  Watchdog Thread (ticks)  │
//! └──────────────┬──────────┘       └───────────────────────────┘
//!                │
//!        ┌───────┴────────┐
//!        ▼                ▼
//!   ┌──────────┐    ┌──────────┐
//!   │ Session  │    │ Notifier │
//!   │ (state   │    │  (push)  │
//!   │ machine) │    └──────────┘
//!   └──────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod catalog;
pub mod notify;
pub mod session;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{FatalError, FatalReason, Result, WiredError};
pub use config::Config;
pub use catalog::SpecCatalog;
pub use network::{Client, ClientHandle};
pub use session::{Session, SessionSnapshot, Status};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of wired-notify
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
