//! Network Module
//!
//! Transports and the threaded session driver.
//!
//! ## Architecture
//! - One session thread owning all session state
//! - One reader thread and one watchdog thread per open transport
//! - Inbound work reaches the session thread over a single channel

mod connection;
mod clock;
mod client;

pub use connection::{Connector, TcpConnector, TcpTransport, Transport};
pub use clock::{Clock, ManualClock, SystemClock};
pub use client::{Client, ClientHandle, SnapshotCell};
