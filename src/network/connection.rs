//! Transport Connections
//!
//! The byte pipe under a session, and the factory that opens one.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// An open, bidirectional byte stream to the server
pub trait Transport: Send {
    /// A second handle for the reader thread
    fn reader(&self) -> io::Result<Box<dyn Read + Send>>;

    /// Write a complete frame
    fn write_frame(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Close both directions; unblocks a pending read
    fn shutdown(&mut self);

    /// Peer description for logs
    fn peer(&self) -> String;
}

/// Opens transports
pub trait Connector: Send {
    fn connect(&mut self, address: &str, timeout: Duration) -> io::Result<Box<dyn Transport>>;
}

// =============================================================================
// TCP
// =============================================================================

/// Plain TCP connector with a bounded connect time
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn connect(&mut self, address: &str, timeout: Duration) -> io::Result<Box<dyn Transport>> {
        let mut last_err = None;

        for addr in address.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    let transport = TcpTransport::new(stream, timeout)?;
                    return Ok(Box::new(transport));
                }
                Err(e) => last_err = Some(e),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::AddrNotAvailable, format!("{} did not resolve", address))
        }))
    }
}

/// A connected TCP stream
pub struct TcpTransport {
    stream: TcpStream,

    /// Peer address for logging
    peer_addr: String,
}

impl TcpTransport {
    /// Wrap a connected stream
    ///
    /// Writes are bounded by `write_timeout` so a stalled peer surfaces as
    /// a transport failure instead of a hung session.
    pub fn new(stream: TcpStream, write_timeout: Duration) -> io::Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm; transactions are small and latency bound
        stream.set_nodelay(true)?;
        if !write_timeout.is_zero() {
            stream.set_write_timeout(Some(write_timeout))?;
        }

        Ok(Self { stream, peer_addr })
    }
}

impl Transport for TcpTransport {
    fn reader(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(self.stream.try_clone()?))
    }

    fn write_frame(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes)?;
        self.stream.flush()
    }

    fn shutdown(&mut self) {
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            tracing::trace!("Shutdown of {} failed: {}", self.peer_addr, e);
        }
    }

    fn peer(&self) -> String {
        self.peer_addr.clone()
    }
}
