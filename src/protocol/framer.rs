//! Frame reader
//!
//! Splits an inbound byte stream into carriage-return delimited frames.

use std::io::{BufRead, BufReader, ErrorKind, Read};

use crate::error::{Result, WiredError};

/// Frame delimiter
pub const DELIMITER: u8 = b'\r';

/// Maximum frame size (16 MB)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Reads delimiter-terminated frames from a stream
///
/// One reader lives for exactly one transport; a reconnect builds a new one.
/// Once a read fails the reader stays closed.
pub struct FrameReader<R> {
    reader: BufReader<R>,
    max_frame_size: usize,
    closed: bool,
}

impl<R: Read> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_max_frame_size(reader, MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(reader: R, max_frame_size: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            max_frame_size,
            closed: false,
        }
    }

    /// Read the next frame, delimiter included
    ///
    /// Blocks until a complete frame is received. Returns
    /// [`WiredError::TransportClosed`] if the stream ends first.
    pub fn read_frame(&mut self) -> Result<Vec<u8>> {
        if self.closed {
            return Err(WiredError::TransportClosed);
        }

        let result = self.read_frame_inner();
        if result.is_err() {
            self.closed = true;
        }
        result
    }

    fn read_frame_inner(&mut self) -> Result<Vec<u8>> {
        let mut frame = Vec::new();

        loop {
            let (complete, used) = {
                let available = match self.reader.fill_buf() {
                    Ok(buf) => buf,
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => return Err(WiredError::Transport(format!("read failed: {}", e))),
                };

                if available.is_empty() {
                    if !frame.is_empty() {
                        tracing::debug!("Stream ended with {} bytes of partial frame", frame.len());
                    }
                    return Err(WiredError::TransportClosed);
                }

                match available.iter().position(|&b| b == DELIMITER) {
                    Some(i) => {
                        frame.extend_from_slice(&available[..=i]);
                        (true, i + 1)
                    }
                    None => {
                        frame.extend_from_slice(available);
                        (false, available.len())
                    }
                }
            };
            self.reader.consume(used);

            if frame.len() > self.max_frame_size {
                return Err(WiredError::Transport(format!(
                    "Frame too large: {} bytes (max {})",
                    frame.len(),
                    self.max_frame_size
                )));
            }

            if complete {
                return Ok(frame);
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = Result<Vec<u8>>;

    /// Yields frames until the first failure, which is yielded once
    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }
        Some(self.read_frame())
    }
}
