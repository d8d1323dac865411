//! Keepalive watchdog
//!
//! A ticker thread bound to one connection. Each tick runs a callback; the
//! session decides whether the tick warrants a proactive ping reply.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Sender};

use crate::error::Result;

/// Handle to a running watchdog
///
/// Stopping (or dropping) the handle joins the thread, so no tick fires
/// after `stop` returns.
pub struct Watchdog {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Watchdog {
    /// Start ticking every `interval`
    ///
    /// The watchdog stops on its own when `on_tick` returns false.
    pub fn start<F>(interval: Duration, on_tick: F) -> Result<Self>
    where
        F: Fn() -> bool + Send + 'static,
    {
        let (stop_tx, stop_rx) = channel::bounded::<()>(0);

        let handle = thread::Builder::new()
            .name("wired-watchdog".to_string())
            .spawn(move || {
                let ticker = channel::tick(interval);
                loop {
                    crossbeam::select! {
                        recv(stop_rx) -> _ => break,
                        recv(ticker) -> _ => {
                            if !on_tick() {
                                break;
                            }
                        }
                    }
                }
                tracing::trace!("Watchdog stopped");
            })?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Stop the thread and wait for it
    pub fn stop(&mut self) {
        // Dropping the sender wakes the select
        self.stop_tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.stop();
    }
}
