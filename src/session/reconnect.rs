//! Reconnect policy
//!
//! Fixed delay, bounded number of tries. With the default 15 s delay and
//! 15 s connect timeout the session spends about ten minutes retrying
//! before it gives up.

use std::time::Duration;

/// What to do after a transport failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait `delay`, then connect again
    Retry { attempt: u32, delay: Duration },

    /// Stop for good after `attempts` consecutive failures
    GiveUp { attempts: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_retries: 20,
            delay: Duration::from_secs(15),
        }
    }
}

impl ReconnectPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Decide, given the failure count after the latest failure
    pub fn decide(&self, retry_count: u32) -> RetryDecision {
        if retry_count > self.max_retries {
            RetryDecision::GiveUp { attempts: retry_count }
        } else {
            RetryDecision::Retry {
                attempt: retry_count,
                delay: self.delay,
            }
        }
    }
}
