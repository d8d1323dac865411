//! Push notifications
//!
//! The session does not talk to a push gateway itself. It hands finished
//! notifications to a [`Notifier`] and moves on.

use std::time::Duration;

use parking_lot::Mutex;

/// One alert for one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushNotification {
    /// Alert text shown on the device
    pub alert: String,

    /// Route through the sandbox gateway
    pub sandbox: bool,

    /// Delivery expiry
    pub expiry: Duration,

    /// Target device token
    pub device_token: String,
}

/// Delivery sink for push notifications
///
/// Fire-and-forget: implementations must not block the session for long
/// and handle their own failures.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: PushNotification);
}

/// Logs notifications instead of delivering them
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: PushNotification) {
        tracing::info!(
            device = %notification.device_token,
            sandbox = notification.sandbox,
            expiry_secs = notification.expiry.as_secs(),
            "Push notification: {}",
            notification.alert
        );
    }
}

/// Keeps every notification in memory
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<PushNotification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications received so far
    pub fn sent(&self) -> Vec<PushNotification> {
        self.sent.lock().clone()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: PushNotification) {
        self.sent.lock().push(notification);
    }
}
