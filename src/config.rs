//! Configuration for wired-notify
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

use crate::error::{Result, WiredError};

/// SHA-1 digest of the empty string, the password of the guest account
pub const GUEST_PASSWORD_DIGEST: &str = "da39a3ee5e6b4b0d3255bfef95601890afd80709";

/// Default 64x64 PNG avatar, base64 encoded
pub const DEFAULT_ICON: &str = concat!(
    "iVBORw0KGgoAAAANSUhEUgAAAEAAAABACAQAAAAAYLlVAAABHElEQVR4Ae3XsY1EIRCD4WmCUiiElqYgeqISjmCDFdnbT4",
    "Lgnh3/AciGmXj1ClWWr2osX1SNuVxvnn8uX7uDFvPjFlc0v3xBGfPLeb5+c/PhOvaYm/v5+O1up+u3e9yJn0eR48dRhPhB",
    "FPX8fgd+fr8Drx/W0etHdfT6QR01fhhFjx9EEYavZ64H4gdR1PqdruP8zQfqB3WE+B2OYsYAp5+/YXyrxm9wfbl+zXnf/Zyn",
    "+qXz+vsV5+3368r781Odt99vKO+vfzqvw1dx3oav7rz+ftV5G76G8zp8Nedt+BzO6/CVyvvuU5TX3ac7r8NnVV53n6G87z5N",
    "ed59lPfdJ5V/Xp/dRfmn9dndlf9cH7gtC58RGR2czL/69/oD52cjZjGw8cIAAAAASUVORK5CYII=",
);

/// Main configuration for a Wired session
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Connection Target
    // -------------------------------------------------------------------------
    /// Server host name or address
    pub host: String,

    /// Server TCP port
    pub port: u16,

    // -------------------------------------------------------------------------
    // Timing
    // -------------------------------------------------------------------------
    /// Upper bound for a single transport connect
    pub connect_timeout: Duration,

    /// Fixed delay between reconnect attempts
    pub retry_delay: Duration,

    /// Consecutive failures tolerated before the session gives up
    pub max_retries: u32,

    /// How often the keepalive watchdog wakes up
    pub keepalive_interval: Duration,

    /// Silence after which the watchdog sends an unsolicited ping reply
    pub keepalive_threshold: Duration,

    // -------------------------------------------------------------------------
    // Identity
    // -------------------------------------------------------------------------
    /// Login name
    pub login: String,

    /// SHA-1 hex digest of the password (never the plain password)
    pub password_digest: String,

    pub nick: String,
    pub status: String,

    /// Base64 encoded avatar image
    pub icon: String,

    /// Chat channel joined after login ("1" is the public channel)
    pub channel: String,

    /// Mark the user idle once the post-login setup is done
    pub mark_idle: bool,

    /// Message sent along with the disconnect notice
    pub disconnect_message: String,

    // -------------------------------------------------------------------------
    // Client Information
    // -------------------------------------------------------------------------
    pub client_info: ClientInfo,

    // -------------------------------------------------------------------------
    // Push Notifications
    // -------------------------------------------------------------------------
    pub push: PushSettings,
}

/// What the client reports about itself in `wired.client_info`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub application_name: String,
    pub application_version: String,
    pub application_build: String,
    pub os_name: String,
    pub os_version: String,
    pub arch: String,
    pub supports_rsrc: bool,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            application_name: "Wired Client".to_string(),
            application_version: "2.1".to_string(),
            application_build: "306".to_string(),
            os_name: "Mac OS X".to_string(),
            os_version: "10.9.2".to_string(),
            arch: "x86_64".to_string(),
            supports_rsrc: false,
        }
    }
}

/// Where "user joined" alerts are delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushSettings {
    /// Target device token (hex)
    pub device_token: String,

    /// Deliver through the sandbox gateway instead of production
    pub sandbox: bool,

    /// How long the gateway should keep trying to deliver
    pub expiry: Duration,
}

impl Default for PushSettings {
    fn default() -> Self {
        Self {
            device_token: String::new(),
            sandbox: true,
            expiry: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4871,
            connect_timeout: Duration::from_secs(15),
            retry_delay: Duration::from_secs(15),
            max_retries: 20,
            keepalive_interval: Duration::from_secs(90),
            keepalive_threshold: Duration::from_secs(60),
            login: "guest".to_string(),
            password_digest: GUEST_PASSWORD_DIGEST.to_string(),
            nick: "Triforce".to_string(),
            status: "The APNs of Wired".to_string(),
            icon: DEFAULT_ICON.to_string(),
            channel: "1".to_string(),
            mark_idle: true,
            disconnect_message: String::new(),
            client_info: ClientInfo::default(),
            push: PushSettings::default(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// `host:port` as handed to the connector
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Reject settings the session cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(WiredError::Config("host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(WiredError::Config("port must not be 0".to_string()));
        }
        if self.connect_timeout.is_zero() {
            return Err(WiredError::Config("connect timeout must be positive".to_string()));
        }
        if self.retry_delay.is_zero() {
            return Err(WiredError::Config("retry delay must be positive".to_string()));
        }
        if self.keepalive_interval.is_zero() {
            return Err(WiredError::Config("keepalive interval must be positive".to_string()));
        }
        if self.login.is_empty() {
            return Err(WiredError::Config("login must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the server host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the server port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the transport connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the delay between reconnect attempts
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    /// Set the number of failures tolerated before giving up
    pub fn max_retries(mut self, count: u32) -> Self {
        self.config.max_retries = count;
        self
    }

    /// Set the keepalive watchdog period
    pub fn keepalive_interval(mut self, interval: Duration) -> Self {
        self.config.keepalive_interval = interval;
        self
    }

    /// Set the silence threshold for proactive ping replies
    pub fn keepalive_threshold(mut self, threshold: Duration) -> Self {
        self.config.keepalive_threshold = threshold;
        self
    }

    /// Set the login name and password digest
    pub fn credentials(mut self, login: impl Into<String>, password_digest: impl Into<String>) -> Self {
        self.config.login = login.into();
        self.config.password_digest = password_digest.into();
        self
    }

    /// Set the nickname
    pub fn nick(mut self, nick: impl Into<String>) -> Self {
        self.config.nick = nick.into();
        self
    }

    /// Set the status text
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.config.status = status.into();
        self
    }

    /// Set the base64 avatar
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.config.icon = icon.into();
        self
    }

    /// Set the channel joined after login
    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.config.channel = channel.into();
        self
    }

    /// Mark the user idle after login (or not)
    pub fn mark_idle(mut self, idle: bool) -> Self {
        self.config.mark_idle = idle;
        self
    }

    /// Set the client information block
    pub fn client_info(mut self, info: ClientInfo) -> Self {
        self.config.client_info = info;
        self
    }

    /// Set the push notification target
    pub fn push(mut self, push: PushSettings) -> Self {
        self.config.push = push;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
