//! Session state machine
//!
//! Pure protocol logic: it consumes decoded messages and transport events
//! and answers with [`SessionAction`]s. It performs no I/O, so the driver
//! that owns it decides how and when actions reach the wire.

use std::sync::Arc;
use std::time::Instant;

use crate::catalog::SpecCatalog;
use crate::config::Config;
use crate::error::{FatalError, FatalReason};
use crate::notify::PushNotification;
use crate::protocol::transaction::{self as tx, field};
use crate::protocol::{Message, Transaction};

use super::reconnect::{ReconnectPolicy, RetryDecision};
use super::state::{SessionState, Status};

/// Name used in diagnostics for failures that happen below the protocol
pub const TRANSPORT: &str = "transport";

/// Something the driver must do on the session's behalf
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Write a transaction to the server
    Send(Transaction),

    /// Hand a notification to the push sink
    Notify(PushNotification),

    /// Tear this session down and report upward
    Fatal(FatalError),
}

/// Outcome of a transport failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Wait, then open a new transport
    Retry { attempt: u32, delay: std::time::Duration },

    /// Retries exhausted; the session is now terminal
    GiveUp(FatalError),
}

/// The Wired session state machine
#[derive(Debug)]
pub struct Session {
    config: Arc<Config>,
    catalog: Arc<SpecCatalog>,
    policy: ReconnectPolicy,
    state: SessionState,
}

impl Session {
    pub fn new(config: Arc<Config>, catalog: Arc<SpecCatalog>) -> Self {
        let state = SessionState::new(config.host.clone(), config.port);
        let policy = ReconnectPolicy::new(config.max_retries, config.retry_delay);

        Self {
            config,
            catalog,
            policy,
            state,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn status(&self) -> Status {
        self.state.status
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Transport Lifecycle
    // =========================================================================

    /// Record that a new connection attempt is starting
    pub fn begin_attempt(&mut self) -> u64 {
        self.state.attempt += 1;
        self.state.attempt
    }

    /// A transport opened: reset the retry count and start the handshake
    pub fn transport_opened(&mut self) -> Vec<SessionAction> {
        self.state.retry_count = 0;
        self.state.clear_connection();

        tracing::info!(attempt = self.state.attempt, "Sending Wired handshake");
        vec![SessionAction::Send(Transaction::ClientHandshake)]
    }

    /// A connect, read or write failed
    pub fn transport_failed(&mut self) -> FailureOutcome {
        self.state.clear_connection();
        self.state.status = Status::Reconnecting;
        self.state.retry_count += 1;

        match self.policy.decide(self.state.retry_count) {
            RetryDecision::Retry { attempt, delay } => FailureOutcome::Retry { attempt, delay },
            RetryDecision::GiveUp { attempts } => {
                self.state.status = Status::Disconnected;
                FailureOutcome::GiveUp(FatalError {
                    attempt: self.state.attempt,
                    transaction: TRANSPORT.to_string(),
                    reason: FatalReason::RetriesExhausted { attempts },
                })
            }
        }
    }

    /// User-requested teardown; never leads to a reconnect
    pub fn disconnect(&mut self) -> Vec<SessionAction> {
        let mut actions = Vec::new();

        if !self.state.user_id.is_empty() {
            actions.push(SessionAction::Send(Transaction::DisconnectUser {
                user_id: self.state.user_id.clone(),
                message: self.config.disconnect_message.clone(),
            }));
        }

        self.state.clear_connection();
        self.state.status = Status::Disconnected;
        actions
    }

    // =========================================================================
    // Keepalive
    // =========================================================================

    /// Watchdog tick: ping proactively if the server has gone quiet
    pub fn watchdog_tick(&self, now: Instant) -> Vec<SessionAction> {
        if self.state.status != Status::Connected {
            return Vec::new();
        }

        let stale = match self.state.last_keepalive_at {
            Some(at) => now.saturating_duration_since(at) >= self.config.keepalive_threshold,
            None => true,
        };

        if stale {
            tracing::debug!("Sending proactive ping reply");
            vec![SessionAction::Send(Transaction::PingReply)]
        } else {
            Vec::new()
        }
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// React to one inbound message
    pub fn handle_message(&mut self, msg: &Message, now: Instant) -> Vec<SessionAction> {
        tracing::trace!("Dispatching {}", msg.name);

        match msg.name.as_str() {
            tx::SERVER_HANDSHAKE => self.handle_server_handshake(msg),
            tx::COMPATIBILITY_STATUS => self.handle_compatibility_status(msg),
            tx::SERVER_INFO => self.handle_server_info(msg),
            tx::LOGIN => self.handle_login(msg),
            tx::SEND_PING => self.handle_ping(now),
            tx::ERROR => self.handle_error(msg),
            tx::CHAT_USER_JOIN => self.handle_user_join(msg),
            tx::CHAT_USER_DISCONNECT => self.handle_user_disconnect(msg),
            other => {
                tracing::trace!("Ignoring {}", other);
                Vec::new()
            }
        }
    }

    fn handle_server_handshake(&mut self, msg: &Message) -> Vec<SessionAction> {
        tracing::info!("Received handshake");

        // Fields may come in any order; decide only after reading them all
        if let Some(version) = msg.field(field::PROTOCOL_VERSION) {
            self.state.negotiated_version = version.to_string();
        }
        let check_requested = msg.flag(field::COMPATIBILITY_CHECK).unwrap_or(false);

        let mut actions = vec![SessionAction::Send(Transaction::Acknowledge)];

        if check_requested {
            let version = &self.state.negotiated_version;
            if !self.catalog.contains(version) {
                tracing::warn!("No specification for protocol version {:?}", version);
            }
            tracing::info!("Sending compatibility check for {}", version);
            actions.push(SessionAction::Send(Transaction::CompatibilityCheck {
                specification: self.catalog.get(version).to_string(),
            }));
        } else {
            actions.push(self.client_info());
        }

        actions
    }

    fn handle_compatibility_status(&mut self, msg: &Message) -> Vec<SessionAction> {
        match msg.flag(field::COMPATIBILITY_STATUS) {
            Some(true) => {
                tracing::info!("Compatibility check passed");
                vec![self.client_info()]
            }
            Some(false) => vec![self.fatal(&msg.name, FatalReason::CompatibilityMismatch)],
            None => {
                tracing::warn!("Compatibility status without a status field");
                Vec::new()
            }
        }
    }

    fn handle_server_info(&mut self, msg: &Message) -> Vec<SessionAction> {
        if let Some(name) = msg.field(field::SERVER_NAME) {
            self.state.server_name = name.to_string();
        }

        // Server info is re-announced while connected
        if self.state.status == Status::Connected || self.state.login_pending {
            tracing::trace!("Server info while logged in; ignoring");
            return Vec::new();
        }

        tracing::info!(login = %self.config.login, "Sending login information");
        self.state.login_pending = true;
        vec![SessionAction::Send(Transaction::SendLogin {
            login: self.config.login.clone(),
            password: self.config.password_digest.clone(),
        })]
    }

    fn handle_login(&mut self, msg: &Message) -> Vec<SessionAction> {
        let user_id = msg.field(field::USER_ID).unwrap_or_default();
        if user_id.is_empty() {
            tracing::warn!("Login result without a user id; ignoring");
            return Vec::new();
        }
        if self.state.negotiated_version.is_empty() {
            tracing::warn!("Login result before handshake; ignoring");
            return Vec::new();
        }

        self.state.user_id = user_id.to_string();
        self.state.login_pending = false;
        tracing::info!(user_id = %self.state.user_id, "Login was successful");

        let mut actions = vec![
            SessionAction::Send(Transaction::SetNick {
                nick: self.config.nick.clone(),
            }),
            SessionAction::Send(Transaction::SetStatus {
                status: self.config.status.clone(),
            }),
            SessionAction::Send(Transaction::SetIcon {
                icon: self.config.icon.clone(),
            }),
            SessionAction::Send(Transaction::JoinChat {
                channel: self.config.channel.clone(),
            }),
        ];
        self.state.status = Status::Connected;

        if self.config.mark_idle {
            actions.push(SessionAction::Send(Transaction::SetIdle));
        }
        actions
    }

    fn handle_ping(&mut self, now: Instant) -> Vec<SessionAction> {
        self.state.last_keepalive_at = Some(now);
        vec![SessionAction::Send(Transaction::PingReply)]
    }

    fn handle_error(&mut self, msg: &Message) -> Vec<SessionAction> {
        for code in msg.values() {
            match code {
                tx::ERROR_LOGIN_FAILED => return vec![self.fatal(&msg.name, FatalReason::LoginFailed)],
                tx::ERROR_BANNED => return vec![self.fatal(&msg.name, FatalReason::Banned)],
                _ => {}
            }
        }

        let code = msg.field(field::ERROR).unwrap_or("unknown");
        tracing::warn!("Server error: {}", code);

        // A rejected login must not block the next server info from retrying
        self.state.login_pending = false;
        Vec::new()
    }

    fn handle_user_join(&mut self, msg: &Message) -> Vec<SessionAction> {
        if let Some(channel) = msg.field(field::CHAT_ID) {
            if channel != self.config.channel {
                return Vec::new();
            }
        }
        if msg.field(field::USER_ID).is_some_and(|id| id == self.state.user_id) {
            return Vec::new();
        }
        let Some(nick) = msg.field(field::NICK) else {
            return Vec::new();
        };

        let server = if self.state.server_name.is_empty() {
            self.state.host.as_str()
        } else {
            self.state.server_name.as_str()
        };

        tracing::debug!("{} joined the channel", nick);
        vec![SessionAction::Notify(PushNotification {
            alert: format!("{} has logged into {}.", nick, server),
            sandbox: self.config.push.sandbox,
            expiry: self.config.push.expiry,
            device_token: self.config.push.device_token.clone(),
        })]
    }

    fn handle_user_disconnect(&mut self, msg: &Message) -> Vec<SessionAction> {
        if !self.state.user_id.is_empty() && msg.field(field::USER_ID) == Some(self.state.user_id.as_str()) {
            tracing::info!(user_id = %self.state.user_id, "Server disconnected this user");
        }
        Vec::new()
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn client_info(&self) -> SessionAction {
        tracing::info!("Sending client information");
        SessionAction::Send(Transaction::ClientInfo(self.config.client_info.clone()))
    }

    fn fatal(&mut self, transaction: &str, reason: FatalReason) -> SessionAction {
        self.state.clear_connection();
        self.state.status = Status::Disconnected;

        SessionAction::Fatal(FatalError {
            attempt: self.state.attempt,
            transaction: transaction.to_string(),
            reason,
        })
    }
}
