//! Transaction definitions
//!
//! Wire names for every transaction and field the session uses, and the
//! outbound transactions with their fixed field sets.

use bytes::Bytes;

use crate::config::ClientInfo;
use super::codec::{encode_transaction, escape_value};

// =============================================================================
// Transaction Names
// =============================================================================

pub const CLIENT_HANDSHAKE: &str = "p7.handshake.client_handshake";
pub const SERVER_HANDSHAKE: &str = "p7.handshake.server_handshake";
pub const ACKNOWLEDGE: &str = "p7.handshake.acknowledge";
pub const COMPATIBILITY_CHECK: &str = "p7.compatibility_check.specification";
pub const COMPATIBILITY_STATUS: &str = "p7.compatibility_check.status";

pub const CLIENT_INFO: &str = "wired.client_info";
pub const SERVER_INFO: &str = "wired.server_info";
pub const SEND_LOGIN: &str = "wired.send_login";
pub const LOGIN: &str = "wired.login";
pub const SEND_PING: &str = "wired.send_ping";
pub const PING: &str = "wired.ping";
pub const ERROR: &str = "wired.error";

pub const SET_NICK: &str = "wired.user.set_nick";
pub const SET_STATUS: &str = "wired.user.set_status";
pub const SET_ICON: &str = "wired.user.set_icon";
pub const SET_IDLE: &str = "wired.user.set_idle";
pub const DISCONNECT_USER: &str = "wired.user.disconnect_user";

pub const JOIN_CHAT: &str = "wired.chat.join_chat";
pub const CHAT_USER_JOIN: &str = "wired.chat.user_join";
pub const CHAT_USER_DISCONNECT: &str = "wired.chat.user_disconnect";

// =============================================================================
// Field Names
// =============================================================================

pub mod field {
    pub const HANDSHAKE_VERSION: &str = "p7.handshake.version";
    pub const PROTOCOL_NAME: &str = "p7.handshake.protocol.name";
    pub const PROTOCOL_VERSION: &str = "p7.handshake.protocol.version";
    pub const COMPATIBILITY_CHECK: &str = "p7.handshake.compatibility_check";
    pub const SPECIFICATION: &str = "p7.compatibility_check.specification";
    pub const COMPATIBILITY_STATUS: &str = "p7.compatibility_check.status";

    pub const APPLICATION_NAME: &str = "wired.info.application.name";
    pub const APPLICATION_VERSION: &str = "wired.info.application.version";
    pub const APPLICATION_BUILD: &str = "wired.info.application.build";
    pub const OS_NAME: &str = "wired.info.os.name";
    pub const OS_VERSION: &str = "wired.info.os.version";
    pub const ARCH: &str = "wired.info.arch";
    pub const SUPPORTS_RSRC: &str = "wired.info.supports_rsrc";
    pub const SERVER_NAME: &str = "wired.info.name";

    pub const LOGIN: &str = "wired.user.login";
    pub const PASSWORD: &str = "wired.user.password";
    pub const USER_ID: &str = "wired.user.id";
    pub const NICK: &str = "wired.user.nick";
    pub const STATUS: &str = "wired.user.status";
    pub const ICON: &str = "wired.user.icon";
    pub const IDLE: &str = "wired.user.idle";
    pub const DISCONNECT_MESSAGE: &str = "wired.user.disconnect_message";

    pub const CHAT_ID: &str = "wired.chat.id";
    pub const ERROR: &str = "wired.error";
}

// =============================================================================
// Error Codes
// =============================================================================

pub const ERROR_LOGIN_FAILED: &str = "wired.error.login_failed";
pub const ERROR_BANNED: &str = "wired.banned";

// =============================================================================
// Handshake Parameters
// =============================================================================

pub const P7_HANDSHAKE_VERSION: &str = "1.0";
pub const PROTOCOL_NAME: &str = "Wired";
pub const PROTOCOL_VERSION: &str = "2.0";

// =============================================================================
// Outbound Transactions
// =============================================================================

/// A transaction the client sends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    /// Opens the handshake with our P7 and protocol versions
    ClientHandshake,

    /// Acknowledges the server handshake
    Acknowledge,

    /// Proves specification compatibility.
    ///
    /// The document is sent verbatim: it was escaped once when the catalog
    /// was loaded.
    CompatibilityCheck { specification: String },

    /// Describes the client application and platform
    ClientInfo(ClientInfo),

    /// Logs in; `password` is a SHA-1 hex digest
    SendLogin { login: String, password: String },

    SetNick { nick: String },
    SetStatus { status: String },

    /// Sets the avatar (base64 PNG)
    SetIcon { icon: String },

    JoinChat { channel: String },
    SetIdle,

    /// Tells the server we are leaving
    DisconnectUser { user_id: String, message: String },

    /// Answers a ping request (or pre-empts one)
    PingReply,
}

impl Transaction {
    /// Wire name of this transaction
    pub fn name(&self) -> &'static str {
        match self {
            Transaction::ClientHandshake => CLIENT_HANDSHAKE,
            Transaction::Acknowledge => ACKNOWLEDGE,
            Transaction::CompatibilityCheck { .. } => COMPATIBILITY_CHECK,
            Transaction::ClientInfo(_) => CLIENT_INFO,
            Transaction::SendLogin { .. } => SEND_LOGIN,
            Transaction::SetNick { .. } => SET_NICK,
            Transaction::SetStatus { .. } => SET_STATUS,
            Transaction::SetIcon { .. } => SET_ICON,
            Transaction::JoinChat { .. } => JOIN_CHAT,
            Transaction::SetIdle => SET_IDLE,
            Transaction::DisconnectUser { .. } => DISCONNECT_USER,
            Transaction::PingReply => PING,
        }
    }

    /// Wire-ready (escaped) field list
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Transaction::ClientHandshake => vec![
                (field::HANDSHAKE_VERSION, P7_HANDSHAKE_VERSION.to_string()),
                (field::PROTOCOL_NAME, PROTOCOL_NAME.to_string()),
                (field::PROTOCOL_VERSION, PROTOCOL_VERSION.to_string()),
            ],
            Transaction::Acknowledge | Transaction::PingReply => Vec::new(),
            Transaction::CompatibilityCheck { specification } => {
                vec![(field::SPECIFICATION, specification.clone())]
            }
            Transaction::ClientInfo(info) => vec![
                (field::APPLICATION_NAME, escape_value(&info.application_name)),
                (field::APPLICATION_VERSION, escape_value(&info.application_version)),
                (field::APPLICATION_BUILD, escape_value(&info.application_build)),
                (field::OS_NAME, escape_value(&info.os_name)),
                (field::OS_VERSION, escape_value(&info.os_version)),
                (field::ARCH, escape_value(&info.arch)),
                (field::SUPPORTS_RSRC, info.supports_rsrc.to_string()),
            ],
            Transaction::SendLogin { login, password } => vec![
                (field::LOGIN, escape_value(login)),
                (field::PASSWORD, escape_value(password)),
            ],
            Transaction::SetNick { nick } => vec![(field::NICK, escape_value(nick))],
            Transaction::SetStatus { status } => vec![(field::STATUS, escape_value(status))],
            Transaction::SetIcon { icon } => vec![(field::ICON, escape_value(icon))],
            Transaction::JoinChat { channel } => vec![(field::CHAT_ID, escape_value(channel))],
            Transaction::SetIdle => vec![(field::IDLE, "YES".to_string())],
            Transaction::DisconnectUser { user_id, message } => vec![
                (field::USER_ID, escape_value(user_id)),
                (field::DISCONNECT_MESSAGE, escape_value(message)),
            ],
        }
    }

    /// Encode into a complete wire frame
    pub fn encode(&self) -> Bytes {
        let fields = self.fields();
        let pairs: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        encode_transaction(self.name(), &pairs)
    }
}
