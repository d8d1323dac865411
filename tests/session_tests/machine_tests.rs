//! Session Machine Tests
//!
//! Drives the state machine with hand-built messages; no sockets involved.

use std::sync::Arc;
use std::time::{Duration, Instant};

use proptest::prelude::*;
use wired_notify::catalog::SpecCatalog;
use wired_notify::protocol::transaction::{self as tx, field};
use wired_notify::protocol::{Message, Transaction};
use wired_notify::session::SessionAction;
use wired_notify::{Config, FatalReason, Session, Status};

const SPEC_DOCUMENT: &str = r#"<p7:protocol name="Wired" version="2.0b55"/>"#;

fn config() -> Config {
    Config::builder()
        .host("wired.example.org")
        .port(4871)
        .nick("Triforce")
        .status("The APNs of Wired")
        .channel("1")
        .build()
}

fn session_with(config: Config) -> Session {
    let catalog = SpecCatalog::new().with_document("2.0b55", SPEC_DOCUMENT);
    let mut session = Session::new(Arc::new(config), Arc::new(catalog));
    session.begin_attempt();
    session.transport_opened();
    session
}

fn session() -> Session {
    session_with(config())
}

fn handshake(version: &str, check: &str) -> Message {
    Message::new(tx::SERVER_HANDSHAKE)
        .with_field(field::HANDSHAKE_VERSION, "1.0")
        .with_field(field::PROTOCOL_NAME, "Wired")
        .with_field(field::PROTOCOL_VERSION, version)
        .with_field(field::COMPATIBILITY_CHECK, check)
}

fn login(user_id: &str) -> Message {
    Message::new(tx::LOGIN).with_field(field::USER_ID, user_id)
}

fn sent_names(actions: &[SessionAction]) -> Vec<&'static str> {
    actions
        .iter()
        .filter_map(|a| match a {
            SessionAction::Send(t) => Some(t.name()),
            _ => None,
        })
        .collect()
}

/// Handshake without compatibility check, then a successful login
fn logged_in(session: &mut Session) -> Vec<SessionAction> {
    let now = Instant::now();
    session.handle_message(&handshake("2.0b55", "0"), now);
    session.handle_message(&Message::new(tx::SERVER_INFO), now);
    session.handle_message(&login("42"), now)
}

// =============================================================================
// Handshake Tests
// =============================================================================

#[test]
fn test_transport_opened_sends_client_handshake() {
    let catalog = Arc::new(SpecCatalog::new());
    let mut session = Session::new(Arc::new(config()), catalog);
    session.begin_attempt();

    let actions = session.transport_opened();
    assert_eq!(actions, vec![SessionAction::Send(Transaction::ClientHandshake)]);
}

#[test]
fn test_handshake_without_check_sends_client_info() {
    let mut session = session();
    let actions = session.handle_message(&handshake("2.0b55", "0"), Instant::now());

    assert_eq!(sent_names(&actions), vec![tx::ACKNOWLEDGE, tx::CLIENT_INFO]);
    assert_eq!(session.state().negotiated_version, "2.0b55");
}

#[test]
fn test_handshake_with_check_sends_specification() {
    let mut session = session();
    let actions = session.handle_message(&handshake("2.0b55", "1"), Instant::now());

    assert_eq!(sent_names(&actions), vec![tx::ACKNOWLEDGE, tx::COMPATIBILITY_CHECK]);
    match &actions[1] {
        SessionAction::Send(Transaction::CompatibilityCheck { specification }) => {
            assert!(specification.starts_with("&lt;p7:protocol"));
        }
        other => panic!("unexpected action {:?}", other),
    }
}

#[test]
fn test_handshake_unknown_version_sends_empty_specification() {
    let mut session = session();
    let actions = session.handle_message(&handshake("2.0b99", "1"), Instant::now());

    assert_eq!(
        actions[1],
        SessionAction::Send(Transaction::CompatibilityCheck {
            specification: String::new()
        })
    );
}

#[test]
fn test_compatibility_passed_sends_client_info() {
    let mut session = session();
    session.handle_message(&handshake("2.0b55", "1"), Instant::now());

    let status = Message::new(tx::COMPATIBILITY_STATUS).with_field(field::COMPATIBILITY_STATUS, "1");
    let actions = session.handle_message(&status, Instant::now());

    assert_eq!(sent_names(&actions), vec![tx::CLIENT_INFO]);
    assert_eq!(session.status(), Status::Disconnected);
}

#[test]
fn test_compatibility_failed_is_fatal() {
    let mut session = session();
    session.handle_message(&handshake("2.0b55", "1"), Instant::now());

    let status = Message::new(tx::COMPATIBILITY_STATUS).with_field(field::COMPATIBILITY_STATUS, "0");
    let actions = session.handle_message(&status, Instant::now());

    assert_eq!(actions.len(), 1);
    match &actions[0] {
        SessionAction::Fatal(fatal) => {
            assert_eq!(fatal.reason, FatalReason::CompatibilityMismatch);
            assert_eq!(fatal.attempt, 1);
            assert_eq!(fatal.transaction, tx::COMPATIBILITY_STATUS);
        }
        other => panic!("expected fatal, got {:?}", other),
    }
    assert_eq!(session.status(), Status::Disconnected);
}

#[test]
fn test_compatibility_status_without_field_is_ignored() {
    let mut session = session();
    let actions = session.handle_message(&Message::new(tx::COMPATIBILITY_STATUS), Instant::now());
    assert!(actions.is_empty());
}

// =============================================================================
// Login Tests
// =============================================================================

#[test]
fn test_server_info_sends_login() {
    let mut session = session();
    session.handle_message(&handshake("2.0b55", "0"), Instant::now());

    let actions = session.handle_message(&Message::new(tx::SERVER_INFO), Instant::now());
    assert_eq!(
        actions,
        vec![SessionAction::Send(Transaction::SendLogin {
            login: "guest".to_string(),
            password: wired_notify::config::GUEST_PASSWORD_DIGEST.to_string(),
        })]
    );
}

#[test]
fn test_server_info_while_login_pending_sends_nothing() {
    let mut session = session();
    session.handle_message(&Message::new(tx::SERVER_INFO), Instant::now());

    let actions = session.handle_message(&Message::new(tx::SERVER_INFO), Instant::now());
    assert!(actions.is_empty());
}

#[test]
fn test_server_info_after_rejected_login_logs_in_again() {
    let mut session = session();
    let now = Instant::now();
    session.handle_message(&handshake("2.0b55", "0"), now);
    session.handle_message(&Message::new(tx::SERVER_INFO), now);

    let err = Message::new(tx::ERROR).with_field(field::ERROR, "wired.error.internal_error");
    assert!(session.handle_message(&err, now).is_empty());
    assert_eq!(session.status(), Status::Disconnected);

    let actions = session.handle_message(&Message::new(tx::SERVER_INFO), now);
    assert_eq!(sent_names(&actions), vec![tx::SEND_LOGIN]);
}

#[test]
fn test_server_info_while_connected_sends_nothing() {
    let mut session = session();
    logged_in(&mut session);

    let info = Message::new(tx::SERVER_INFO).with_field(field::SERVER_NAME, "Renamed");
    let actions = session.handle_message(&info, Instant::now());

    assert!(actions.is_empty());
    assert_eq!(session.state().server_name, "Renamed");
}

#[test]
fn test_login_runs_setup_sequence() {
    let mut session = session();
    let actions = logged_in(&mut session);

    assert_eq!(
        sent_names(&actions),
        vec![tx::SET_NICK, tx::SET_STATUS, tx::SET_ICON, tx::JOIN_CHAT, tx::SET_IDLE]
    );
    assert_eq!(
        actions[3],
        SessionAction::Send(Transaction::JoinChat {
            channel: "1".to_string()
        })
    );
    assert_eq!(session.status(), Status::Connected);
    assert_eq!(session.state().user_id, "42");
}

#[test]
fn test_login_without_idle() {
    let mut config = config();
    config.mark_idle = false;
    let mut session = session_with(config);

    let actions = logged_in(&mut session);
    assert!(!sent_names(&actions).contains(&tx::SET_IDLE));
}

#[test]
fn test_login_before_handshake_is_ignored() {
    let mut session = session();
    let actions = session.handle_message(&login("42"), Instant::now());

    assert!(actions.is_empty());
    assert_eq!(session.status(), Status::Disconnected);
    assert!(session.state().user_id.is_empty());
}

#[test]
fn test_login_without_user_id_is_ignored() {
    let mut session = session();
    session.handle_message(&handshake("2.0b55", "0"), Instant::now());

    let actions = session.handle_message(&Message::new(tx::LOGIN), Instant::now());
    assert!(actions.is_empty());
    assert_ne!(session.status(), Status::Connected);
}

// =============================================================================
// Keepalive Tests
// =============================================================================

#[test]
fn test_ping_request_is_answered() {
    let mut session = session();
    let now = Instant::now();

    let actions = session.handle_message(&Message::new(tx::SEND_PING), now);
    assert_eq!(actions, vec![SessionAction::Send(Transaction::PingReply)]);
    assert_eq!(session.state().last_keepalive_at, Some(now));
}

#[test]
fn test_watchdog_pings_after_long_silence() {
    let mut session = session();
    logged_in(&mut session);

    let start = Instant::now();
    session.handle_message(&Message::new(tx::SEND_PING), start);

    let actions = session.watchdog_tick(start + Duration::from_secs(61));
    assert_eq!(actions, vec![SessionAction::Send(Transaction::PingReply)]);
}

#[test]
fn test_watchdog_quiet_after_recent_ping() {
    let mut session = session();
    logged_in(&mut session);

    let start = Instant::now();
    session.handle_message(&Message::new(tx::SEND_PING), start);

    assert!(session.watchdog_tick(start + Duration::from_secs(30)).is_empty());
}

#[test]
fn test_watchdog_pings_when_never_pinged() {
    let mut session = session();
    logged_in(&mut session);

    let actions = session.watchdog_tick(Instant::now());
    assert_eq!(actions, vec![SessionAction::Send(Transaction::PingReply)]);
}

#[test]
fn test_watchdog_idle_before_login() {
    let session = session();
    let later = Instant::now() + Duration::from_secs(3600);
    assert!(session.watchdog_tick(later).is_empty());
}

// =============================================================================
// Error Tests
// =============================================================================

#[test]
fn test_login_failed_error_is_fatal() {
    let mut session = session();
    let err = Message::new(tx::ERROR).with_field(field::ERROR, tx::ERROR_LOGIN_FAILED);

    let actions = session.handle_message(&err, Instant::now());
    assert!(matches!(
        &actions[..],
        [SessionAction::Fatal(f)] if f.reason == FatalReason::LoginFailed && f.transaction == tx::ERROR
    ));
}

#[test]
fn test_banned_error_is_fatal() {
    let mut session = session();
    logged_in(&mut session);
    let err = Message::new(tx::ERROR).with_field(field::ERROR, tx::ERROR_BANNED);

    let actions = session.handle_message(&err, Instant::now());
    assert!(matches!(&actions[..], [SessionAction::Fatal(f)] if f.reason == FatalReason::Banned));
    assert_eq!(session.status(), Status::Disconnected);
}

#[test]
fn test_other_error_is_not_fatal() {
    let mut session = session();
    logged_in(&mut session);
    let err = Message::new(tx::ERROR).with_field(field::ERROR, "wired.error.permission_denied");

    assert!(session.handle_message(&err, Instant::now()).is_empty());
    assert_eq!(session.status(), Status::Connected);
}

// =============================================================================
// Chat Event Tests
// =============================================================================

#[test]
fn test_user_join_notifies() {
    let mut session = session();
    let now = Instant::now();
    session.handle_message(&handshake("2.0b55", "0"), now);
    session.handle_message(
        &Message::new(tx::SERVER_INFO).with_field(field::SERVER_NAME, "Cunning Giraffe"),
        now,
    );
    session.handle_message(&login("42"), now);

    let join = Message::new(tx::CHAT_USER_JOIN)
        .with_field(field::CHAT_ID, "1")
        .with_field(field::USER_ID, "7")
        .with_field(field::NICK, "alice");
    let actions = session.handle_message(&join, now);

    match &actions[..] {
        [SessionAction::Notify(n)] => {
            assert_eq!(n.alert, "alice has logged into Cunning Giraffe.");
            assert!(n.sandbox);
            assert_eq!(n.expiry, Duration::from_secs(24 * 60 * 60));
        }
        other => panic!("expected one notification, got {:?}", other),
    }
}

#[test]
fn test_user_join_falls_back_to_host() {
    let mut session = session();
    logged_in(&mut session);

    let join = Message::new(tx::CHAT_USER_JOIN).with_field(field::NICK, "bob");
    let actions = session.handle_message(&join, Instant::now());

    assert!(matches!(
        &actions[..],
        [SessionAction::Notify(n)] if n.alert == "bob has logged into wired.example.org."
    ));
}

#[test]
fn test_user_join_other_channel_or_self_is_skipped() {
    let mut session = session();
    logged_in(&mut session);

    let elsewhere = Message::new(tx::CHAT_USER_JOIN)
        .with_field(field::CHAT_ID, "9")
        .with_field(field::NICK, "carol");
    let own = Message::new(tx::CHAT_USER_JOIN)
        .with_field(field::CHAT_ID, "1")
        .with_field(field::USER_ID, "42")
        .with_field(field::NICK, "Triforce");

    assert!(session.handle_message(&elsewhere, Instant::now()).is_empty());
    assert!(session.handle_message(&own, Instant::now()).is_empty());
}

#[test]
fn test_unknown_message_is_ignored() {
    let mut session = session();
    logged_in(&mut session);

    let msg = Message::new("wired.chat.say").with_field("wired.chat.say", "hi");
    assert!(session.handle_message(&msg, Instant::now()).is_empty());
    assert_eq!(session.status(), Status::Connected);
}

// =============================================================================
// Disconnect Tests
// =============================================================================

#[test]
fn test_disconnect_sends_user_id() {
    let mut session = session();
    logged_in(&mut session);

    let actions = session.disconnect();
    assert_eq!(
        actions,
        vec![SessionAction::Send(Transaction::DisconnectUser {
            user_id: "42".to_string(),
            message: String::new(),
        })]
    );
    assert_eq!(session.status(), Status::Disconnected);
    assert!(session.state().user_id.is_empty());
}

#[test]
fn test_disconnect_before_login_sends_nothing() {
    let mut session = session();
    assert!(session.disconnect().is_empty());
    assert_eq!(session.status(), Status::Disconnected);
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #[test]
    fn prop_handshake_decision_ignores_field_order(
        check in any::<bool>(),
        fields in Just(vec![
            (field::HANDSHAKE_VERSION, "1.0"),
            (field::PROTOCOL_NAME, "Wired"),
            (field::PROTOCOL_VERSION, "2.0b55"),
            ("wired.info.extra", "noise"),
        ]).prop_shuffle(),
        flag_at in 0usize..5,
    ) {
        let mut ordered: Vec<(&str, &str)> = fields;
        ordered.insert(flag_at, (field::COMPATIBILITY_CHECK, if check { "1" } else { "0" }));

        let msg = ordered
            .into_iter()
            .fold(Message::new(tx::SERVER_HANDSHAKE), |m, (k, v)| m.with_field(k, v));

        let mut session = session();
        let actions = session.handle_message(&msg, Instant::now());

        let expected = if check { tx::COMPATIBILITY_CHECK } else { tx::CLIENT_INFO };
        prop_assert_eq!(sent_names(&actions), vec![tx::ACKNOWLEDGE, expected]);
        prop_assert_eq!(session.state().negotiated_version.as_str(), "2.0b55");
    }
}
