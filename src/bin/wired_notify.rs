//! wired-notify Binary
//!
//! Keeps a Wired session open until a line is read from stdin.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use crossbeam::channel;
use tracing_subscriber::{fmt, EnvFilter};
use wired_notify::catalog::SUPPORTED_VERSIONS;
use wired_notify::config::{PushSettings, GUEST_PASSWORD_DIGEST};
use wired_notify::notify::LogNotifier;
use wired_notify::{Client, Config, SpecCatalog};

/// Wired push notification bridge
#[derive(Parser, Debug)]
#[command(name = "wired-notify")]
#[command(about = "Stay logged into a Wired server and push channel joins")]
#[command(version)]
struct Args {
    /// Server host
    #[arg(long, default_value = "chat.embercode.com")]
    host: String,

    /// Server port
    #[arg(short, long, default_value = "2359")]
    port: u16,

    /// Directory holding WiredSpec_<version>.xml files
    #[arg(short, long, default_value = "wired")]
    spec_dir: PathBuf,

    /// Login name
    #[arg(long, default_value = "guest")]
    login: String,

    /// SHA-1 hex digest of the password
    #[arg(long, default_value = GUEST_PASSWORD_DIGEST)]
    password_digest: String,

    /// Nickname shown to other users
    #[arg(short, long, default_value = "Triforce")]
    nick: String,

    /// Status text shown to other users
    #[arg(long, default_value = "The APNs of Wired")]
    status: String,

    /// Channel to join
    #[arg(short, long, default_value = "1")]
    channel: String,

    /// Device token that receives join alerts
    #[arg(long, default_value = "")]
    device_token: String,

    /// Use the production push gateway instead of the sandbox
    #[arg(long)]
    production: bool,

    /// Do not mark the user idle after login
    #[arg(long)]
    no_idle: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,wired_notify=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("*** Starting wired-notify v{} ***", wired_notify::VERSION);

    // Without the specifications no compatibility check can pass
    let catalog = match SpecCatalog::load_dir(&args.spec_dir, SUPPORTED_VERSIONS) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            tracing::error!("Error loading Wired specifications: {}", e);
            std::process::exit(1);
        }
    };

    let config = Config::builder()
        .host(&args.host)
        .port(args.port)
        .credentials(&args.login, &args.password_digest)
        .nick(&args.nick)
        .status(&args.status)
        .channel(&args.channel)
        .mark_idle(!args.no_idle)
        .push(PushSettings {
            device_token: args.device_token.clone(),
            sandbox: !args.production,
            ..PushSettings::default()
        })
        .build();

    let handle = match Client::new(config, catalog, Arc::new(LogNotifier)).start() {
        Ok(h) => h,
        Err(e) => {
            tracing::error!("Failed to start session: {}", e);
            std::process::exit(1);
        }
    };

    // Wait for user input, or for the session to end by itself
    let (input_tx, input_rx) = channel::bounded::<()>(1);
    thread::spawn(move || {
        let mut input = String::new();
        let _ = std::io::stdin().read_line(&mut input);
        let _ = input_tx.send(());
    });

    while !handle.is_finished() {
        if input_rx.recv_timeout(Duration::from_millis(500)).is_ok() {
            break;
        }
    }

    if let Err(e) = handle.disconnect() {
        tracing::error!("Session failed: {}", e);
        std::process::exit(1);
    }

    tracing::info!("*** Exiting wired-notify ***");
}
