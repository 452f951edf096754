//! Bounce Bridge web server.
//!
//! This binary:
//! - Receives SNS webhooks for SES bounces and complaints
//! - Confirms SNS subscriptions
//! - Flags bounced and complaining addresses as do-not-contact in Mautic

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use reqwest::Client;
use tokio::{net::TcpListener, signal};
use tracing::info;

use bounce_bridge::{logging, web, AppState, Config, Dispatcher, MauticClient};

#[tokio::main]
async fn main() -> Result<()> {
    // The audit log location comes from the environment, so load config first
    // and report anything it could not parse once the subscriber is up.
    let config = Config::from_env();
    let audit_log = logging::init(&config);

    info!("bridge_starting");
    config.log_invalid_settings();
    info!(
        port = config.port,
        mautic_url = %config.mautic_url,
        mautic_username_set = !config.mautic_username.is_empty(),
        log_file = %audit_log.path().display(),
        max_log_size = config.max_log_size,
        request_timeout_ms = config.request_timeout_ms,
        "config_loaded"
    );

    ensure!(!config.mautic_url.is_empty(), "MAUTIC_URL must be set");

    // One client for Mautic calls and subscription confirmations.
    // rustls verifies certificates and hostnames by default.
    let http = Client::builder()
        .timeout(Duration::from_millis(config.request_timeout_ms))
        .build()
        .context("Failed to create HTTP client")?;

    let mautic = MauticClient::new(
        http.clone(),
        &config.mautic_url,
        &config.mautic_username,
        &config.mautic_password,
    );
    let state = AppState::new(Dispatcher::new(http, mautic));

    let app = web::router(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("bridge_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
