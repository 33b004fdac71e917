//! TradeDesk Client Agent
//!
//! Headless notification agent: wires the notification context together,
//! signs in with the configured credential, logs every delivered
//! notification, and shuts down cleanly on Ctrl+C/SIGTERM.

use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use tradedesk_core::config::AppConfig;
use tradedesk_core::error::AppError;
use tradedesk_notify::capability::DesktopPlatform;
use tradedesk_notify::NotifyContext;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Agent error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("TRADEDESK_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt().json().with_env_filter(filter).with_target(true).init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main agent run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting TradeDesk client v{}", env!("CARGO_PKG_VERSION"));

    let context = NotifyContext::new(&config, Arc::new(DesktopPlatform))?;

    // A logging listener stands in for the dashboard's in-app consumers.
    let _listener = context.hub().subscribe(|record| {
        tracing::info!(
            id = %record.id,
            kind = %record.kind.as_str(),
            priority = %record.priority.as_str(),
            title = %record.title,
            "Notification delivered"
        );
    });

    context.start().await;

    match config.auth.credentials() {
        Some(credentials) => {
            tracing::info!(user_type = %credentials.user_type, "Signing in");
            context.update_auth(Some(credentials));
        }
        None => {
            tracing::warn!("No session credential configured; delivery stays idle until sign-in");
        }
    }

    // Show what the server already has on record.
    let recent = context.hub().recent_notifications(10).await;
    if !recent.is_empty() {
        tracing::info!(count = recent.len(), "Recent notifications fetched");
    }

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping delivery paths...");
    context.shutdown();
    tracing::info!("TradeDesk client shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
