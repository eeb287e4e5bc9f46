//! LMS Backend Server
//!
//! REST backend for an NBFC offering loans against mutual fund holdings.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;

use lms_server::auth::AuthService;
use lms_server::config::Config;
use lms_server::middleware::RateLimiter;
use lms_server::state::AppState;
use lms_server::{build_app, db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!(environment = %config.environment.as_str(), "Starting LMS server");

    let pool = db::create_pool(&config)
        .await
        .context("Failed to create database pool")?;
    db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    let state = AppState::postgres(pool, &config);
    bootstrap_admin(&state.auth_service, &config).await;

    let rate_limiter = RateLimiter::new(
        config.rate_limit_max_requests,
        Duration::from_millis(config.rate_limit_window_ms),
    );

    // Expired windows would otherwise accumulate per client
    let cleanup_limiter = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            cleanup_limiter.cleanup().await;
        }
    });

    let app = build_app(state, &config, rate_limiter);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.host, config.port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Create the configured ADMIN account on first start
async fn bootstrap_admin(auth_service: &AuthService, config: &Config) {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return;
    };

    match auth_service.ensure_admin(email, password).await {
        Ok(true) => tracing::info!(email = %email, "Bootstrap admin created"),
        Ok(false) => tracing::debug!("Bootstrap admin already present"),
        Err(e) => tracing::error!(error = %e, "Failed to create bootstrap admin"),
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
