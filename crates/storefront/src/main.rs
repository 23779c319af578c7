//! ShopWave storefront server.
//!
//! Serves the catalog, cart, and admin console on `SHOPWAVE_PORT` (3000).
//!
//! # Architecture
//!
//! - Axum web framework with server-rendered Askama templates
//! - Hosted gateway (Supabase-compatible auth + `PostgREST`) for all data
//! - In-memory cookie sessions holding only gateway tokens, swept on an interval
//!
//! The gateway enforces row-level security; this binary only ever holds the
//! public anon key and the signed-in user's access token.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use sentry::integrations::tracing as sentry_tracing;
use thiserror::Error;
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

use shopwave_storefront::{build_router, serve};
use shopwave_storefront::config::{ConfigError, StorefrontConfig};
use shopwave_storefront::gateway::GatewayError;
use shopwave_storefront::middleware::{
    RateLimitConfigError, SESSION_PURGE_INTERVAL, purge_expired_sessions,
};
use shopwave_storefront::state::AppState;

/// Reasons the server fails to start or stops abnormally.
#[derive(Debug, Error)]
enum StartupError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to build gateway client: {0}")]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    RateLimit(#[from] RateLimitConfigError),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        tracing::Level::TRACE => sentry_tracing::EventFilter::Ignore,
    }
}

/// Text logs locally, JSON when `SHOPWAVE_LOG_JSON` is set.
fn init_tracing(config: &StorefrontConfig) {
    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shopwave_storefront=info,tower_http=info".into());

    let fmt_layer = if config.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

async fn run(config: StorefrontConfig) -> Result<(), StartupError> {
    let addr = config.socket_addr();
    let state = AppState::new(config)?;
    tracing::info!(gateway = %state.config().gateway.url, "gateway client ready");

    tokio::spawn(purge_expired_sessions(
        state.sessions().clone(),
        SESSION_PURGE_INTERVAL,
    ));

    let app = build_router(state)?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("storefront listening on {}", addr);

    serve(listener, app, shutdown_signal()).await?;
    Ok(())
}

#[tokio::main]
#[allow(clippy::print_stderr)]
async fn main() -> ExitCode {
    // Load configuration from environment (needed for Sentry init)
    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            // Logging is not up yet
            eprintln!("{}", StartupError::from(e));
            return ExitCode::FAILURE;
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);
    init_tracing(&config);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "storefront stopped");
            ExitCode::FAILURE
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
