//! bankcore - Personal Banking Backend
//!
//! Accounts, atomic transfers, installment credits and their repayment
//! lifecycle, plus a background sweep that penalizes overdue obligations.

use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bankcore::api::{self, AppState};
use bankcore::domain::SystemClock;
use bankcore::engine::OverdueSweeper;
use bankcore::external::{LogNotificationSink, StaticRateSource};
use bankcore::{db, Config};

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bankcore=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("Starting bankcore server");
    tracing::info!("Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    db::init_schema(&pool).await?;
    if !db::check_schema(&pool).await? {
        tracing::error!("Database schema is not complete");
        return Err(anyhow::anyhow!("Database schema incomplete"));
    }

    tracing::info!("Database connected successfully");

    let clock = Arc::new(SystemClock);
    let state = AppState {
        pool: pool.clone(),
        policy: config.credit_policy(),
        rates: Arc::new(StaticRateSource::new(config.base_rate)),
        notifier: Arc::new(LogNotificationSink),
        clock: clock.clone(),
    };

    // The sweeper runs on its own timer, independent of request traffic;
    // its first cycle fires immediately.
    let sweeper = OverdueSweeper::new(
        pool.clone(),
        config.sweep_config(),
        state.notifier.clone(),
        clock,
    )
    .start();

    let app = axum::Router::new()
        .route("/health", axum::routing::get(health_check))
        .nest("/api/v1", api::create_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutting down...");
    sweeper.stop().await;
    pool.close().await;
    tracing::info!("Database connections closed. Goodbye!");

    Ok(())
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
