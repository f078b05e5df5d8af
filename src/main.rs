//! Boat Tour Booking Service - Main Application Entry Point
//!
//! A multi-tenant REST API for boat tour operators. Businesses configure
//! tours and departures; customers hold seats, pay through a hosted payment
//! gateway and download PDF tickets that crews verify by QR code.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries, migrations)
//! - **Authentication**: business API keys (SHA-256 hashed), cron secret
//! - **Payments**: gateway orders over reqwest, HMAC-signed callbacks
//! - **Documents**: printpdf tickets, receipts and manifests with QR codes
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations (tables and `cancel_expired_bookings()`)
//! 4. Optionally start the in-process expiry sweep
//! 5. Build the HTTP router and start serving

mod config;
mod db;
mod error;
mod extract;
mod handlers;
mod middleware;
mod models;
mod pdf;
mod routes;
mod services;
mod state;

use std::time::Duration;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG controls verbosity, "info" when unset
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env()?;
    tracing::info!(?config, "Configuration loaded");

    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    if let Some(secs) = config.expiry_sweep_interval_secs.filter(|s| *s > 0) {
        services::cancellation_service::spawn_expiry_sweep(pool.clone(), Duration::from_secs(secs));
        tracing::info!(interval_secs = secs, "Expiry sweep started");
    }

    let addr = format!("0.0.0.0:{}", config.server_port);
    let state = state::AppState::new(pool, config)?;
    let app = routes::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
