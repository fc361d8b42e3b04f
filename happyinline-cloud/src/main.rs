//! happyinline-cloud: booking and subscription backend
//!
//! Long-running service that:
//! - Authenticates customers and shop staff (password or email OTP, JWT)
//! - Manages shops, staff roles, service menus and bookings
//! - Bills shop owners through Stripe subscriptions and converges on webhooks
//! - Stores compressed uploads in S3

mod api;
mod auth;
mod billing;
mod config;
mod db;
mod email;
mod error;
mod state;
mod storage;
mod stripe;
mod util;

use std::net::SocketAddr;

use config::Config;
use state::AppState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "happyinline_cloud=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting happyinline-cloud (env: {})", config.environment);
    if config.is_development() {
        tracing::warn!("Development mode: unset secrets fall back to placeholder values");
    }

    // Initialize application state
    let state = AppState::new(&config).await?;

    let app = api::create_router(state.clone(), config.cors_allowed_origin.as_deref());

    // Periodic rate limiter cleanup (every 5 minutes)
    let rate_limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rate_limiter.cleanup().await;
        }
    });

    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("happyinline-cloud HTTP listening on {http_addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
