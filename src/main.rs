use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod constants;
mod error;
mod formatter;
mod integrations;
mod models;
mod parser;
mod services;
mod validators;

use config::Config;
use constants::SERVICE_NAME;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wallybot_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!("Starting {} Backend Server", SERVICE_NAME);
    tracing::info!("Environment: {}", config.environment);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let app_state = api::AppState::new(config)?;

    // Start background services
    tokio::spawn(services::start_background_services(
        app_state.rate_limiter.clone(),
    ));

    // Build router
    let app = build_router(app_state);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

fn build_router(state: api::AppState) -> Router {
    Router::new()
        .route("/", get(api::health::service_info))
        .route("/health", get(api::health::health_check))
        .route("/webhook", post(api::webhook::handle_incoming_message))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            services::rate_limiter::rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> error::AppError {
    error::AppError::NotFound("The requested endpoint does not exist".to_string())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}
